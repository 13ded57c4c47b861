use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::DateTime;
use parquet::data_type::{BoolType, ByteArray, ByteArrayType, DoubleType, Int32Type, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::{SerializedFileWriter, SerializedRowGroupWriter};
use parquet::format::KeyValue;
use parquet::schema::parser::parse_message_type;

use crate::normalize::{GameRecord, RECORD_SCHEMA_VERSION};

/// One JSON record per line, UTF-8, created or overwritten per run.
pub fn write_ndjson(path: &Path, records: &[GameRecord]) -> Result<usize> {
    let file =
        File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for rec in records {
        let line = serde_json::to_string(rec).context("serialize record")?;
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
    }
    out.flush().context("flush ndjson output")?;
    Ok(records.len())
}

pub fn read_ndjson(path: &Path) -> Result<Vec<GameRecord>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line.context("read ndjson line")?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line).context("parse ndjson line")?);
    }
    Ok(records)
}

// Scalar record fields become typed columns; pgn_tags and raw are carried
// as JSON strings. Column order below must match the write order in
// write_parquet.
const PARQUET_SCHEMA: &str = "
message game_record {
  required binary username (UTF8);
  required binary user_color (UTF8);
  optional binary opponent_username (UTF8);
  optional binary url (UTF8);
  optional binary uuid (UTF8);
  optional boolean rated;
  optional binary rules (UTF8);
  optional binary time_class (UTF8);
  optional binary time_control (UTF8);
  optional binary time_control_mode (UTF8);
  optional int64 time_control_seconds;
  optional int64 increment_seconds;
  required boolean is_daily;
  required boolean is_chess960;
  required boolean has_initial_fen;
  required boolean has_clock_increment;
  optional int64 user_rating;
  optional int64 opponent_rating;
  optional int64 rating_delta;
  optional binary user_result (UTF8);
  optional binary winner (UTF8);
  required boolean is_win;
  required boolean is_loss;
  required boolean is_draw;
  optional binary result_reason (UTF8);
  required boolean is_timeout;
  required boolean is_abandoned;
  required boolean is_agreed_draw;
  required boolean is_threefold;
  required boolean is_50move;
  required boolean is_insufficient_material;
  required double points_user;
  required double points_opponent;
  optional binary eco (UTF8);
  optional binary eco_family (UTF8);
  optional binary opening_name (UTF8);
  optional binary opening_variation (UTF8);
  optional int64 start_time;
  optional int64 end_time;
  optional binary start_ts_utc (UTF8);
  optional int64 end_ts_utc (TIMESTAMP_MICROS);
  optional int64 duration_seconds;
  optional int32 pgn_move_count;
  required boolean end_by_checkmate;
  required boolean end_by_resignation;
  required boolean end_by_stalemate;
  optional binary pgn_tags (UTF8);
  optional binary fen_final (UTF8);
  optional binary initial_setup (UTF8);
  optional binary tcn (UTF8);
  optional double accuracy_white;
  optional double accuracy_black;
  optional binary raw (UTF8);
}
";

/// Columnar sink over the same record set as the NDJSON file. The one
/// conversion of note: `end_ts_utc` is parsed into a timestamp column,
/// and unparseable values become nulls rather than failing the write.
pub fn write_parquet(path: &Path, records: &[GameRecord]) -> Result<()> {
    let schema = Arc::new(parse_message_type(PARQUET_SCHEMA).context("parquet schema")?);
    let props = Arc::new(
        WriterProperties::builder()
            .set_key_value_metadata(Some(vec![KeyValue::new(
                "record_schema_version".to_string(),
                RECORD_SCHEMA_VERSION.to_string(),
            )]))
            .build(),
    );
    let file =
        File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer =
        SerializedFileWriter::new(file, schema, props).context("open parquet writer")?;
    let mut rg = writer.next_row_group().context("open row group")?;

    req_utf8(&mut rg, records.iter().map(|r| r.username.clone()).collect())?;
    req_utf8(&mut rg, records.iter().map(|r| r.user_color.clone()).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.opponent_username.clone()).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.url.clone()).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.uuid.clone()).collect())?;
    opt_bool(&mut rg, records.iter().map(|r| r.rated).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.rules.clone()).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.time_class.clone()).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.time_control.clone()).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.time_control_mode.clone()).collect())?;
    opt_i64(&mut rg, records.iter().map(|r| r.time_control_seconds).collect())?;
    opt_i64(&mut rg, records.iter().map(|r| r.increment_seconds).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.is_daily).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.is_chess960).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.has_initial_fen).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.has_clock_increment).collect())?;
    opt_i64(&mut rg, records.iter().map(|r| r.user_rating).collect())?;
    opt_i64(&mut rg, records.iter().map(|r| r.opponent_rating).collect())?;
    opt_i64(&mut rg, records.iter().map(|r| r.rating_delta).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.user_result.clone()).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.winner.clone()).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.is_win).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.is_loss).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.is_draw).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.result_reason.clone()).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.is_timeout).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.is_abandoned).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.is_agreed_draw).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.is_threefold).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.is_50move).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.is_insufficient_material).collect())?;
    req_f64(&mut rg, records.iter().map(|r| r.points_user).collect())?;
    req_f64(&mut rg, records.iter().map(|r| r.points_opponent).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.eco.clone()).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.eco_family.clone()).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.opening_name.clone()).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.opening_variation.clone()).collect())?;
    opt_i64(&mut rg, records.iter().map(|r| r.start_time).collect())?;
    opt_i64(&mut rg, records.iter().map(|r| r.end_time).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.start_ts_utc.clone()).collect())?;
    opt_i64(&mut rg, records.iter().map(end_ts_micros).collect())?;
    opt_i64(&mut rg, records.iter().map(|r| r.duration_seconds).collect())?;
    opt_i32(&mut rg, records.iter().map(|r| r.pgn_move_count.map(|n| n as i32)).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.end_by_checkmate).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.end_by_resignation).collect())?;
    req_bool(&mut rg, records.iter().map(|r| r.end_by_stalemate).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| serde_json::to_string(&r.pgn_tags).ok()).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.fen_final.clone()).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.initial_setup.clone()).collect())?;
    opt_utf8(&mut rg, records.iter().map(|r| r.tcn.clone()).collect())?;
    opt_f64(&mut rg, records.iter().map(|r| r.accuracy_white).collect())?;
    opt_f64(&mut rg, records.iter().map(|r| r.accuracy_black).collect())?;
    opt_utf8(&mut rg, records.iter().map(raw_json).collect())?;

    rg.close().context("close row group")?;
    writer.close().context("close parquet file")?;
    Ok(())
}

fn end_ts_micros(rec: &GameRecord) -> Option<i64> {
    let raw = rec.end_ts_utc.as_deref()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.timestamp_micros())
}

fn raw_json(rec: &GameRecord) -> Option<String> {
    if rec.raw.is_null() {
        return None;
    }
    serde_json::to_string(&rec.raw).ok()
}

fn req_utf8(rg: &mut SerializedRowGroupWriter<'_, File>, vals: Vec<String>) -> Result<()> {
    let data: Vec<ByteArray> = vals
        .into_iter()
        .map(|s| ByteArray::from(s.into_bytes()))
        .collect();
    let mut col = rg.next_column()?.context("schema exhausted")?;
    col.typed::<ByteArrayType>().write_batch(&data, None, None)?;
    col.close()?;
    Ok(())
}

fn opt_utf8(rg: &mut SerializedRowGroupWriter<'_, File>, vals: Vec<Option<String>>) -> Result<()> {
    let mut defs: Vec<i16> = Vec::with_capacity(vals.len());
    let mut data: Vec<ByteArray> = Vec::new();
    for val in vals {
        match val {
            Some(s) => {
                defs.push(1);
                data.push(ByteArray::from(s.into_bytes()));
            }
            None => defs.push(0),
        }
    }
    let mut col = rg.next_column()?.context("schema exhausted")?;
    col.typed::<ByteArrayType>()
        .write_batch(&data, Some(&defs), None)?;
    col.close()?;
    Ok(())
}

fn req_bool(rg: &mut SerializedRowGroupWriter<'_, File>, vals: Vec<bool>) -> Result<()> {
    let mut col = rg.next_column()?.context("schema exhausted")?;
    col.typed::<BoolType>().write_batch(&vals, None, None)?;
    col.close()?;
    Ok(())
}

fn opt_bool(rg: &mut SerializedRowGroupWriter<'_, File>, vals: Vec<Option<bool>>) -> Result<()> {
    let mut defs: Vec<i16> = Vec::with_capacity(vals.len());
    let mut data: Vec<bool> = Vec::new();
    for val in vals {
        match val {
            Some(b) => {
                defs.push(1);
                data.push(b);
            }
            None => defs.push(0),
        }
    }
    let mut col = rg.next_column()?.context("schema exhausted")?;
    col.typed::<BoolType>().write_batch(&data, Some(&defs), None)?;
    col.close()?;
    Ok(())
}

fn req_f64(rg: &mut SerializedRowGroupWriter<'_, File>, vals: Vec<f64>) -> Result<()> {
    let mut col = rg.next_column()?.context("schema exhausted")?;
    col.typed::<DoubleType>().write_batch(&vals, None, None)?;
    col.close()?;
    Ok(())
}

fn opt_f64(rg: &mut SerializedRowGroupWriter<'_, File>, vals: Vec<Option<f64>>) -> Result<()> {
    let mut defs: Vec<i16> = Vec::with_capacity(vals.len());
    let mut data: Vec<f64> = Vec::new();
    for val in vals {
        match val {
            Some(f) => {
                defs.push(1);
                data.push(f);
            }
            None => defs.push(0),
        }
    }
    let mut col = rg.next_column()?.context("schema exhausted")?;
    col.typed::<DoubleType>()
        .write_batch(&data, Some(&defs), None)?;
    col.close()?;
    Ok(())
}

fn opt_i64(rg: &mut SerializedRowGroupWriter<'_, File>, vals: Vec<Option<i64>>) -> Result<()> {
    let mut defs: Vec<i16> = Vec::with_capacity(vals.len());
    let mut data: Vec<i64> = Vec::new();
    for val in vals {
        match val {
            Some(n) => {
                defs.push(1);
                data.push(n);
            }
            None => defs.push(0),
        }
    }
    let mut col = rg.next_column()?.context("schema exhausted")?;
    col.typed::<Int64Type>()
        .write_batch(&data, Some(&defs), None)?;
    col.close()?;
    Ok(())
}

fn opt_i32(rg: &mut SerializedRowGroupWriter<'_, File>, vals: Vec<Option<i32>>) -> Result<()> {
    let mut defs: Vec<i16> = Vec::with_capacity(vals.len());
    let mut data: Vec<i32> = Vec::new();
    for val in vals {
        match val {
            Some(n) => {
                defs.push(1);
                data.push(n);
            }
            None => defs.push(0),
        }
    }
    let mut col = rg.next_column()?.context("schema exhausted")?;
    col.typed::<Int32Type>()
        .write_batch(&data, Some(&defs), None)?;
    col.close()?;
    Ok(())
}
