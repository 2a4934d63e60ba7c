//! Timestamp and schema normalization
//!
//! Pure mapping functions from raw records to the canonical
//! [`NormalizedEvent`] shape. A record whose timestamp cannot be parsed
//! yields `None` and is dropped by the caller; nothing here performs I/O or
//! raises on malformed input.

use crate::events::{Category, EventPayload, NormalizedEvent, RawRecord, Source};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Maximum fractional-second digits chrono can represent (nanoseconds)
const MAX_FRACTION_DIGITS: usize = 9;

/// Microsecond-epoch rule: the journal's `__REALTIME_TIMESTAMP` is an
/// integer count of microseconds since the Unix epoch.
pub fn micros_epoch_to_utc(raw: &str) -> Option<DateTime<Utc>> {
    let micros: i64 = raw.trim().parse().ok()?;
    DateTime::from_timestamp_micros(micros)
}

/// ISO-string rule: normalize an ISO-8601-ish string to a UTC instant.
///
/// A trailing `Z` is read as offset `+00:00`, fractional seconds beyond
/// nanosecond precision are truncated with any following offset reattached,
/// and a timestamp carrying no offset at all is taken as already UTC.
pub fn iso_string_to_utc(raw: &str) -> Option<DateTime<Utc>> {
    let ts = raw.trim();
    if ts.is_empty() {
        return None;
    }

    let ts = match ts.strip_suffix('Z') {
        Some(stripped) => format!("{stripped}+00:00"),
        None => ts.to_string(),
    };
    let ts = truncate_fraction(&ts, MAX_FRACTION_DIGITS);

    if let Ok(dt) = DateTime::parse_from_rfc3339(&ts) {
        return Some(dt.with_timezone(&Utc));
    }

    // No offset present: treat the wall-clock value as UTC
    NaiveDateTime::parse_from_str(&ts, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Keep at most `max_digits` fractional-second digits, reattaching whatever
/// follows the fraction (an explicit offset, or nothing).
fn truncate_fraction(ts: &str, max_digits: usize) -> String {
    let Some(dot) = ts.find('.') else {
        return ts.to_string();
    };
    let head = &ts[..dot];
    let tail = &ts[dot + 1..];
    let digits_end = tail
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(tail.len());
    let (frac, offset) = tail.split_at(digits_end);
    let frac = &frac[..frac.len().min(max_digits)];
    if frac.is_empty() {
        format!("{head}{offset}")
    } else {
        format!("{head}.{frac}{offset}")
    }
}

fn value_field(rec: &RawRecord, key: &str) -> Option<Value> {
    rec.get(key).filter(|v| !v.is_null()).cloned()
}

fn string_field(rec: &RawRecord, key: &str) -> Option<String> {
    rec.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn first_value(rec: &RawRecord, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|key| value_field(rec, key))
}

/// The record's own `source` tag wins over the normalizer's default
fn source_tag(rec: &RawRecord, default: Source) -> Source {
    rec.get("source")
        .and_then(Value::as_str)
        .and_then(Source::from_tag)
        .unwrap_or(default)
}

/// Normalize one journal record; `None` when `__REALTIME_TIMESTAMP` is
/// missing or not a microsecond count.
pub fn normalize_systemd_record(rec: &RawRecord) -> Option<NormalizedEvent> {
    let dt = match rec.get("__REALTIME_TIMESTAMP")? {
        Value::String(s) => micros_epoch_to_utc(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_micros),
        _ => None,
    }?;

    Some(NormalizedEvent {
        timestamp: dt.to_rfc3339(),
        source: source_tag(rec, Source::Systemd),
        host: string_field(rec, "host").or_else(|| string_field(rec, "_HOSTNAME")),
        category: Category::Log,
        subtype: Source::Systemd.as_str().to_string(),
        payload: EventPayload::Systemd {
            severity: value_field(rec, "PRIORITY"),
            unit: first_value(rec, &["unit", "UNIT", "_SYSTEMD_UNIT"]),
            message: value_field(rec, "MESSAGE"),
        },
    })
}

/// Normalize one docker log record; `None` when the timestamp field is
/// null, absent, or unparseable under the ISO-string rule.
pub fn normalize_docker_record(rec: &RawRecord) -> Option<NormalizedEvent> {
    let raw_ts = rec.get("timestamp").and_then(Value::as_str)?;
    let dt = iso_string_to_utc(raw_ts)?;

    Some(NormalizedEvent {
        timestamp: dt.to_rfc3339(),
        source: source_tag(rec, Source::Docker),
        host: string_field(rec, "host"),
        category: Category::Log,
        subtype: Source::Docker.as_str().to_string(),
        payload: EventPayload::Docker {
            container_id: value_field(rec, "container_id"),
            container_name: value_field(rec, "container_name"),
            message: value_field(rec, "message"),
        },
    })
}

/// Normalize one GPU sample record; `None` when `collected_at` is missing
/// or unparseable under the ISO-string rule.
pub fn normalize_gpu_record(rec: &RawRecord) -> Option<NormalizedEvent> {
    let raw_ts = rec.get("collected_at").and_then(Value::as_str)?;
    let dt = iso_string_to_utc(raw_ts)?;

    Some(NormalizedEvent {
        timestamp: dt.to_rfc3339(),
        source: source_tag(rec, Source::Gpu),
        host: string_field(rec, "host"),
        category: Category::Metric,
        subtype: Source::Gpu.as_str().to_string(),
        payload: EventPayload::Gpu {
            gpu_index: value_field(rec, "gpu_index"),
            gpu_name: value_field(rec, "gpu_name"),
            temperature_gpu_c: value_field(rec, "temperature_gpu_c"),
            utilization_gpu_pct: value_field(rec, "utilization_gpu_pct"),
            memory_used_mb: value_field(rec, "memory_used_mb"),
            memory_total_mb: value_field(rec, "memory_total_mb"),
        },
    })
}

/// Dispatch to the normalizer matching the source a raw file belongs to
pub fn normalize_record(source: Source, rec: &RawRecord) -> Option<NormalizedEvent> {
    match source {
        Source::Systemd => normalize_systemd_record(rec),
        Source::Docker => normalize_docker_record(rec),
        Source::Gpu => normalize_gpu_record(rec),
    }
}
