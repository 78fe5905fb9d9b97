//! Canonical protocol text for primitive values.
//!
//! Every formatter here has a matching parser and the pair round-trips:
//! reals use the shortest representation that parses back to the same bits,
//! date-times are RFC 3339 in UTC, time spans are a decimal number of seconds.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

use crate::error::ValueError;
use crate::kind::ValueKind;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

pub fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

pub fn parse_bool(text: &str) -> Result<bool, ValueError> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ValueError::parse(ValueKind::Logical, text))
    }
}

pub fn format_f64(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        value.to_string()
    }
}

pub fn format_f32(value: f32) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        format_f64(value as f64)
    }
}

pub fn parse_f64(text: &str) -> Result<f64, ValueError> {
    match text.trim() {
        "NaN" => Ok(f64::NAN),
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        t => t
            .parse::<f64>()
            .map_err(|_| ValueError::parse(ValueKind::Real, text)),
    }
}

pub fn format_date_time(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_date_time(text: &str) -> Result<DateTime<Utc>, ValueError> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| ValueError::parse(ValueKind::DateTime, text))
}

/// Time spans travel as a number of seconds.
pub fn time_span_seconds(value: &TimeDelta) -> f64 {
    value.num_seconds() as f64 + value.subsec_nanos() as f64 / NANOS_PER_SECOND
}

pub fn time_span_from_seconds(seconds: f64) -> Option<TimeDelta> {
    let nanos = (seconds * NANOS_PER_SECOND).round();
    if !nanos.is_finite() || nanos.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(TimeDelta::nanoseconds(nanos as i64))
}

pub fn format_time_span(value: &TimeDelta) -> String {
    format_f64(time_span_seconds(value))
}

pub fn parse_time_span(text: &str) -> Result<TimeDelta, ValueError> {
    let seconds = parse_f64(text).map_err(|_| ValueError::parse(ValueKind::TimeSpan, text))?;
    time_span_from_seconds(seconds).ok_or_else(|| ValueError::parse(ValueKind::TimeSpan, text))
}
