//! Progress normalization for provider queue updates.
//!
//! Providers report progress as free text, bare numbers, lists of log entries,
//! or not at all. Everything is reduced to a percentage in `0..=100`. When no
//! numeric signal exists the [`FALLBACK_PERCENT`] midpoint is reported so the
//! client keeps moving instead of stalling at zero.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Reported when an update carries no numeric signal.
pub const FALLBACK_PERCENT: u8 = 50;

/// Message used when an update carries no text.
pub const DEFAULT_MESSAGE: &str = "Processing...";

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("static regex is valid"));

/// First percentage (`42%`, `12.5 %`) in free text.
pub fn percent_from_text(text: &str) -> Option<u8> {
    PERCENT_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .and_then(clamp_percent)
}

/// Round and clamp to `0..=100`. `None` for NaN.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_percent(value: f64) -> Option<u8> {
    if value.is_nan() {
        return None;
    }
    Some(value.round().clamp(0.0, 100.0) as u8)
}

/// Reduce a provider-native progress payload to a percentage.
pub fn normalize_percent(payload: &Value) -> u8 {
    let signal = match payload {
        Value::Array(entries) => entries.iter().rev().find_map(entry_percent),
        other => entry_percent(other),
    };
    signal.unwrap_or(FALLBACK_PERCENT)
}

/// Human-readable text for a progress payload: the most recent log line.
pub fn progress_message(payload: &Value) -> String {
    let text = match payload {
        Value::Array(entries) => entries.iter().rev().find_map(entry_text),
        other => entry_text(other),
    };
    text.map_or_else(|| DEFAULT_MESSAGE.to_string(), str::to_string)
}

fn entry_percent(entry: &Value) -> Option<u8> {
    match entry {
        Value::Number(n) => n.as_f64().and_then(clamp_percent),
        Value::String(s) => percent_from_text(s),
        Value::Object(map) => ["progress", "percent"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|v| match v {
                Value::Number(n) => n.as_f64().and_then(clamp_percent),
                Value::String(s) => s
                    .trim()
                    .trim_end_matches('%')
                    .parse::<f64>()
                    .ok()
                    .and_then(clamp_percent),
                _ => None,
            })
            .or_else(|| {
                map.get("message")
                    .and_then(Value::as_str)
                    .and_then(percent_from_text)
            }),
        _ => None,
    }
}

fn entry_text(entry: &Value) -> Option<&str> {
    let text = match entry {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("message").and_then(Value::as_str)?,
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then_some(text)
}
