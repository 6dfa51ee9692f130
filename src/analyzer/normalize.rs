//! Conversion of free-form completion text into an [`AnalysisResult`].
//!
//! The model is asked for JSON only, but answers often carry prose or
//! markdown around the payload, and individual fields may be missing or of
//! the wrong type. Every failure here ends up inside the returned result:
//! nothing in this module returns an error to the caller.

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::types::{AnalysisResult, AnalysisStatus, ConfigChange, RoamingMetrics, MAX_SCORE};
use crate::device::DeviceConfig;

/// A numeric field of the model answer with its default and coercion.
struct NumericField {
    name: &'static str,
    default: f64,
    coerce: fn(&Value) -> Option<f64>,
}

impl NumericField {
    /// Absent, null, non-coercible and non-finite values all yield the default.
    fn read(&self, source: &Map<String, Value>) -> f64 {
        match source.get(self.name) {
            None | Some(Value::Null) => self.default,
            Some(value) => (self.coerce)(value)
                .filter(|n| n.is_finite())
                .unwrap_or(self.default),
        }
    }
}

const SCORE_FIELD: NumericField = NumericField {
    name: "score",
    default: 0.0,
    coerce: coerce_integer,
};

/// Fields of `roaming_metrics`. Names must match [`RoamingMetrics`].
const METRIC_FIELDS: &[NumericField] = &[
    NumericField { name: "total_events", default: 0.0, coerce: coerce_float },
    NumericField { name: "avg_handoff_time", default: 0.0, coerce: coerce_float },
    NumericField { name: "min_handoff_time", default: 0.0, coerce: coerce_float },
    NumericField { name: "max_handoff_time", default: 0.0, coerce: coerce_float },
    NumericField { name: "avg_snr_before", default: 0.0, coerce: coerce_float },
    NumericField { name: "avg_snr_after", default: 0.0, coerce: coerce_float },
    NumericField { name: "snr_improvement", default: 0.0, coerce: coerce_float },
];

/// Normalize a raw completion answer.
///
/// `config` is the configuration that was sent with the request; it is
/// echoed into the result so recommended changes can be applied later.
pub fn normalize_response(raw_response: &str, config: &DeviceConfig) -> AnalysisResult {
    let fields = match parse_response_json(raw_response) {
        Ok(fields) => fields,
        Err(e) => {
            warn!("Failed to process AI response: {}", e);
            return AnalysisResult::error(
                format!("Unable to process the AI response: {}", e),
                raw_response,
                config.clone(),
            );
        }
    };

    let score = (SCORE_FIELD.read(&fields) as i64).clamp(0, i64::from(MAX_SCORE)) as u32;
    let status = AnalysisStatus::from_score(score, MAX_SCORE);

    let result = AnalysisResult {
        score,
        max_score: MAX_SCORE,
        status,
        roaming_metrics: read_metrics(fields.get("roaming_metrics")),
        recommendations: read_recommendations(fields.get("recommendations")),
        config_changes: read_config_changes(fields.get("config_changes")),
        insights: fields.get("analysis").map(value_to_text).unwrap_or_default(),
        source_config: config.clone(),
        created_at: Utc::now(),
        error_message: None,
        raw_response: None,
    };

    info!(
        "Normalized AI response: score={}, status={}, recommendations={}, config_changes={}",
        result.score,
        result.status,
        result.recommendations.len(),
        result.config_changes.len()
    );
    result
}

/// Locate and parse the JSON object inside a completion answer.
///
/// Strategies, in order:
/// 1. The span from the first `{` to the last `}`.
/// 2. Each balanced top-level `{...}` object (string-literal aware).
/// 3. The whole answer, with a surrounding markdown code fence removed.
pub fn parse_response_json(raw_response: &str) -> Result<Map<String, Value>, String> {
    if let Some(candidate) = brace_span(raw_response) {
        match serde_json::from_str::<Map<String, Value>>(candidate) {
            Ok(fields) => return Ok(fields),
            Err(e) => debug!("Brace span is not valid JSON ({}), scanning for objects", e),
        }
        for object in balanced_objects(raw_response) {
            if let Ok(fields) = serde_json::from_str::<Map<String, Value>>(object) {
                return Ok(fields);
            }
        }
    }

    let whole = strip_markdown_json(raw_response);
    match serde_json::from_str::<Value>(whole) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

/// Substring from the first `{` to the last `}` inclusive, if ordered.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Top-level `{...}` spans, ignoring braces inside JSON string literals.
fn balanced_objects(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = idx;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=idx]);
                }
            }
            _ => {}
        }
    }
    spans
}

/// Strip markdown code fences from an answer if present.
/// Some models wrap JSON in ```json ... ``` even when asked not to.
fn strip_markdown_json(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    // Remove opening fence (with optional language tag)
    let after_open = match trimmed.find('\n') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    };
    let cleaned = after_open.trim_end();
    cleaned.strip_suffix("```").map(str::trim).unwrap_or(cleaned)
}

fn read_metrics(value: Option<&Value>) -> RoamingMetrics {
    let empty = Map::new();
    let source = value.and_then(Value::as_object).unwrap_or(&empty);

    let mut normalized = Map::new();
    for field in METRIC_FIELDS {
        let number = field.read(source);
        if let Some(number) = serde_json::Number::from_f64(number) {
            normalized.insert(field.name.to_string(), Value::Number(number));
        }
    }
    serde_json::from_value(Value::Object(normalized)).unwrap_or_else(|e| {
        warn!("Failed to build roaming metrics: {}", e);
        RoamingMetrics::default()
    })
}

/// Kept only when every element is a string.
fn read_recommendations(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let strings: Option<Vec<String>> = items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect();
    strings.unwrap_or_else(|| {
        warn!("Ignoring recommendations: not an array of strings");
        Vec::new()
    })
}

/// Items that are not JSON objects are dropped, and a `null` recommended
/// value counts as absent so `apply` skips it; object fields are otherwise
/// not validated.
fn read_config_changes(value: Option<&Value>) -> Vec<ConfigChange> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let change = config_change_from_value(item);
            if change.is_none() {
                warn!("Dropping config change that is not an object: {}", item);
            }
            change
        })
        .collect()
}

/// Map one `config_changes` item without validating its fields.
fn config_change_from_value(item: &Value) -> Option<ConfigChange> {
    let obj = item.as_object()?;
    let first = |keys: &[&str]| keys.iter().find_map(|k| obj.get(*k));

    Some(ConfigChange {
        parameter: first(&["param", "parameter"])
            .map(value_to_text)
            .unwrap_or_default(),
        current_value: first(&["current", "current_value"])
            .cloned()
            .unwrap_or(Value::Null),
        recommended_value: first(&["recommended", "recommended_value"])
            .filter(|v| !v.is_null())
            .cloned(),
        reason: first(&["reason"]).map(value_to_text).unwrap_or_default(),
        impact: first(&["impact"])
            .filter(|v| !v.is_null())
            .map(value_to_text),
    })
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Numbers as-is; strings by their leading decimal number ("120 ms" -> 120).
fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_float(s),
        _ => None,
    }
}

/// Numbers truncated toward zero; strings by their leading integer ("85/100" -> 85).
fn coerce_integer(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().map(f64::trunc),
        Value::String(s) => leading_integer(s),
        _ => None,
    }
}

fn leading_integer(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse::<f64>().ok()
}

fn leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let mut digits = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        let mut frac_digits = 0;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
            frac_digits += 1;
        }
        if digits + frac_digits > 0 {
            end = frac_end;
            digits += frac_digits;
        }
    }
    if digits == 0 {
        return None;
    }
    // Exponent only counts when followed by at least one digit.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok()
}
