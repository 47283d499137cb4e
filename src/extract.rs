//! Structured-object extraction from raw completion text.
//!
//! Completions often wrap the JSON object in markdown fences or prose. The
//! extractor prefers a ```json fence, then any fence, then the first
//! top-level brace-delimited span that parses. Failure is a typed parse
//! error; callers decide whether that is retryable (multipass) or defaulted
//! (hybrid).
use crate::error::GenerationError;
use serde::Deserialize;
use serde_json::Value;

/// Extract a single JSON object from a completion response.
pub fn extract_object(raw: &str) -> Result<Value, GenerationError> {
    let candidate = fenced_block(raw).unwrap_or_else(|| raw.trim());

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => return Ok(Value::Object(map)),
        Ok(other) => {
            return Err(GenerationError::Parse(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            )))
        }
        Err(_) => {}
    }

    if let Some(value) = first_object_span(candidate) {
        return Ok(value);
    }

    Err(GenerationError::Parse(format!(
        "no JSON object found in response: {}",
        snippet(raw, 200)
    )))
}

/// Extract and deserialize in one step.
pub fn extract_as<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<T, GenerationError> {
    let value = extract_object(raw)?;
    serde_json::from_value(value)
        .map_err(|err| GenerationError::Parse(format!("response shape mismatch: {err}")))
}

/// Content of the first markdown code fence, if any.
fn fenced_block(raw: &str) -> Option<&str> {
    let text = raw.trim();

    if let Some(start) = text.find("```json") {
        let start = start + "```json".len();
        if let Some(end) = text[start..].find("```") {
            return Some(text[start..start + end].trim());
        }
    }

    if let Some(start) = text.find("```") {
        let start = start + 3;
        // Skip a language identifier line if present
        let start = text[start..]
            .find('\n')
            .map(|idx| start + idx + 1)
            .unwrap_or(start);
        if let Some(end) = text[start..].find("```") {
            return Some(text[start..start + end].trim());
        }
    }

    None
}

/// First top-level `{...}` span that parses as an object.
fn first_object_span(raw: &str) -> Option<Value> {
    for (idx, ch) in raw.char_indices() {
        if ch != '{' {
            continue;
        }
        let mut deserializer = serde_json::Deserializer::from_str(&raw[idx..]);
        if let Ok(value) = Value::deserialize(&mut deserializer) {
            if value.is_object() {
                return Some(value);
            }
        }
    }
    None
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Truncate text for error messages without splitting a char.
pub fn snippet(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
