//! Parsing of loosely formatted JSON objects returned by LLMs: strips code
//! fences, extracts the first balanced object, falls back to `json-repair`.
//! Anything that cannot be recovered into a single JSON object is a
//! malformed-response failure.

use serde_json::Value;

use crate::error::{truncate_message, EvalError};

/// Parse a model answer into exactly one JSON object.
pub fn parse_object(input: &str) -> Result<Value, EvalError> {
    let t = strip_code_fences(input.trim());
    if let Ok(v) = serde_json::from_str::<Value>(t) {
        return require_object(v, input);
    }
    if let Some(s) = extract_first_balanced_object(t) {
        if let Ok(v) = serde_json::from_str::<Value>(&s) {
            return require_object(v, input);
        }
    }
    match json_repair::repair_json_string(t) {
        Ok(v) => require_object(v, input),
        Err(_) => Err(EvalError::MalformedResponse(truncate_message(input))),
    }
}

fn require_object(v: Value, raw: &str) -> Result<Value, EvalError> {
    if v.is_object() {
        Ok(v)
    } else {
        Err(EvalError::MalformedResponse(truncate_message(raw)))
    }
}

/// Remove common Markdown code fences around JSON snippets.
fn strip_code_fences(s: &str) -> &str {
    let s = s.strip_prefix("```json").unwrap_or(s);
    let s = s.strip_prefix("```").unwrap_or(s);
    let s = s.strip_suffix("```").unwrap_or(s);
    s.trim()
}

/// Extract the first balanced `{..}` block, skipping string contents.
fn extract_first_balanced_object(s: &str) -> Option<String> {
    let mut in_str = false;
    let mut esc = false;
    let mut depth = 0usize;
    let mut start: Option<usize> = None;

    for (i, ch) in s.char_indices() {
        if in_str {
            if esc {
                esc = false;
            } else if ch == '\\' {
                esc = true;
            } else if ch == '"' {
                in_str = false;
            }
            continue;
        }

        match ch {
            '"' if depth > 0 => in_str = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let st = start.unwrap_or(0);
                    return Some(s[st..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
