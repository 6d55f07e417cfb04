use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AgentError;

/// Extract the first JSON object from model output that may contain surrounding text.
///
/// Accepts clean JSON, a fenced ```json block (or a bare ``` block), and an
/// object embedded in prose.
pub fn extract_json(text: &str) -> Result<String, AgentError> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') && is_json(trimmed) {
        return Ok(trimmed.to_string());
    }

    if let Some(fenced) = fenced_block(trimmed).filter(|s| is_json(s)) {
        return Ok(fenced);
    }

    if let Some(object) = first_object(trimmed).filter(|s| is_json(s)) {
        return Ok(object);
    }

    Err(AgentError::Parse(format!(
        "no JSON object in model output (length={})",
        text.len()
    )))
}

/// `extract_json` followed by deserialization into `T`.
pub fn parse_json_as<T: DeserializeOwned>(text: &str) -> Result<T, AgentError> {
    let json = extract_json(text)?;
    serde_json::from_str(&json).map_err(|e| AgentError::Parse(format!("{e} in {json}")))
}

fn is_json(candidate: &str) -> bool {
    serde_json::from_str::<Value>(candidate).is_ok()
}

fn fenced_block(text: &str) -> Option<String> {
    let open = text.find("```")?;
    let after_ticks = &text[open + 3..];
    // Skip an optional language tag on the opening fence line.
    let body_start = after_ticks.find('\n')? + 1;
    let body = &after_ticks[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim().to_string())
}

/// First balanced `{ ... }`, ignoring braces inside string literals.
fn first_object(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' if start.is_some() => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| text[s..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
