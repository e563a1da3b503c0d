use serde_json::Value;

/// Pull the JSON payload out of a model reply.
///
/// Models wrap JSON in ```json fences or surround it with prose despite being
/// told not to, so this strips the fence if there is one and otherwise cuts
/// from the first `{`/`[` to the last matching closer.
pub fn extract_json(input: &str) -> Option<Value> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(v) = serde_json::from_str(trimmed) {
        return Some(v);
    }

    if let Some(block) = extract_fenced_block(trimmed) {
        if let Ok(v) = serde_json::from_str(block) {
            return Some(v);
        }
    }

    let candidate = extract_bracketed(trimmed)?;
    serde_json::from_str(candidate).ok()
}

/// Contents of the first ``` fence, skipping the language tag line.
fn extract_fenced_block(input: &str) -> Option<&str> {
    let start = input.find("```")?;
    let after_tag = &input[start + 3..];

    let body_start = after_tag.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_tag[body_start..];

    let end = body.find("```").unwrap_or(body.len());
    let block = body[..end].trim();

    if block.is_empty() {
        None
    } else {
        Some(block)
    }
}

/// Slice from the first opening bracket to the last closer of the same kind.
fn extract_bracketed(input: &str) -> Option<&str> {
    let open = input.find(|c: char| c == '{' || c == '[')?;
    let closer = if input[open..].starts_with('{') { '}' } else { ']' };
    let close = input.rfind(closer)?;
    if close <= open {
        return None;
    }
    Some(&input[open..=close])
}

/// Collect the string elements of a JSON array, ignoring anything else.
/// Returns `None` when the value is not an array at all.
pub fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}
