use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub const MEDIA_PLACEHOLDER: &str = "[媒体内容]";
pub const OBJECT_PLACEHOLDER: &str = "[对象内容]";

static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpe?g|png|gif|webp|bmp)(\?.*)?$").expect("static image pattern")
});

/// Flattens a host reply payload into one plain-text string.
///
/// Accepts whatever the host produced: `null`, a string, an array of message
/// elements (`{"type": "text", "attrs": {"content": ..}}`, media elements with
/// `attrs.url`, or bare strings), a single element, or any other object.
pub fn extract_text(payload: &Value) -> String {
    match payload {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(elements) => elements
            .iter()
            .map(element_text)
            .filter(|piece| !piece.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(_) => {
            if let Some(content) = text_element_content(payload) {
                return content.to_string();
            }
            match serde_json::to_string(payload) {
                Ok(json) => json.replace(['{', '}', '"', '\\'], ""),
                Err(_) => OBJECT_PLACEHOLDER.to_string(),
            }
        }
        other => other.to_string(),
    }
}

fn element_text(element: &Value) -> String {
    if let Value::String(s) = element {
        return s.clone();
    }
    if let Some(content) = text_element_content(element) {
        return content.to_string();
    }

    let attrs = element.get("attrs");
    if let Some(content) = attrs.and_then(|a| a.get("content")).and_then(Value::as_str) {
        return content.to_string();
    }
    if let Some(url) = attrs.and_then(|a| a.get("url")).and_then(Value::as_str) {
        if !IMAGE_URL.is_match(url) {
            return MEDIA_PLACEHOLDER.to_string();
        }
    }
    String::new()
}

fn text_element_content(element: &Value) -> Option<&str> {
    if element.get("type").and_then(Value::as_str) != Some("text") {
        return None;
    }
    element.get("attrs")?.get("content")?.as_str()
}
