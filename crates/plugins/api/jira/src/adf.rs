//! Atlassian Document Format conversion.
//!
//! Jira Cloud (API v3) exchanges rich text as ADF trees; self-hosted v2 uses
//! plain strings. Only paragraphs, text and hard breaks are produced; on the
//! read side every text node is collected regardless of its container.

use serde_json::{json, Value};

/// Plain text to an ADF document. Blank lines separate paragraphs, single
/// newlines become hard breaks.
pub fn text_to_adf(text: &str) -> Value {
    let paragraphs: Vec<Value> = if text.is_empty() {
        vec![paragraph(Vec::new())]
    } else {
        text.split("\n\n")
            .map(|para| {
                let mut inline = Vec::new();
                for (i, line) in para.split('\n').enumerate() {
                    if i > 0 {
                        inline.push(json!({ "type": "hardBreak" }));
                    }
                    if !line.is_empty() {
                        inline.push(json!({ "type": "text", "text": line }));
                    }
                }
                paragraph(inline)
            })
            .collect()
    };

    json!({ "version": 1, "type": "doc", "content": paragraphs })
}

fn paragraph(content: Vec<Value>) -> Value {
    json!({ "type": "paragraph", "content": content })
}

/// Flatten an ADF node to plain text. Strings pass through unchanged.
pub fn adf_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(node) => {
            let kind = node.get("type").and_then(Value::as_str);
            match kind {
                Some("text") => node
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                Some("hardBreak") => "\n".to_string(),
                _ => {
                    let children = node
                        .get("content")
                        .and_then(Value::as_array)
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    let texts = children.iter().map(adf_to_text);
                    if kind == Some("doc") {
                        texts
                            .filter(|t| !t.is_empty())
                            .collect::<Vec<_>>()
                            .join("\n\n")
                    } else {
                        texts.collect()
                    }
                }
            }
        }
        other => other.to_string(),
    }
}

/// Read a rich-text field value (description, textarea custom fields).
///
/// Empty results are `None`.
pub fn read_rich_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other if other.get("type").is_some() => adf_to_text(other),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_to_adf_paragraphs_and_breaks() {
        let adf = text_to_adf("Line 1\nLine 2\n\nSecond");
        assert_eq!(adf["type"], "doc");
        let content = adf["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);

        let first = content[0]["content"].as_array().unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first[0]["text"], "Line 1");
        assert_eq!(first[1]["type"], "hardBreak");
        assert_eq!(first[2]["text"], "Line 2");
        assert_eq!(content[1]["content"][0]["text"], "Second");
    }

    #[test]
    fn test_text_to_adf_empty() {
        let adf = text_to_adf("");
        let content = adf["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert!(content[0]["content"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_adf_round_trip_text() {
        let text = "First\nwith break\n\nSecond";
        assert_eq!(adf_to_text(&text_to_adf(text)), text);
    }

    #[test]
    fn test_adf_to_text_nested_lists() {
        let adf = json!({
            "type": "doc",
            "version": 1,
            "content": [{
                "type": "bulletList",
                "content": [{
                    "type": "listItem",
                    "content": [{
                        "type": "paragraph",
                        "content": [{"type": "text", "text": "item"}]
                    }]
                }]
            }]
        });
        assert_eq!(adf_to_text(&adf), "item");
    }

    #[test]
    fn test_read_rich_text() {
        assert_eq!(read_rich_text(None), None);
        assert_eq!(read_rich_text(Some(&Value::Null)), None);
        assert_eq!(read_rich_text(Some(&json!(""))), None);
        assert_eq!(
            read_rich_text(Some(&json!("plain"))).as_deref(),
            Some("plain")
        );
        assert_eq!(
            read_rich_text(Some(&text_to_adf("from adf"))).as_deref(),
            Some("from adf")
        );
    }
}
