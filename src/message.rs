//! Message-example normalization.
//!
//! Two shapes exist in stored documents: the canonical form, a list of
//! conversations each wrapping a `messages` list, and a legacy flat form, a
//! single bare list of messages. Both normalize to the same nested
//! conversation structure. Unrecognized shapes normalize to empty with a
//! diagnostic; normalization never fails.

use crate::diagnostics::{Diagnostics, ReasonCode, Stage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One normalized example message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub user: String,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub text: String,
    /// Absent rather than empty: a stored "" collapses to `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// A conversation is an ordered list of messages.
pub type Conversation = Vec<Message>;

/// Detected top-level shape of a `messageExamples` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExampleShape {
    /// Canonical: `[{messages: [...]}, ...]`.
    Wrapped,
    /// Legacy: `[{user, content}, ...]`, one implicit conversation.
    Flat,
    /// Null, absent, or an empty list.
    Empty,
    Unrecognized,
}

fn detect_shape(raw: &Value) -> ExampleShape {
    let items = match raw {
        Value::Null => return ExampleShape::Empty,
        Value::Array(items) if items.is_empty() => return ExampleShape::Empty,
        Value::Array(items) => items,
        _ => return ExampleShape::Unrecognized,
    };

    if items
        .iter()
        .all(|item| item.get("messages").map(Value::is_array).unwrap_or(false))
    {
        return ExampleShape::Wrapped;
    }
    if items
        .iter()
        .all(|item| item.get("user").is_some() && item.get("content").is_some())
    {
        return ExampleShape::Flat;
    }
    ExampleShape::Unrecognized
}

/// Normalize a raw `messageExamples` value into conversations.
pub fn normalize(raw: &Value, diags: &mut Diagnostics) -> Vec<Conversation> {
    match detect_shape(raw) {
        ExampleShape::Empty => Vec::new(),
        ExampleShape::Wrapped => raw
            .as_array()
            .map(|conversations| {
                conversations
                    .iter()
                    .map(|conv| {
                        let messages = conv
                            .get("messages")
                            .and_then(Value::as_array)
                            .cloned()
                            .unwrap_or_default();
                        normalize_conversation(&messages, diags)
                    })
                    .collect()
            })
            .unwrap_or_default(),
        ExampleShape::Flat => {
            let messages = raw.as_array().cloned().unwrap_or_default();
            vec![normalize_conversation(&messages, diags)]
        }
        ExampleShape::Unrecognized => {
            diags.warn(
                Stage::Examples,
                ReasonCode::UnrecognizedExampleShape,
                "messageExamples matches neither the wrapped nor the flat shape; dropped",
            );
            Vec::new()
        }
    }
}

/// Normalize the messages of one conversation, dropping invalid entries.
fn normalize_conversation(messages: &[Value], diags: &mut Diagnostics) -> Conversation {
    messages
        .iter()
        .filter_map(|raw| match normalize_message(raw) {
            Some(message) => Some(message),
            None => {
                diags.warn(
                    Stage::Examples,
                    ReasonCode::DroppedMessage,
                    "message missing non-empty user or content.text; dropped",
                );
                None
            }
        })
        .collect()
}

fn normalize_message(raw: &Value) -> Option<Message> {
    let user = non_empty(raw.get("user"))?;
    let content = raw.get("content")?;
    let text = non_empty(content.get("text"))?;
    let action = non_empty(content.get("action"));
    Some(Message {
        user,
        content: MessageContent { text, action },
    })
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    match value.and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Some(s.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diags() -> Diagnostics {
        Diagnostics::new("doc")
    }

    #[test]
    fn test_wrapped_shape_unwraps_each_conversation() {
        let raw = json!([
            { "messages": [
                { "user": "a", "content": { "text": "hi" } },
                { "user": "b", "content": { "text": "hello" } }
            ]},
            { "messages": [
                { "user": "a", "content": { "text": "bye" } }
            ]}
        ]);
        let mut d = diags();
        let out = normalize(&raw, &mut d);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), 2);
        assert_eq!(out[1].len(), 1);
        assert_eq!(out[0][0].user, "a");
        assert!(d.is_empty());
    }

    #[test]
    fn test_flat_shape_wraps_into_one_conversation() {
        let raw = json!([ { "user": "a", "content": { "text": "hi" } } ]);
        let mut d = diags();
        let out = normalize(&raw, &mut d);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0][0].content.text, "hi");
        assert!(d.is_empty());
    }

    #[test]
    fn test_flat_and_wrapped_equivalents_normalize_identically() {
        let flat = json!([
            { "user": "a", "content": { "text": "hi" } },
            { "user": "b", "content": { "text": "yo" } }
        ]);
        let wrapped = json!([{ "messages": [
            { "user": "a", "content": { "text": "hi" } },
            { "user": "b", "content": { "text": "yo" } }
        ]}]);

        let mut d = diags();
        assert_eq!(normalize(&flat, &mut d), normalize(&wrapped, &mut d));
    }

    #[test]
    fn test_empty_action_collapses_to_absent() {
        let raw = json!([ { "user": "a", "content": { "text": "hi", "action": "" } } ]);
        let mut d = diags();
        let out = normalize(&raw, &mut d);
        assert_eq!(out[0][0].content.action, None);

        let raw = json!([ { "user": "a", "content": { "text": "hi", "action": "WAVE" } } ]);
        let out = normalize(&raw, &mut d);
        assert_eq!(out[0][0].content.action.as_deref(), Some("WAVE"));
    }

    #[test]
    fn test_invalid_message_dropped_not_conversation() {
        let raw = json!([{ "messages": [
            { "user": "a", "content": { "text": "hi" } },
            { "user": "", "content": { "text": "ghost" } },
            { "user": "b", "content": { "text": "" } }
        ]}]);
        let mut d = diags();
        let out = normalize(&raw, &mut d);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0][0].user, "a");
        assert_eq!(d.count_of(ReasonCode::DroppedMessage), 2);
    }

    #[test]
    fn test_null_and_empty_normalize_silently() {
        let mut d = diags();
        assert!(normalize(&Value::Null, &mut d).is_empty());
        assert!(normalize(&json!([]), &mut d).is_empty());
        assert!(d.is_empty());
    }

    #[test]
    fn test_unrecognized_shape_drops_with_diagnostic() {
        let mut d = diags();
        let out = normalize(&json!({ "oops": true }), &mut d);
        assert!(out.is_empty());
        assert_eq!(d.count_of(ReasonCode::UnrecognizedExampleShape), 1);

        let mut d = diags();
        let out = normalize(&json!(["just", "strings"]), &mut d);
        assert!(out.is_empty());
        assert_eq!(d.count_of(ReasonCode::UnrecognizedExampleShape), 1);
    }
}
