//! Core types and structures for canvaschat
//!
//! This crate provides the foundational message, usage, and envelope types
//! used across all canvaschat crates.

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Message Types
// ============================================================================

/// Helper function to deserialize string or null values
pub fn deserialize_string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Null => Ok(String::new()),
        _ => Ok(String::new()),
    }
}

/// One conversation message in the chat-completions wire format.
///
/// `content` is either a plain string or a multimodal content-part list.
/// Assistant messages for the image modality additionally carry the
/// generated-image references in `images`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub images: Option<Vec<GeneratedImage>>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(text.into()),
            images: None,
        }
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            images: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: MessageContent::Text(text.into()),
            images: None,
        }
    }

    pub fn assistant_with_images(text: impl Into<String>, images: Vec<GeneratedImage>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: MessageContent::Text(text.into()),
            images: Some(images),
        }
    }
}

/// Message content: a plain string or an ordered list of content parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

/// One part of a multimodal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageRef },
}

/// A reference to an image, inline (data URL) or remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
}

/// A caller-supplied image attached to a user prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
}

/// A provider-generated image carried on an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub image_url: ImageRef,
}

// ============================================================================
// Token Usage
// ============================================================================

/// Per-call token usage, normalized from the provider response.
///
/// `cost_usd` is only present when the provider reports a cost. A call whose
/// provider omits usage entirely yields no `TokenUsage` at all; callers must
/// not conflate "no usage reported" with zero usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cost_usd: Option<f64>,
}

impl TokenUsage {
    /// Accumulate another call's usage into this running total.
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        if let Some(cost) = other.cost_usd {
            *self.cost_usd.get_or_insert(0.0) += cost;
        }
    }
}

// ============================================================================
// Rehydration History
// ============================================================================

/// One completed turn of an externally persisted conversation, used to
/// rebuild in-memory state after it has been lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub prompt: String,
    pub output: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub images: Vec<GeneratedImage>,
}

impl HistoryEntry {
    pub fn new(prompt: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            output: output.into(),
            attachments: Vec::new(),
            images: Vec::new(),
        }
    }
}

// ============================================================================
// Request Envelope
// ============================================================================

/// Inbound request envelope routed by the message dispatcher.
///
/// Only `type` is needed for routing; the payload shape is
/// operation-specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(rename = "correlationId", skip_serializing_if = "Option::is_none", default)]
    pub correlation_id: Option<String>,
}

// ============================================================================
// Text Utilities
// ============================================================================

/// Safely truncate a string to a bounded preview, appending "..." when the
/// input is longer than `max_chars`.
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn plain_text_message_serializes_as_string_content() {
        let message = Message::user("draw a circle");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({"role": "user", "content": "draw a circle"})
        );
    }

    #[test]
    fn multimodal_message_serializes_as_tagged_parts() {
        let message = Message::user(MessageContent::Parts(vec![
            ContentPart::Text {
                text: "match this style".to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageRef {
                    url: "data:image/png;base64,AAAA".to_string(),
                },
            },
        ]));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "match this style"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}},
                ]
            })
        );
    }

    #[test]
    fn envelope_uses_wire_field_names() {
        let envelope: Envelope = serde_json::from_value(json!({
            "type": "sendMessage",
            "payload": {"prompt": "hi"},
            "correlationId": "abc-1"
        }))
        .unwrap();
        assert_eq!(envelope.kind, "sendMessage");
        assert_eq!(envelope.correlation_id.as_deref(), Some("abc-1"));
        assert_eq!(envelope.payload["prompt"], "hi");
    }

    #[test]
    fn envelope_payload_defaults_to_null() {
        let envelope: Envelope = serde_json::from_value(json!({"type": "clearAll"})).unwrap();
        assert_eq!(envelope.payload, serde_json::Value::Null);
        assert_eq!(envelope.correlation_id, None);
    }

    #[test]
    fn token_usage_accumulates_and_sums_cost_only_when_present() {
        let mut total = TokenUsage::default();
        total.add(&TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
            cost_usd: None,
        });
        assert_eq!(total.cost_usd, None);

        total.add(&TokenUsage {
            prompt_tokens: 2,
            completion_tokens: 3,
            total_tokens: 5,
            cost_usd: Some(0.25),
        });
        assert_eq!(total.prompt_tokens, 12);
        assert_eq!(total.completion_tokens, 8);
        assert_eq!(total.total_tokens, 20);
        assert_eq!(total.cost_usd, Some(0.25));
    }

    #[test]
    fn safe_truncate_keeps_short_input_intact() {
        assert_eq!(safe_truncate("hello", 200), "hello");
    }

    #[test]
    fn safe_truncate_bounds_long_input() {
        let long = "x".repeat(250);
        let preview = safe_truncate(&long, 200);
        assert_eq!(preview.chars().count(), 203);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn null_content_deserializes_to_empty_string() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(deserialize_with = "deserialize_string_or_null", default)]
            content: String,
        }
        let probe: Probe = serde_json::from_value(json!({"content": null})).unwrap();
        assert_eq!(probe.content, "");
    }
}
