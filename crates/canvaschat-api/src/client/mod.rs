use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use canvaschat_types::{GeneratedImage, Message, TokenUsage};

pub mod openrouter;

pub use openrouter::OpenRouterClient;

/// Errors raised by provider clients.
///
/// Every variant is terminal for the call that produced it; this layer
/// performs no retries and no fallback.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider is not configured: API key is missing")]
    NotConfigured,
    #[error("provider request failed with status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("provider returned an empty completion")]
    EmptyCompletion,
    #[error("request was cancelled")]
    Cancelled,
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

/// Credential state shared by all provider clients.
pub trait ProviderHandle: Send + Sync {
    /// True iff credentials are present. Never performs a network call.
    fn is_configured(&self) -> bool;
}

/// Text completion client - one outbound HTTP request per call.
#[async_trait]
pub trait CompletionClient: ProviderHandle {
    async fn create_completion(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError>;
}

/// Image generation client - one outbound HTTP request per call.
#[async_trait]
pub trait ImageClient: ProviderHandle {
    async fn generate_images(&self, request: &ImageRequest) -> Result<ImageBatch, ProviderError>;
}

/// Per-call options for a text completion.
///
/// The effective model is `model` when set, otherwise the client's default.
/// Resolution happens per call into the request body, so concurrent calls
/// with different models never observe each other's selection.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub cancel: Option<CancellationToken>,
}

/// A parsed text completion.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
    pub id: Option<String>,
}

/// One image generation request.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub messages: Vec<Message>,
    pub model: String,
    pub aspect_ratio: String,
    pub seed: Option<u64>,
}

/// A parsed image generation response.
///
/// `seed` is the seed actually used, for reproducible continuation.
#[derive(Debug, Clone)]
pub struct ImageBatch {
    pub images: Vec<GeneratedImage>,
    pub seed: u64,
    pub usage: Option<TokenUsage>,
}

// ============================================================================
// Wire Model
// ============================================================================

/// Chat-completions response body.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<RawUsage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: String,
    #[serde(deserialize_with = "canvaschat_types::deserialize_string_or_null", default)]
    pub content: String,
    #[serde(default)]
    pub images: Option<Vec<GeneratedImage>>,
}

/// Provider-reported usage, before normalization.
///
/// Providers may report normalized counts, native-tokenizer counts, or both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
    #[serde(default)]
    pub native_tokens_prompt: Option<u64>,
    #[serde(default)]
    pub native_tokens_completion: Option<u64>,
    #[serde(default)]
    pub cost: Option<f64>,
}

impl RawUsage {
    /// Native token counts win over normalized ones; the total is recomputed
    /// from the chosen pair.
    pub fn normalize(&self) -> TokenUsage {
        let prompt_tokens = self.native_tokens_prompt.or(self.prompt_tokens).unwrap_or(0);
        let completion_tokens = self
            .native_tokens_completion
            .or(self.completion_tokens)
            .unwrap_or(0);
        TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            cost_usd: self.cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn native_counts_win_over_normalized() {
        let raw: RawUsage = serde_json::from_value(json!({
            "prompt_tokens": 12,
            "completion_tokens": 20,
            "total_tokens": 32,
            "native_tokens_prompt": 15,
            "native_tokens_completion": 25,
        }))
        .unwrap();
        let usage = raw.normalize();
        assert_eq!(usage.prompt_tokens, 15);
        assert_eq!(usage.completion_tokens, 25);
        assert_eq!(usage.total_tokens, 40);
        assert_eq!(usage.cost_usd, None);
    }

    #[test]
    fn normalized_counts_are_the_fallback() {
        let raw: RawUsage = serde_json::from_value(json!({
            "prompt_tokens": 12,
            "completion_tokens": 20,
        }))
        .unwrap();
        let usage = raw.normalize();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 20);
        assert_eq!(usage.total_tokens, 32);
    }

    #[test]
    fn cost_is_surfaced_only_when_reported() {
        let raw: RawUsage =
            serde_json::from_value(json!({"prompt_tokens": 1, "completion_tokens": 1, "cost": 0.002}))
                .unwrap();
        assert_eq!(raw.normalize().cost_usd, Some(0.002));
    }

    #[test]
    fn response_with_null_content_parses() {
        let response: ChatResponse = serde_json::from_value(json!({
            "id": "gen-1",
            "choices": [{
                "message": {"role": "assistant", "content": null},
                "finish_reason": "stop"
            }]
        }))
        .unwrap();
        assert_eq!(response.choices[0].message.content, "");
        assert!(response.usage.is_none());
    }

    #[test]
    fn response_with_images_parses() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "",
                    "images": [
                        {"type": "image_url", "image_url": {"url": "data:image/png;base64,AA"}}
                    ]
                }
            }]
        }))
        .unwrap();
        let images = response.choices[0].message.images.as_ref().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].image_url.url, "data:image/png;base64,AA");
    }
}
