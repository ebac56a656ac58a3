use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use canvaschat_types::Message;

use crate::client::{
    ChatResponse, Completion, CompletionClient, CompletionOptions, ImageBatch, ImageClient,
    ImageRequest, ProviderError, ProviderHandle, RawUsage,
};

/// Default application identification headers sent with every request.
const DEFAULT_APP_REFERER: &str = "https://github.com/canvaschat/canvaschat";
const DEFAULT_APP_TITLE: &str = "canvaschat";

/// OpenRouter-style provider client for chat completions and image
/// generation.
///
/// The client is stateless apart from its credentials and default model.
/// A per-call model override is threaded through the request body, so
/// concurrent calls with different models never interfere.
pub struct OpenRouterClient {
    api_key: Option<String>,
    model: String,
    api_url: String,
    app_referer: String,
    app_title: String,
    client: reqwest::Client,
}

impl OpenRouterClient {
    pub fn new(api_key: Option<String>, model: String, api_url: String) -> Self {
        // Ensure api_url doesn't end with a slash
        let api_url = api_url.trim_end_matches('/').to_string();
        Self {
            api_key,
            model,
            api_url,
            app_referer: DEFAULT_APP_REFERER.to_string(),
            app_title: DEFAULT_APP_TITLE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the identification headers reported to the provider.
    pub fn with_app_identity(mut self, referer: impl Into<String>, title: impl Into<String>) -> Self {
        self.app_referer = referer.into();
        self.app_title = title.into();
        self
    }

    /// The model used when a call carries no override.
    pub fn default_model(&self) -> &str {
        &self.model
    }

    fn bearer(&self) -> Result<&str, ProviderError> {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ProviderError::NotConfigured),
        }
    }

    async fn post_chat(
        &self,
        body: &serde_json::Value,
        cancel: Option<&CancellationToken>,
    ) -> Result<ChatResponse, ProviderError> {
        let key = self.bearer()?;

        log::debug!("POST {} model={}", self.api_url, body["model"]);

        let send = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", key))
            .header("HTTP-Referer", &self.app_referer)
            .header("X-Title", &self.app_title)
            .header("Content-Type", "application/json")
            .json(body)
            .send();

        let response = match cancel {
            Some(token) => tokio::select! {
                () = token.cancelled() => return Err(ProviderError::Cancelled),
                result = send => result?,
            },
            None => send.await?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let response_text = response.text().await?;
        Ok(serde_json::from_str(&response_text)?)
    }
}

impl ProviderHandle for OpenRouterClient {
    fn is_configured(&self) -> bool {
        self.api_key.as_deref().map_or(false, |key| !key.is_empty())
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn create_completion(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError> {
        let model = options.model.as_deref().unwrap_or(&self.model);

        let mut body = json!({
            "model": model,
            "messages": messages,
            "usage": {"include": true},
        });
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = options.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let ChatResponse { id, choices, usage } =
            self.post_chat(&body, options.cancel.as_ref()).await?;

        let usage = usage.as_ref().map(RawUsage::normalize);
        let choice = choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyCompletion)?;

        Ok(Completion {
            content: choice.message.content,
            finish_reason: choice.finish_reason,
            usage,
            id,
        })
    }
}

#[async_trait]
impl ImageClient for OpenRouterClient {
    async fn generate_images(&self, request: &ImageRequest) -> Result<ImageBatch, ProviderError> {
        // A fresh random seed when the caller supplies none, echoed back so
        // continuations can reproduce the generation.
        let seed = request.seed.unwrap_or_else(|| u64::from(rand::random::<u32>()));

        let body = json!({
            "model": request.model,
            "messages": request.messages,
            "modalities": ["image"],
            "image_config": {"aspect_ratio": request.aspect_ratio},
            "seed": seed,
            "usage": {"include": true},
        });

        let ChatResponse { choices, usage, .. } = self.post_chat(&body, None).await?;

        let usage = usage.as_ref().map(RawUsage::normalize);
        let choice = choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyCompletion)?;
        let images = choice.message.images.unwrap_or_default();
        if images.is_empty() {
            return Err(ProviderError::EmptyCompletion);
        }

        Ok(ImageBatch {
            images,
            seed,
            usage,
        })
    }
}
