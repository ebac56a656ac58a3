use std::env;
use std::sync::Arc;

use crate::client::OpenRouterClient;
use crate::config::{normalize_api_url, OPENROUTER_API_URL};

/// Client factory for creating provider clients
pub struct ClientFactory;

impl ClientFactory {
    /// Create a provider client.
    ///
    /// # Arguments
    /// * `api_key` - API key for authentication; falls back to the
    ///   `OPENROUTER_API_KEY` environment variable when `None`
    /// * `model` - Default model for calls that carry no override
    /// * `api_url` - Optional custom API URL (uses the default endpoint if `None`)
    ///
    /// # Returns
    /// Arc-wrapped client implementing `CompletionClient` and `ImageClient`.
    /// A missing key does not fail here; configuration is checked lazily at
    /// call time.
    pub fn create(
        api_key: Option<String>,
        model: String,
        api_url: Option<String>,
    ) -> Arc<OpenRouterClient> {
        let url = api_url
            .map(|url| normalize_api_url(&url))
            .unwrap_or_else(|| OPENROUTER_API_URL.to_string());
        let key = api_key.or_else(|| env::var("OPENROUTER_API_KEY").ok());

        Arc::new(OpenRouterClient::new(key, model, url))
    }
}
