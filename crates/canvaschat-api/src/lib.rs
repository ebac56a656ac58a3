//! # canvaschat-api
//!
//! Provider clients for canvaschat: a narrow, stateless interface wrapping
//! one HTTP call per operation against an LLM provider.
//!
//! ## Features
//!
//! - **Unified Contracts**: `CompletionClient` for text, `ImageClient` for
//!   image generation, both behind a shared `ProviderHandle` credential check
//! - **Usage Normalization**: native token counts preferred over normalized
//!   ones, cost surfaced only when the provider reports it
//! - **Per-call Model Threading**: the model for a call is resolved from the
//!   request options, never from shared mutable client state
//! - **Cancellation**: an optional token aborts the in-flight HTTP request
//!
//! ## Example
//!
//! ```rust,no_run
//! use canvaschat_api::client::{CompletionClient, CompletionOptions};
//! use canvaschat_api::config::ClientFactory;
//! use canvaschat_types::Message;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientFactory::create(
//!         Some("your-api-key".to_string()),
//!         "openai/gpt-4o-mini".to_string(),
//!         None,
//!     );
//!
//!     let messages = vec![
//!         Message::system("You are a helpful assistant."),
//!         Message::user("Hello!"),
//!     ];
//!
//!     let completion = client
//!         .create_completion(&messages, &CompletionOptions::default())
//!         .await?;
//!     println!("Response: {}", completion.content);
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;

// Re-export commonly used types
pub use client::{
    Completion, CompletionClient, CompletionOptions, ImageBatch, ImageClient, ImageRequest,
    ProviderError, ProviderHandle, RawUsage,
};

pub use config::{normalize_api_url, ClientFactory, OPENROUTER_API_URL};
