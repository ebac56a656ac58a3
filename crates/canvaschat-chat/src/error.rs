use thiserror::Error;

use canvaschat_api::client::ProviderError;

use crate::svg::SvgExtractionError;

/// Errors surfaced by orchestrator operations.
///
/// Every variant is terminal for the call: there are no retries and no
/// automatic fallback. The only non-exceptional failure path is the
/// text-modality max-turns soft stop, which returns a normal result.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The orchestrator was used before a client was injected.
    #[error("no provider client configured")]
    NoClientConfigured,
    /// The injected client lacks credentials; user-actionable.
    #[error("provider is not configured: add your API key")]
    NotConfigured,
    /// Unknown conversation id with no rehydration material supplied.
    #[error("Conversation not found. Please start a new generation.")]
    ConversationNotFound,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    SvgExtraction(#[from] SvgExtractionError),
}
