//! Orchestrators coordinate a conversation manager with an injected provider
//! client. This is the unit consumers invoke.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use canvaschat_api::client::CompletionOptions;
use canvaschat_api::ProviderHandle;
use canvaschat_types::{Attachment, HistoryEntry, TokenUsage};

use crate::conversation::ConversationManager;
use crate::error::ChatError;
use crate::modality::ModalityAdapter;

/// Per-call request options.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Overrides the client's default model for this call only.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Image modality: fixes the generation seed for this call.
    pub seed: Option<u64>,
    pub cancel: Option<CancellationToken>,
}

impl SendOptions {
    pub fn completion(&self) -> CompletionOptions {
        CompletionOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            cancel: self.cancel.clone(),
        }
    }
}

/// Result of one `send`/`continue` call.
///
/// `conversation_id` and `turn_number` are present on every path, the
/// max-turns soft stop included; on that path `content` and `usage` are
/// absent and `complete` is set.
#[derive(Debug)]
pub struct SendResult<T> {
    pub content: Option<T>,
    pub conversation_id: String,
    pub turn_number: u32,
    pub usage: Option<TokenUsage>,
    pub complete: bool,
}

/// Generic orchestrator over one modality adapter.
///
/// Operations take `&mut self`, so one orchestrator serializes its
/// conversations by construction; concurrency across models lives at the
/// shared client layer.
pub struct Orchestrator<M: ModalityAdapter> {
    manager: ConversationManager<M>,
    client: Option<Arc<M::Client>>,
    session_usage: TokenUsage,
}

impl<M: ModalityAdapter> Orchestrator<M> {
    pub fn new(adapter: M) -> Self {
        Self {
            manager: ConversationManager::new(adapter),
            client: None,
            session_usage: TokenUsage::default(),
        }
    }

    /// Inject or rotate the provider client.
    pub fn set_client(&mut self, client: Arc<M::Client>) {
        self.client = Some(client);
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    pub fn manager(&self) -> &ConversationManager<M> {
        &self.manager
    }

    /// Accumulated usage across all calls on this orchestrator.
    pub fn session_usage(&self) -> &TokenUsage {
        &self.session_usage
    }

    /// Create a fresh conversation and return its id.
    pub fn start(
        &mut self,
        model: &str,
        params: M::Params,
        system_override: Option<&str>,
    ) -> String {
        self.manager.create(model, params, system_override).id.clone()
    }

    /// Run one user→assistant exchange against the provider.
    pub async fn send(
        &mut self,
        id: &str,
        prompt: &str,
        attachments: &[Attachment],
        options: &SendOptions,
    ) -> Result<SendResult<M::Output>, ChatError> {
        let client = self.client.clone().ok_or(ChatError::NoClientConfigured)?;
        if !client.is_configured() {
            return Err(ChatError::NotConfigured);
        }

        let turn_number = self
            .manager
            .get(id)
            .ok_or(ChatError::ConversationNotFound)?
            .turn_number;
        if let Some(max_turns) = self.manager.adapter().max_turns() {
            // Soft stop: no provider call, a normal result
            if turn_number >= max_turns {
                return Ok(SendResult {
                    content: None,
                    conversation_id: id.to_string(),
                    turn_number,
                    usage: None,
                    complete: true,
                });
            }
        }

        self.manager.add_user_message(id, prompt, attachments)?;

        let exchange = {
            let conversation = self
                .manager
                .get(id)
                .ok_or(ChatError::ConversationNotFound)?;
            match self
                .manager
                .adapter()
                .invoke(client.as_ref(), conversation, options)
                .await
            {
                Ok(exchange) => exchange,
                Err(error) => {
                    // Roll back so no dangling user message survives
                    self.manager.pop_dangling_user(id);
                    return Err(error);
                }
            }
        };

        let message = self.manager.adapter().assistant_message(&exchange.output);
        self.manager.add_assistant_message(id, message)?;
        self.manager.apply_after_exchange(id, &exchange.output);

        if let Some(usage) = exchange.usage.as_ref() {
            self.session_usage.add(usage);
        }

        let conversation = self
            .manager
            .get(id)
            .ok_or(ChatError::ConversationNotFound)?;
        let complete = self
            .manager
            .adapter()
            .max_turns()
            .map_or(false, |max_turns| conversation.turn_number >= max_turns);

        Ok(SendResult {
            content: Some(exchange.output),
            conversation_id: conversation.id.clone(),
            turn_number: conversation.turn_number,
            usage: exchange.usage,
            complete,
        })
    }

    /// Continue a conversation, rehydrating it first when the in-memory
    /// state has been lost and the caller supplies the full history.
    pub async fn continue_conversation(
        &mut self,
        id: &str,
        prompt: &str,
        history: Option<&[HistoryEntry]>,
        model: Option<&str>,
        params: Option<M::Params>,
        options: &SendOptions,
    ) -> Result<SendResult<M::Output>, ChatError> {
        if self.manager.get(id).is_none() {
            match (history, model, params) {
                (Some(history), Some(model), Some(params)) if !history.is_empty() => {
                    self.manager.rehydrate(id, model, params, history);
                }
                _ => return Err(ChatError::ConversationNotFound),
            }
        }
        self.send(id, prompt, &[], options).await
    }

    pub fn clear_conversation(&mut self, id: &str) {
        self.manager.clear(id);
    }

    pub fn clear_all(&mut self) {
        self.manager.clear_all();
    }
}
