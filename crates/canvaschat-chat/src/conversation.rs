//! In-memory conversation bookkeeping.
//!
//! The manager is pure state: it never performs I/O and never suspends.
//! Conversations live only in a process-local map; the rehydration contract
//! is the deliberate substitute for durable storage.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use canvaschat_types::{Attachment, HistoryEntry, Message};

use crate::error::ChatError;
use crate::modality::ModalityAdapter;

/// One conversation: an ordered sequence of system/user/assistant turns
/// sharing an id and one set of generation parameters.
#[derive(Debug, Clone)]
pub struct Conversation<P> {
    pub id: String,
    pub messages: Vec<Message>,
    pub model: String,
    pub params: P,
    /// Completed user+assistant exchanges. The system message does not count.
    pub turn_number: u32,
    /// Last seed used for image generation, for reproducible continuation.
    pub last_seed: Option<u64>,
}

fn allocate_id(kind: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", kind, Utc::now().timestamp_millis(), &suffix[..8])
}

/// Owns the conversation-id map for one modality.
pub struct ConversationManager<M: ModalityAdapter> {
    adapter: M,
    conversations: HashMap<String, Conversation<M::Params>>,
}

impl<M: ModalityAdapter> ConversationManager<M> {
    pub fn new(adapter: M) -> Self {
        Self {
            adapter,
            conversations: HashMap::new(),
        }
    }

    pub fn adapter(&self) -> &M {
        &self.adapter
    }

    /// Allocate a new conversation seeded with the modality's system message.
    pub fn create(
        &mut self,
        model: &str,
        params: M::Params,
        system_override: Option<&str>,
    ) -> &Conversation<M::Params> {
        let id = allocate_id(self.adapter.kind());
        let system_prompt = match system_override {
            Some(prompt) => prompt.to_string(),
            None => self.adapter.system_prompt(&params),
        };
        let conversation = Conversation {
            id: id.clone(),
            messages: vec![Message::system(system_prompt)],
            model: model.to_string(),
            params,
            turn_number: 0,
            last_seed: None,
        };
        self.conversations.insert(id.clone(), conversation);
        &self.conversations[&id]
    }

    /// Return the existing conversation when `id` is present and found,
    /// otherwise create a fresh one. A reused id keeps its original
    /// model/params; matching them to the request is the caller's job.
    pub fn get_or_create(
        &mut self,
        id: Option<&str>,
        model: &str,
        params: M::Params,
    ) -> &Conversation<M::Params> {
        match id {
            Some(id) if self.conversations.contains_key(id) => &self.conversations[id],
            _ => self.create(model, params, None),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Conversation<M::Params>> {
        self.conversations.get(id)
    }

    /// Append the user turn. Plain string content without attachments,
    /// otherwise an ordered content-part list with the text part first.
    /// Does not increment `turn_number`.
    pub fn add_user_message(
        &mut self,
        id: &str,
        prompt: &str,
        attachments: &[Attachment],
    ) -> Result<(), ChatError> {
        let content = self.adapter.user_content(prompt, attachments);
        let conversation = self
            .conversations
            .get_mut(id)
            .ok_or(ChatError::ConversationNotFound)?;
        conversation.messages.push(Message::user(content));
        Ok(())
    }

    /// Append the assistant turn, completing the exchange.
    pub fn add_assistant_message(&mut self, id: &str, message: Message) -> Result<(), ChatError> {
        let conversation = self
            .conversations
            .get_mut(id)
            .ok_or(ChatError::ConversationNotFound)?;
        conversation.messages.push(message);
        conversation.turn_number += 1;
        Ok(())
    }

    /// Drop a trailing user message left behind by a failed provider call,
    /// so no dangling user message survives a `send`.
    pub fn pop_dangling_user(&mut self, id: &str) {
        if let Some(conversation) = self.conversations.get_mut(id) {
            if conversation
                .messages
                .last()
                .map_or(false, |message| message.role == "user")
            {
                conversation.messages.pop();
            }
        }
    }

    /// Run the modality's post-exchange hook against the conversation.
    pub fn apply_after_exchange(&mut self, id: &str, output: &M::Output) {
        if let Some(conversation) = self.conversations.get_mut(id) {
            self.adapter.after_exchange(conversation, output);
        }
    }

    /// Rebuild a conversation from an externally supplied turn history.
    ///
    /// Each history entry is replayed through the same builders as the
    /// incremental path, so the resulting message ordering is identical to
    /// what live `add_user_message`/`add_assistant_message` calls would have
    /// produced. An existing conversation under the same id is replaced
    /// wholesale.
    pub fn rehydrate(
        &mut self,
        id: &str,
        model: &str,
        params: M::Params,
        history: &[HistoryEntry],
    ) -> &Conversation<M::Params> {
        let mut messages = vec![Message::system(self.adapter.system_prompt(&params))];
        let mut turn_number = 0;
        for entry in history {
            messages.push(Message::user(
                self.adapter.user_content(&entry.prompt, &entry.attachments),
            ));
            messages.push(self.adapter.replay_assistant(entry));
            turn_number += 1;
        }
        let conversation = Conversation {
            id: id.to_string(),
            messages,
            model: model.to_string(),
            params,
            turn_number,
            last_seed: None,
        };
        self.conversations.insert(id.to_string(), conversation);
        &self.conversations[id]
    }

    /// Remove one conversation. Clearing an unknown id is a no-op.
    pub fn clear(&mut self, id: &str) {
        self.conversations.remove(id);
    }

    pub fn clear_all(&mut self) {
        self.conversations.clear();
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
