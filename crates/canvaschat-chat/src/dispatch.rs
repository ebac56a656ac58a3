//! Message dispatcher: maps an inbound envelope's declared type to exactly
//! one registered handler.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;

use canvaschat_types::Envelope;

type Handler = Arc<dyn Fn(Envelope) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Type→handler registry for inbound request envelopes.
#[derive(Clone, Default)]
pub struct MessageDispatcher {
    handlers: HashMap<String, Handler>,
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("handler_count", &self.handlers.len())
            .finish()
    }
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for an envelope type. The last registration for a
    /// given type wins.
    pub fn register<F, Fut>(&mut self, kind: impl Into<String>, handler: F)
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |envelope| -> BoxFuture<'static, Result<()>> {
            Box::pin(handler(envelope))
        });
        self.handlers.insert(kind.into(), handler);
    }

    /// Route an envelope to its handler.
    ///
    /// Returns `Ok(true)` when a handler ran, `Ok(false)` when no handler is
    /// registered for the type. Errors raised by the handler itself
    /// propagate to the caller unswallowed.
    pub async fn route(&self, envelope: Envelope) -> Result<bool> {
        let handler = match self.handlers.get(&envelope.kind) {
            Some(handler) => Arc::clone(handler),
            None => return Ok(false),
        };
        handler.as_ref()(envelope).await?;
        Ok(true)
    }

    pub fn unregister(&mut self, kind: &str) {
        self.handlers.remove(kind);
    }

    pub fn has_handler(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn registered_kinds(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn envelope(kind: &str) -> Envelope {
        Envelope {
            kind: kind.to_string(),
            payload: serde_json::Value::Null,
            correlation_id: None,
        }
    }

    #[tokio::test]
    async fn routes_to_the_registered_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = MessageDispatcher::new();
        let handler_hits = Arc::clone(&hits);
        dispatcher.register("sendMessage", move |_envelope| {
            let hits = Arc::clone(&handler_hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        assert!(dispatcher.route(envelope("sendMessage")).await.unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_type_returns_false_without_error() {
        let dispatcher = MessageDispatcher::new();
        assert!(!dispatcher.route(envelope("nope")).await.unwrap());
    }

    #[tokio::test]
    async fn re_registration_replaces_the_prior_handler() {
        let first_hits = Arc::new(AtomicUsize::new(0));
        let second_hits = Arc::new(AtomicUsize::new(0));

        let mut dispatcher = MessageDispatcher::new();
        let hits = Arc::clone(&first_hits);
        dispatcher.register("sendMessage", move |_envelope| {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        let hits = Arc::clone(&second_hits);
        dispatcher.register("sendMessage", move |_envelope| {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        dispatcher.route(envelope("sendMessage")).await.unwrap();
        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_errors_propagate() {
        let mut dispatcher = MessageDispatcher::new();
        dispatcher.register("explode", |_envelope| async {
            anyhow::bail!("handler failed")
        });

        let error = dispatcher.route(envelope("explode")).await.unwrap_err();
        assert_eq!(error.to_string(), "handler failed");
    }

    #[tokio::test]
    async fn unregister_and_queries() {
        let mut dispatcher = MessageDispatcher::new();
        dispatcher.register("a", |_envelope| async { Ok(()) });
        dispatcher.register("b", |_envelope| async { Ok(()) });

        assert!(dispatcher.has_handler("a"));
        let mut kinds = dispatcher.registered_kinds();
        kinds.sort();
        assert_eq!(kinds, vec!["a".to_string(), "b".to_string()]);

        dispatcher.unregister("a");
        assert!(!dispatcher.has_handler("a"));
        assert!(!dispatcher.route(envelope("a")).await.unwrap());
    }
}
