//! Empty-reply retry.
//!
//! Some endpoints occasionally answer `200 OK` with no text. The wrapper
//! re-sends the same request up to `max_retries` extra times; transport
//! errors are never retried and propagate immediately. When every attempt
//! comes back empty the last (empty) response is returned and the failure
//! is logged.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};
use vnchat_core::error::ProviderError;
use vnchat_core::provider::{ChatRequest, ChatResponse};

/// A provider that retries on empty content.
pub struct RetryOnEmpty {
    inner: Arc<dyn vnchat_core::Provider>,
    max_retries: u32,
}

impl RetryOnEmpty {
    pub fn new(inner: Arc<dyn vnchat_core::Provider>, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }

    /// Total number of attempts made before giving up.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

#[async_trait]
impl vnchat_core::Provider for RetryOnEmpty {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let attempts = self.max_attempts();
        let mut last = ChatResponse::default();

        for attempt in 1..=attempts {
            debug!(provider = %self.inner.name(), attempt, attempts, "Requesting completion");
            let response = self.inner.complete(request.clone()).await?;
            if !response.is_empty() {
                return Ok(response);
            }
            warn!(
                provider = %self.inner.name(),
                attempt,
                attempts,
                "Empty response from model, retrying"
            );
            last = response;
        }

        error!(
            provider = %self.inner.name(),
            attempts,
            "Model returned no content after all attempts"
        );
        Ok(last)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use vnchat_core::Provider;
    use vnchat_core::message::PromptMessage;

    /// Replays a fixed sequence of results, then keeps answering empty.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
        call_count: Mutex<usize>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<ChatResponse, ProviderError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl vnchat_core::Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ChatResponse::default()))
        }
    }

    fn text(content: &str) -> Result<ChatResponse, ProviderError> {
        Ok(ChatResponse {
            content: content.into(),
            model: "m".into(),
            usage: None,
        })
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "m".into(),
            messages: vec![PromptMessage::user("hello")],
            temperature: 0.7,
            max_tokens: None,
        }
    }

    #[tokio::test]
    async fn first_non_empty_reply_wins() {
        let inner = Arc::new(ScriptedProvider::new(vec![text("Hi there")]));
        let retry = RetryOnEmpty::new(inner.clone(), 3);

        let response = retry.complete(request()).await.unwrap();
        assert_eq!(response.content, "Hi there");
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn empty_replies_are_retried() {
        let inner = Arc::new(ScriptedProvider::new(vec![text(""), text(""), text("finally")]));
        let retry = RetryOnEmpty::new(inner.clone(), 2);

        let response = retry.complete(request()).await.unwrap();
        assert_eq!(response.content, "finally");
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_limit_plus_one_attempts() {
        let inner = Arc::new(ScriptedProvider::new(vec![]));
        let retry = RetryOnEmpty::new(inner.clone(), 1);

        let response = retry.complete(request()).await.unwrap();
        assert!(response.is_empty());
        assert_eq!(inner.calls(), 2);

        let inner = Arc::new(ScriptedProvider::new(vec![]));
        let retry = RetryOnEmpty::new(inner.clone(), 0);
        retry.complete(request()).await.unwrap();
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn transport_errors_propagate_without_retry() {
        let inner = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::Network("connection refused".into())),
            text("unreached"),
        ]));
        let retry = RetryOnEmpty::new(inner.clone(), 5);

        let result = retry.complete(request()).await;
        assert!(matches!(result, Err(ProviderError::Network(_))));
        assert_eq!(inner.calls(), 1);
    }

    #[test]
    fn attempts_saturate() {
        let inner = Arc::new(ScriptedProvider::new(vec![]));
        assert_eq!(RetryOnEmpty::new(inner.clone(), 4).max_attempts(), 5);
        assert_eq!(RetryOnEmpty::new(inner, u32::MAX).max_attempts(), u32::MAX);
    }
}
