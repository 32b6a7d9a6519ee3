//! Shared builders and mocks for director tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use uuid::Uuid;
use vnchat_core::error::ProviderError;
use vnchat_core::message::Role;
use vnchat_core::provider::{ChatRequest, ChatResponse, Provider};

use crate::catalog::{LoreEntry, LorePosition};

/// An enabled, non-constant anchored entry with the given keys.
pub fn lore(id: i64, keys: &[&str], content: &str) -> LoreEntry {
    LoreEntry {
        uuid: Uuid::new_v4(),
        id,
        content: content.into(),
        keys: keys.iter().map(|k| k.to_string()).collect(),
        constant: false,
        enabled: true,
        depth: 4,
        order: 10,
        position: LorePosition::Anchored,
        exclude_recursion: false,
        prevent_recursion: false,
        role: Role::System,
        source: "test".into(),
    }
}

/// A mock provider that returns scripted replies in order.
///
/// Once the script runs out every call answers with empty content.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<&str>) -> Self {
        Self::with_results(replies.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn with_results(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let content = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))?;
        Ok(ChatResponse {
            content,
            model,
            usage: None,
        })
    }
}
