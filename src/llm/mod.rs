//! LLM collaborator boundary
//!
//! The core never talks to a provider directly; it builds an [`LlmRequest`]
//! and hands it to whatever [`LlmClient`] was injected.

pub mod gemini;

pub use gemini::GeminiClient;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::OrchestrationError;
use crate::memory::MessageRole;
use crate::Result;

/// Inline image forwarded untouched to the provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageInput {
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// One completion call
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_message: String,
    /// Prior turns, chronological
    pub history: Vec<ChatMessage>,
    pub max_output_tokens: u32,
    pub image: Option<ImageInput>,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            user_message: user_message.into(),
            history: Vec::new(),
            max_output_tokens: 1024,
            image: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_image(mut self, image: Option<ImageInput>) -> Self {
        self.image = image;
        self
    }
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Generated text for `request`
    async fn complete(&self, request: &LlmRequest) -> Result<String>;
}

// =============================
// Offline client
// =============================

/// Stateless client that answers every call with the same fixed reply.
/// Used when no provider key is configured.
#[derive(Debug, Clone)]
pub struct OfflineLlmClient {
    reply: String,
}

impl OfflineLlmClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OfflineLlmClient {
    async fn complete(&self, _request: &LlmRequest) -> Result<String> {
        Ok(self.reply.clone())
    }
}

// =============================
// Mock client
// =============================

/// Scripted client for tests and demos. Keeps every request it sees.
///
/// Scripted replies are consumed first; `None` entries fail that call.
pub struct MockLlmClient {
    default_reply: String,
    script: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<LlmRequest>>,
    calls: AtomicUsize,
    latency: Option<Duration>,
    always_fail: bool,
}

impl MockLlmClient {
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            default_reply: default_reply.into(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            latency: None,
            always_fail: false,
        }
    }

    /// Client whose every call fails like an unreachable provider
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::new("")
        }
    }

    pub fn with_script<I>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            ..self
        }
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..self
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request seen so far
    pub async fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.always_fail {
            return Err(OrchestrationError::LlmError("mock provider unavailable".to_string()));
        }

        match self.script.lock().await.pop_front() {
            Some(Some(reply)) => Ok(reply),
            Some(None) => Err(OrchestrationError::LlmError("scripted failure".to_string())),
            None => Ok(self.default_reply.clone()),
        }
    }
}
