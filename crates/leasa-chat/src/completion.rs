//! Text-completion capability.
//!
//! The engine only needs "prompt in, text out". [`GeminiClient`](crate::gemini::GeminiClient)
//! talks to the hosted model; [`MockCompletion`] serves tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use leasa_core::config::LlmConfig;

use crate::error::CompletionError;

/// Sampling parameters forwarded to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
    /// Provider tool declarations, passed through untouched.
    pub tools: Option<Vec<serde_json::Value>>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 2048,
            top_p: 0.95,
            top_k: 40,
            tools: None,
        }
    }
}

impl From<&LlmConfig> for GenerationOptions {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            top_p: config.top_p,
            top_k: config.top_k,
            tools: None,
        }
    }
}

/// A service that turns a prompt into response text.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, CompletionError>;
}

/// Scripted completion service.
///
/// Replies are popped from a queue in order. Once the queue is empty the
/// fallback reply is used, or `EmptyResponse` if there is none.
///
/// A mock from [`new`](MockCompletion::new) records every prompt for
/// inspection. One from [`with_fallback`](MockCompletion::with_fallback)
/// only counts calls, so it can serve a long-running offline process.
#[derive(Default)]
pub struct MockCompletion {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    fallback: Option<String>,
    record_prompts: bool,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockCompletion {
    /// Scripted mock that records prompts.
    pub fn new() -> Self {
        Self {
            record_prompts: true,
            ..Self::default()
        }
    }

    /// Mock that answers with `reply` once the script runs out. Prompts are
    /// not kept.
    pub fn with_fallback(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::default()
        }
    }

    /// Queue a successful reply.
    pub fn push_reply(&self, reply: impl Into<String>) -> &Self {
        self.lock_replies().push_back(Ok(reply.into()));
        self
    }

    /// Queue a failure.
    pub fn push_failure(&self, err: CompletionError) -> &Self {
        self.lock_replies().push_back(Err(err));
        self
    }

    /// Prompts received so far, oldest first. Empty unless recording.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, CompletionError>>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.record_prompts {
            self.prompts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(prompt.to_string());
        }

        match self.lock_replies().pop_front() {
            Some(reply) => reply,
            None => self.fallback.clone().ok_or(CompletionError::EmptyResponse),
        }
    }
}
