//! Session engine: runs one tenant turn end to end.
//!
//! load session -> assemble prompt -> complete -> extract -> save. The
//! session gate is held for the whole cycle so turns on one session never
//! interleave.

use std::sync::Arc;

use uuid::Uuid;

use leasa_core::config::ChatConfig;
use leasa_core::types::{Listing, Session, SessionSummary, Turn};

use crate::catalog::ListingCatalog;
use crate::completion::{CompletionService, GenerationOptions};
use crate::context::{ContextAssembler, DEFAULT_POLICY};
use crate::error::ChatError;
use crate::extractor::RecommendationExtractor;
use crate::gate::SessionGate;
use crate::session::SessionStore;
use crate::types::{ChatRequest, ChatResponse, TurnStatus};

const APOLOGY: &str =
    "I'm sorry, I encountered an error while processing your request. Please try again later.";

/// Coordinates the catalog, completion service and session store.
pub struct SessionEngine {
    catalog: ListingCatalog,
    completion: Arc<dyn CompletionService>,
    store: Arc<dyn SessionStore>,
    gate: SessionGate,
    assembler: ContextAssembler,
    extractor: RecommendationExtractor,
    options: GenerationOptions,
    config: ChatConfig,
}

impl SessionEngine {
    pub fn new(
        config: ChatConfig,
        options: GenerationOptions,
        catalog: ListingCatalog,
        completion: Arc<dyn CompletionService>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let policy = config
            .policy_text
            .clone()
            .unwrap_or_else(|| DEFAULT_POLICY.to_string());
        let assembler = ContextAssembler::new(policy, config.max_prompt_chars);

        Self {
            catalog,
            completion,
            store,
            gate: SessionGate::new(),
            assembler,
            extractor: RecommendationExtractor::default(),
            options,
            config,
        }
    }

    /// The live catalog used by every turn.
    pub fn catalog(&self) -> &ListingCatalog {
        &self.catalog
    }

    /// Handle one tenant message.
    ///
    /// Only input validation errors are returned as `Err`. Completion and
    /// storage failures produce an apology response whose `properties` are
    /// the recommendations shown before this turn.
    pub async fn handle_turn(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        if !self.config.enabled {
            return Err(ChatError::Disabled);
        }
        let utterance = request.message.trim();
        if utterance.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if utterance.chars().count() > self.config.max_message_chars {
            return Err(ChatError::MessageTooLong(self.config.max_message_chars));
        }

        let session_id = request
            .session_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let _guard = self.gate.acquire(&session_id).await;

        let mut session = match self.store.load(&session_id).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                tracing::info!(session_id = %session_id, "Starting new chat session");
                Session::new(session_id.clone())
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Failed to load session");
                return Ok(failure(session_id, Vec::new(), &e));
            }
        };

        let catalog = self.catalog.snapshot();
        let history_len = session.transcript.len();
        session.push(Turn::tenant(utterance));
        let prompt = self
            .assembler
            .assemble(&catalog, &session.transcript[..history_len], utterance);

        tracing::debug!(
            session_id = %session_id,
            provider = self.completion.name(),
            prompt_chars = prompt.len(),
            catalog_size = catalog.len(),
            "Requesting completion"
        );

        let raw = match self.completion.complete(&prompt, &self.options).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Completion failed");
                // The tenant message is kept even though the agent had no answer.
                if let Err(save_err) = self.store.save(&session).await {
                    tracing::error!(
                        session_id = %session_id,
                        error = %save_err,
                        "Failed to save session after completion failure"
                    );
                }
                let previous = session.last_recommendations;
                return Ok(failure(session_id, previous, &ChatError::Completion(e)));
            }
        };

        let extraction = self.extractor.extract(&raw, &catalog);
        if !extraction.unresolved.is_empty() {
            tracing::debug!(
                session_id = %session_id,
                unresolved = extraction.unresolved.len(),
                "Dropped citations outside the catalog"
            );
        }

        session.push(Turn::agent(extraction.cleaned_text.clone()));
        let previous = std::mem::replace(
            &mut session.last_recommendations,
            extraction.recommendations.clone(),
        );

        if let Err(e) = self.store.save(&session).await {
            tracing::error!(session_id = %session_id, error = %e, "Failed to save session");
            return Ok(failure(session_id, previous, &e));
        }

        tracing::info!(
            session_id = %session_id,
            turns = session.transcript.len(),
            recommendations = extraction.recommendations.len(),
            "Chat turn completed"
        );

        Ok(ChatResponse {
            message: extraction.cleaned_text,
            session_id,
            properties: extraction.recommendations,
            status: TurnStatus::Completed,
        })
    }

    /// Full session state.
    pub async fn session(&self, session_id: &str) -> Result<Session, ChatError> {
        self.store
            .load(session_id)
            .await?
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ChatError> {
        self.store.list().await
    }

    /// Delete a session. Waits for any in-flight turn on it to finish.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ChatError> {
        let _guard = self.gate.acquire(session_id).await;
        if self.store.delete(session_id).await? {
            tracing::info!(session_id = %session_id, "Chat session deleted");
            Ok(())
        } else {
            Err(ChatError::SessionNotFound(session_id.to_string()))
        }
    }
}

fn failure(session_id: String, properties: Vec<Listing>, err: &ChatError) -> ChatResponse {
    let class = err.class();
    let detail = match err {
        ChatError::Completion(inner) => inner.to_string(),
        other => other.to_string(),
    };
    ChatResponse {
        message: format!("{} Error: {}: {}", APOLOGY, class, detail),
        session_id,
        properties,
        status: TurnStatus::Failed { class },
    }
}
