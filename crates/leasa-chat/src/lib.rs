//! Conversational recommendation engine for Leasa.
//!
//! Turns a tenant utterance into a prompt over the live listing catalog,
//! calls a text-completion service, extracts cited listings from the reply
//! and keeps each session's transcript and recommendation set consistent.

pub mod catalog;
pub mod completion;
pub mod context;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod gemini;
pub mod orchestrator;
pub mod parser;
pub mod session;
pub mod types;

pub use catalog::ListingCatalog;
pub use completion::{CompletionService, GenerationOptions, MockCompletion};
pub use context::{ContextAssembler, DEFAULT_POLICY};
pub use error::{ChatError, CompletionError};
pub use extractor::{Extraction, RecommendationExtractor};
pub use gate::{SessionGate, SessionGuard};
pub use gemini::GeminiClient;
pub use orchestrator::SessionEngine;
pub use parser::{BracketCitationParser, CitationParser, Segment};
pub use session::{InMemorySessionStore, SessionStore, SqliteSessionStore};
pub use types::{ChatRequest, ChatResponse, TurnStatus};
