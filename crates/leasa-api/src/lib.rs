//! Leasa HTTP API: axum router, handlers and shared state.
//!
//! Exposes the listing store and the conversational engine over JSON.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
