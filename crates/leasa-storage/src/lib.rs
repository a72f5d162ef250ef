//! Leasa Storage crate - SQLite persistence for listings and chat sessions.
//!
//! Provides a WAL-mode SQLite database with migrations and the two
//! repositories the service needs: the listing store and the chat
//! transcript store.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{ChatRepository, ListingRepository};
