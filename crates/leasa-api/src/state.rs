//! Application state shared across all route handlers.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use leasa_chat::{
    CompletionService, GenerationOptions, ListingCatalog, SessionEngine, SqliteSessionStore,
};
use leasa_core::config::LeasaConfig;
use leasa_core::error::LeasaError;
use leasa_core::types::{Listing, NewListing};
use leasa_storage::{ChatRepository, Database, ListingRepository};

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    pub listings: Arc<ListingRepository>,
    /// Conversational engine; owns the live listing catalog.
    pub engine: Arc<SessionEngine>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
    /// Held across store write, reload and catalog swap so concurrent
    /// writers publish catalogs in commit order.
    catalog_writes: Arc<Mutex<()>>,
}

impl AppState {
    /// Wire the engine to `database` and load the catalog from the listing store.
    pub fn new(
        config: LeasaConfig,
        database: Arc<Database>,
        completion: Arc<dyn CompletionService>,
    ) -> Result<Self, LeasaError> {
        let listings = Arc::new(ListingRepository::new(Arc::clone(&database)));
        let catalog = ListingCatalog::new(listings.list()?);
        tracing::info!(listings = catalog.len(), "Listing catalog loaded");

        let store = SqliteSessionStore::new(Arc::new(ChatRepository::new(database)));
        let engine = SessionEngine::new(
            config.chat.clone(),
            GenerationOptions::from(&config.llm),
            catalog,
            completion,
            Arc::new(store),
        );

        Ok(Self {
            listings,
            engine: Arc::new(engine),
            start_time: Instant::now(),
            catalog_writes: Arc::new(Mutex::new(())),
        })
    }

    /// Store a new listing and publish the updated catalog.
    ///
    /// Returns the stored listing and the catalog size after the swap.
    pub fn add_listing(&self, new: NewListing) -> Result<(Listing, usize), LeasaError> {
        let _guard = self
            .catalog_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let listing = self.listings.append(new)?;
        let count = self.reload_catalog()?;
        Ok((listing, count))
    }

    /// Reload the catalog from the listing store.
    pub fn refresh_catalog(&self) -> Result<usize, LeasaError> {
        let _guard = self
            .catalog_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.reload_catalog()
    }

    fn reload_catalog(&self) -> Result<usize, LeasaError> {
        let listings = self.listings.list()?;
        let count = listings.len();
        self.engine.catalog().replace(listings);
        Ok(count)
    }
}
