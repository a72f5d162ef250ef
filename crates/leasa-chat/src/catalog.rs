//! Shared, read-mostly view of the listings available for matching.

use std::sync::{Arc, RwLock};

use leasa_core::types::Listing;

/// The live listing catalog.
///
/// Readers take an `Arc` snapshot and keep using it for the whole turn, so
/// a concurrent [`replace`](ListingCatalog::replace) is never observed
/// half-applied.
#[derive(Clone)]
pub struct ListingCatalog {
    inner: Arc<RwLock<Arc<[Listing]>>>,
}

impl ListingCatalog {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(listings.into())),
        }
    }

    /// Current catalog contents.
    pub fn snapshot(&self) -> Arc<[Listing]> {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Swap in a new catalog wholesale.
    pub fn replace(&self, listings: Vec<Listing>) {
        let next: Arc<[Listing]> = listings.into();
        let count = next.len();
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = next;
        tracing::debug!(listings = count, "Listing catalog replaced");
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ListingCatalog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn listing(id: &str) -> Listing {
        Listing {
            id: id.to_string(),
            address: format!("{} Main St", id),
            description: "studio".to_string(),
            specifications: "none".to_string(),
            price: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_catalog_is_empty() {
        let catalog = ListingCatalog::default();
        assert!(catalog.is_empty());
        assert!(catalog.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let catalog = ListingCatalog::new(vec![listing("p1"), listing("p2")]);
        let before = catalog.snapshot();

        catalog.replace(vec![listing("p3")]);

        assert_eq!(before.len(), 2);
        assert_eq!(before[0].id, "p1");
        let after = catalog.snapshot();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, "p3");
    }

    #[test]
    fn test_clones_share_state() {
        let catalog = ListingCatalog::default();
        let handle = catalog.clone();
        handle.replace(vec![listing("p1")]);
        assert_eq!(catalog.len(), 1);
    }
}
