use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LeasaError, Result};

// =============================================================================
// Listings
// =============================================================================

/// A rental property offered by a landlord.
///
/// Listings are immutable once stored; the catalog as a whole is replaced
/// when a new listing is added.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Stable unique identifier (UUID v4 for stored listings).
    pub id: String,
    /// Full street address. Used by the model to infer location.
    pub address: String,
    /// Free-text description of the unit.
    pub description: String,
    /// Landlord constraints (pets, income, lease length, ...).
    pub specifications: String,
    /// Monthly rent, if the landlord published one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// When the listing was added to the store.
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by a landlord when creating a listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewListing {
    pub address: String,
    pub description: String,
    pub specifications: String,
    #[serde(default)]
    pub price: Option<f64>,
}

impl NewListing {
    /// Check that the required text fields are present and the price is sane.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("address", &self.address),
            ("description", &self.description),
            ("specifications", &self.specifications),
        ] {
            if value.trim().is_empty() {
                return Err(LeasaError::Validation(format!("'{}' must not be empty", name)));
            }
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(LeasaError::Validation(format!(
                    "'price' must be a non-negative number, got {}",
                    price
                )));
            }
        }
        Ok(())
    }

    /// Turn the fields into a stored listing with a fresh id and timestamp.
    pub fn into_listing(self) -> Listing {
        Listing {
            id: Uuid::new_v4().to_string(),
            address: self.address.trim().to_string(),
            description: self.description.trim().to_string(),
            specifications: self.specifications.trim().to_string(),
            price: self.price,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// Who authored a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The person looking for a home. Older transcripts stored this as "user".
    #[serde(alias = "user")]
    Tenant,
    /// The assistant's reply.
    Agent,
}

impl Role {
    /// Storage / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tenant => "tenant",
            Role::Agent => "agent",
        }
    }

    /// Capitalised label used when rendering a transcript into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Tenant => "Tenant",
            Role::Agent => "Agent",
        }
    }

    /// Parse the storage representation (accepts the legacy "user").
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "tenant" | "user" => Some(Role::Tenant),
            "agent" => Some(Role::Agent),
            _ => None,
        }
    }
}

/// One message in a transcript. Append-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn tenant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tenant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered history and current recommendation state for one tenant conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque identifier chosen by the caller or generated on first use.
    pub session_id: String,
    /// Turns in chronological order.
    pub transcript: Vec<Turn>,
    /// Listings endorsed by the most recent successful agent turn.
    pub last_recommendations: Vec<Listing>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session for `session_id`.
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            transcript: Vec::new(),
            last_recommendations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a turn and bump `updated_at`.
    pub fn push(&mut self, turn: Turn) {
        self.updated_at = turn.timestamp;
        self.transcript.push(turn);
    }

    /// Summary view for session listings.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            turn_count: self.transcript.len(),
        }
    }
}

/// Lightweight description of a stored session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub turn_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_listing() -> NewListing {
        NewListing {
            address: " 12 Elm St ".to_string(),
            description: "1BR".to_string(),
            specifications: "no pets".to_string(),
            price: Some(1200.0),
        }
    }

    #[test]
    fn test_new_listing_validates() {
        assert!(new_listing().validate().is_ok());
    }

    #[test]
    fn test_new_listing_rejects_blank_fields() {
        let mut l = new_listing();
        l.specifications = "   ".to_string();
        let err = l.validate().unwrap_err();
        assert!(err.to_string().contains("specifications"));
    }

    #[test]
    fn test_new_listing_rejects_negative_or_nan_price() {
        let mut l = new_listing();
        l.price = Some(-1.0);
        assert!(l.validate().is_err());
        l.price = Some(f64::NAN);
        assert!(l.validate().is_err());
        l.price = None;
        assert!(l.validate().is_ok());
    }

    #[test]
    fn test_into_listing_assigns_id_and_trims() {
        let a = new_listing().into_listing();
        let b = new_listing().into_listing();
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
        assert_eq!(a.address, "12 Elm St");
        assert_eq!(a.price, Some(1200.0));
    }

    #[test]
    fn test_role_serde_accepts_legacy_user() {
        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::Tenant);
        assert_eq!(serde_json::to_string(&Role::Tenant).unwrap(), "\"tenant\"");
        assert_eq!(serde_json::to_string(&Role::Agent).unwrap(), "\"agent\"");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("tenant"), Some(Role::Tenant));
        assert_eq!(Role::parse("user"), Some(Role::Tenant));
        assert_eq!(Role::parse("agent"), Some(Role::Agent));
        assert_eq!(Role::parse("system"), None);
    }

    #[test]
    fn test_listing_price_omitted_when_absent() {
        let mut listing = new_listing().into_listing();
        listing.price = None;
        let json = serde_json::to_value(&listing).unwrap();
        assert!(json.get("price").is_none());
        let back: Listing = serde_json::from_value(json).unwrap();
        assert_eq!(back.price, None);
    }

    #[test]
    fn test_session_push_updates_timestamp() {
        let mut session = Session::new("s1");
        assert!(session.transcript.is_empty());
        let turn = Turn::tenant("hello");
        let ts = turn.timestamp;
        session.push(turn);
        assert_eq!(session.updated_at, ts);
        assert_eq!(session.summary().turn_count, 1);
    }
}
