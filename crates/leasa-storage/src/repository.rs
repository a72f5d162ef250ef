//! Repository implementations for SQLite-backed persistence.
//!
//! `ListingRepository` is the listing store; `ChatRepository` persists
//! session transcripts and the last recommendation set per session.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use leasa_core::error::LeasaError;
use leasa_core::types::{Listing, NewListing, Role, Session, SessionSummary, Turn};

use crate::db::Database;

/// Repository for property listings.
pub struct ListingRepository {
    db: Arc<Database>,
}

impl ListingRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Validate and store a new listing, assigning a fresh id and timestamp.
    pub fn append(&self, fields: NewListing) -> Result<Listing, LeasaError> {
        fields.validate()?;
        let listing = fields.into_listing();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO listings (id, address, description, specifications, price, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    listing.id,
                    listing.address,
                    listing.description,
                    listing.specifications,
                    listing.price,
                    format_ts(&listing.created_at),
                ],
            )
            .map_err(|e| LeasaError::Storage(format!("Failed to save listing: {}", e)))?;
            Ok(())
        })?;
        tracing::info!(listing_id = %listing.id, "Listing stored");
        Ok(listing)
    }

    /// All listings in insertion order.
    pub fn list(&self) -> Result<Vec<Listing>, LeasaError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, address, description, specifications, price, created_at
                     FROM listings ORDER BY created_at ASC, rowid ASC",
                )
                .map_err(|e| LeasaError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| Ok(row_to_listing(row)))
                .map_err(|e| LeasaError::Storage(e.to_string()))?;

            let mut listings = Vec::new();
            for row in rows {
                listings.push(row.map_err(|e| LeasaError::Storage(e.to_string()))??);
            }
            Ok(listings)
        })
    }

    /// Find a listing by id.
    pub fn find_by_id(&self, id: &str) -> Result<Option<Listing>, LeasaError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, address, description, specifications, price, created_at
                     FROM listings WHERE id = ?1",
                    rusqlite::params![id],
                    |row| Ok(row_to_listing(row)),
                )
                .optional()
                .map_err(|e| LeasaError::Storage(e.to_string()))?;
            result.transpose()
        })
    }

    pub fn count(&self) -> Result<u64, LeasaError> {
        self.db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get::<_, i64>(0))
                .map(|n| n as u64)
                .map_err(|e| LeasaError::Storage(e.to_string()))
        })
    }
}

/// Repository for chat sessions and their transcripts.
pub struct ChatRepository {
    db: Arc<Database>,
}

impl ChatRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Load a session with its full transcript, or `None` if unknown.
    pub fn load_session(&self, session_id: &str) -> Result<Option<Session>, LeasaError> {
        self.db.with_conn(|conn| {
            let header = conn
                .query_row(
                    "SELECT created_at, updated_at, last_recommendations
                     FROM chat_sessions WHERE session_id = ?1",
                    rusqlite::params![session_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .optional()
                .map_err(|e| LeasaError::Storage(e.to_string()))?;

            let Some((created_at, updated_at, recommendations)) = header else {
                return Ok(None);
            };

            let mut stmt = conn
                .prepare(
                    "SELECT role, content, timestamp FROM chat_turns
                     WHERE session_id = ?1 ORDER BY seq ASC",
                )
                .map_err(|e| LeasaError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params![session_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(|e| LeasaError::Storage(e.to_string()))?;

            let mut transcript = Vec::new();
            for row in rows {
                let (role, content, timestamp) =
                    row.map_err(|e| LeasaError::Storage(e.to_string()))?;
                let role = Role::parse(&role)
                    .ok_or_else(|| LeasaError::Storage(format!("Unknown turn role: {}", role)))?;
                transcript.push(Turn {
                    role,
                    content,
                    timestamp: parse_ts(&timestamp)?,
                });
            }

            Ok(Some(Session {
                session_id: session_id.to_string(),
                transcript,
                last_recommendations: serde_json::from_str(&recommendations)?,
                created_at: parse_ts(&created_at)?,
                updated_at: parse_ts(&updated_at)?,
            }))
        })
    }

    /// Persist a session, replacing any previous row and transcript atomically.
    pub fn save_session(&self, session: &Session) -> Result<(), LeasaError> {
        let recommendations = serde_json::to_string(&session.last_recommendations)?;
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| LeasaError::Storage(format!("Failed to begin transaction: {}", e)))?;

            tx.execute(
                "INSERT INTO chat_sessions (session_id, created_at, updated_at, last_recommendations)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (session_id) DO UPDATE SET
                    updated_at = excluded.updated_at,
                    last_recommendations = excluded.last_recommendations",
                rusqlite::params![
                    session.session_id,
                    format_ts(&session.created_at),
                    format_ts(&session.updated_at),
                    recommendations,
                ],
            )
            .map_err(|e| LeasaError::Storage(format!("Failed to save session: {}", e)))?;

            tx.execute(
                "DELETE FROM chat_turns WHERE session_id = ?1",
                rusqlite::params![session.session_id],
            )
            .map_err(|e| LeasaError::Storage(e.to_string()))?;

            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO chat_turns (session_id, seq, role, content, timestamp)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                    )
                    .map_err(|e| LeasaError::Storage(e.to_string()))?;
                for (seq, turn) in session.transcript.iter().enumerate() {
                    stmt.execute(rusqlite::params![
                        session.session_id,
                        seq as i64,
                        turn.role.as_str(),
                        turn.content,
                        format_ts(&turn.timestamp),
                    ])
                    .map_err(|e| LeasaError::Storage(format!("Failed to save turn: {}", e)))?;
                }
            }

            tx.commit()
                .map_err(|e| LeasaError::Storage(format!("Failed to commit session: {}", e)))?;
            Ok(())
        })
    }

    /// Summaries of all sessions, most recently active first.
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>, LeasaError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT s.session_id, s.created_at, s.updated_at,
                            (SELECT COUNT(*) FROM chat_turns t WHERE t.session_id = s.session_id)
                     FROM chat_sessions s
                     ORDER BY s.updated_at DESC",
                )
                .map_err(|e| LeasaError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })
                .map_err(|e| LeasaError::Storage(e.to_string()))?;

            let mut summaries = Vec::new();
            for row in rows {
                let (session_id, created_at, updated_at, turns) =
                    row.map_err(|e| LeasaError::Storage(e.to_string()))?;
                summaries.push(SessionSummary {
                    session_id,
                    created_at: parse_ts(&created_at)?,
                    updated_at: parse_ts(&updated_at)?,
                    turn_count: turns as usize,
                });
            }
            Ok(summaries)
        })
    }

    /// Delete a session and its turns. Returns whether a row was removed.
    pub fn delete_session(&self, session_id: &str) -> Result<bool, LeasaError> {
        self.db.with_conn(|conn| {
            let removed = conn
                .execute(
                    "DELETE FROM chat_sessions WHERE session_id = ?1",
                    rusqlite::params![session_id],
                )
                .map_err(|e| LeasaError::Storage(e.to_string()))?;
            Ok(removed > 0)
        })
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, LeasaError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LeasaError::Storage(format!("Invalid timestamp '{}': {}", s, e)))
}

fn row_to_listing(row: &rusqlite::Row<'_>) -> Result<Listing, LeasaError> {
    let get_err = |e: rusqlite::Error| LeasaError::Storage(e.to_string());
    let created_at: String = row.get(5).map_err(get_err)?;
    Ok(Listing {
        id: row.get(0).map_err(get_err)?,
        address: row.get(1).map_err(get_err)?,
        description: row.get(2).map_err(get_err)?,
        specifications: row.get(3).map_err(get_err)?,
        price: row.get(4).map_err(get_err)?,
        created_at: parse_ts(&created_at)?,
    })
}

/// Extension trait for rusqlite to support optional query results.
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_db() -> Arc<Database> {
        Arc::new(Database::in_memory().unwrap())
    }

    fn fields(address: &str) -> NewListing {
        NewListing {
            address: address.to_string(),
            description: "1BR".to_string(),
            specifications: "no pets".to_string(),
            price: Some(1200.0),
        }
    }

    // ---- Listings ----

    #[test]
    fn test_append_and_list_listings_in_order() {
        let repo = ListingRepository::new(make_db());
        let a = repo.append(fields("12 Elm St")).unwrap();
        let b = repo.append(fields("7 Oak Ave")).unwrap();

        let all = repo.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, a.id);
        assert_eq!(all[1].id, b.id);
        assert_eq!(all[0].price, Some(1200.0));
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn test_append_rejects_invalid_fields() {
        let repo = ListingRepository::new(make_db());
        let mut bad = fields("12 Elm St");
        bad.address = String::new();
        assert!(matches!(repo.append(bad), Err(LeasaError::Validation(_))));
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn test_find_by_id() {
        let repo = ListingRepository::new(make_db());
        let listing = repo.append(fields("12 Elm St")).unwrap();
        let found = repo.find_by_id(&listing.id).unwrap().unwrap();
        assert_eq!(found, listing);
        assert!(repo.find_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn test_listing_without_price_round_trips() {
        let repo = ListingRepository::new(make_db());
        let mut f = fields("12 Elm St");
        f.price = None;
        let listing = repo.append(f).unwrap();
        assert_eq!(repo.find_by_id(&listing.id).unwrap().unwrap().price, None);
    }

    // ---- Chat sessions ----

    #[test]
    fn test_load_unknown_session_is_none() {
        let repo = ChatRepository::new(make_db());
        assert!(repo.load_session("nope").unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_session() {
        let db = make_db();
        let listing = ListingRepository::new(Arc::clone(&db))
            .append(fields("12 Elm St"))
            .unwrap();
        let repo = ChatRepository::new(db);

        let mut session = Session::new("s1");
        session.push(Turn::tenant("I need a 1BR"));
        session.push(Turn::agent("Try [Property x]"));
        session.last_recommendations = vec![listing.clone()];
        repo.save_session(&session).unwrap();

        let loaded = repo.load_session("s1").unwrap().unwrap();
        assert_eq!(loaded.transcript.len(), 2);
        assert_eq!(loaded.transcript[0].role, Role::Tenant);
        assert_eq!(loaded.transcript[0].content, "I need a 1BR");
        assert_eq!(loaded.transcript[1].role, Role::Agent);
        assert_eq!(loaded.last_recommendations, vec![listing]);
        assert_eq!(loaded.created_at, session.created_at);
    }

    #[test]
    fn test_save_replaces_transcript_and_recommendations() {
        let repo = ChatRepository::new(make_db());
        let mut session = Session::new("s1");
        session.push(Turn::tenant("first"));
        session.last_recommendations = vec![fields("12 Elm St").into_listing()];
        repo.save_session(&session).unwrap();

        session.push(Turn::agent("reply"));
        session.push(Turn::tenant("second"));
        session.last_recommendations.clear();
        repo.save_session(&session).unwrap();

        let loaded = repo.load_session("s1").unwrap().unwrap();
        let contents: Vec<_> = loaded.transcript.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "reply", "second"]);
        assert!(loaded.last_recommendations.is_empty());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let repo = ChatRepository::new(make_db());
        let mut a = Session::new("a");
        a.push(Turn::tenant("from a"));
        let mut b = Session::new("b");
        b.push(Turn::tenant("from b"));
        repo.save_session(&a).unwrap();
        repo.save_session(&b).unwrap();

        let loaded_a = repo.load_session("a").unwrap().unwrap();
        assert_eq!(loaded_a.transcript.len(), 1);
        assert_eq!(loaded_a.transcript[0].content, "from a");
    }

    #[test]
    fn test_list_and_delete_sessions() {
        let repo = ChatRepository::new(make_db());
        let mut a = Session::new("a");
        a.push(Turn::tenant("hi"));
        repo.save_session(&a).unwrap();
        repo.save_session(&Session::new("b")).unwrap();

        let summaries = repo.list_sessions().unwrap();
        assert_eq!(summaries.len(), 2);
        let a_summary = summaries.iter().find(|s| s.session_id == "a").unwrap();
        assert_eq!(a_summary.turn_count, 1);

        assert!(repo.delete_session("a").unwrap());
        assert!(!repo.delete_session("a").unwrap());
        assert!(repo.load_session("a").unwrap().is_none());
        assert_eq!(repo.list_sessions().unwrap().len(), 1);
    }
}
