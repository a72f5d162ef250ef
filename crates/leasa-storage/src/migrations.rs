//! Database schema migrations.
//!
//! Applies the initial schema: listings, chat sessions and chat turns.

use rusqlite::Connection;
use tracing::info;

use leasa_core::error::LeasaError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), LeasaError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| LeasaError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| LeasaError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), LeasaError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS listings (
            id              TEXT PRIMARY KEY NOT NULL,
            address         TEXT NOT NULL,
            description     TEXT NOT NULL,
            specifications  TEXT NOT NULL,
            price           REAL,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chat_sessions (
            session_id            TEXT PRIMARY KEY NOT NULL,
            created_at            TEXT NOT NULL,
            updated_at            TEXT NOT NULL,
            last_recommendations  TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS chat_turns (
            session_id  TEXT NOT NULL
                        REFERENCES chat_sessions (session_id) ON DELETE CASCADE,
            seq         INTEGER NOT NULL,
            role        TEXT NOT NULL CHECK (role IN ('tenant', 'agent')),
            content     TEXT NOT NULL,
            timestamp   TEXT NOT NULL,
            PRIMARY KEY (session_id, seq)
        );

        CREATE INDEX IF NOT EXISTS idx_chat_sessions_updated
            ON chat_sessions (updated_at DESC);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| LeasaError::Storage(format!("Failed to apply migration v1: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_turn_role_is_constrained() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO chat_sessions (session_id, created_at, updated_at) VALUES ('s', 'x', 'x')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO chat_turns (session_id, seq, role, content, timestamp)
             VALUES ('s', 0, 'system', 'hi', 'x')",
            [],
        );
        assert!(result.is_err());
    }
}
