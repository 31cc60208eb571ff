//! Session store
//!
//! Durable per-user conversational state: one `state` entry plus a bag of
//! loose attributes, each with its own sliding TTL refreshed on write. The
//! store is the single source of truth between events; nothing is cached in
//! process.

use crate::engine::ChatState;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Sliding expiry for every session entry.
pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("session store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value session storage contract.
///
/// `get_state` never fails on absence: a missing or expired entry is the
/// initial state. Attribute reads distinguish "unset" (`None`) from failure.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_state(&self, user: &str) -> StoreResult<ChatState>;
    async fn set_state(&self, user: &str, state: ChatState) -> StoreResult<()>;
    async fn delete_state(&self, user: &str) -> StoreResult<()>;

    async fn get_attr(&self, user: &str, key: &str) -> StoreResult<Option<String>>;
    async fn set_attr(&self, user: &str, key: &str, value: &str) -> StoreResult<()>;
    async fn delete_attr(&self, user: &str, key: &str) -> StoreResult<()>;
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn get_state(&self, user: &str) -> StoreResult<ChatState> {
        (**self).get_state(user).await
    }

    async fn set_state(&self, user: &str, state: ChatState) -> StoreResult<()> {
        (**self).set_state(user, state).await
    }

    async fn delete_state(&self, user: &str) -> StoreResult<()> {
        (**self).delete_state(user).await
    }

    async fn get_attr(&self, user: &str, key: &str) -> StoreResult<Option<String>> {
        (**self).get_attr(user, key).await
    }

    async fn set_attr(&self, user: &str, key: &str, value: &str) -> StoreResult<()> {
        (**self).set_attr(user, key, value).await
    }

    async fn delete_attr(&self, user: &str, key: &str) -> StoreResult<()> {
        (**self).delete_attr(user, key).await
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS session_state (
    user_id    TEXT PRIMARY KEY,
    state      TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS session_attr (
    user_id    TEXT NOT NULL,
    key        TEXT NOT NULL,
    value      TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    PRIMARY KEY (user_id, key)
);
";

/// Thread-safe sqlite-backed session store
#[derive(Clone)]
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::from_conn(Connection::open(path)?)
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_conn(Connection::open_in_memory()?)
    }

    fn from_conn(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Drop every expired row. Run at startup; reads also filter on expiry,
    /// so skipping this only costs disk space.
    pub fn purge_expired(&self) -> StoreResult<usize> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let mut purged = conn.execute(
            "DELETE FROM session_state WHERE expires_at <= ?1",
            params![now],
        )?;
        purged += conn.execute(
            "DELETE FROM session_attr WHERE expires_at <= ?1",
            params![now],
        )?;
        Ok(purged)
    }

    fn deadline() -> String {
        (Utc::now() + Duration::hours(SESSION_TTL_HOURS)).to_rfc3339()
    }

    fn live(expires_at: &str) -> bool {
        DateTime::parse_from_rfc3339(expires_at)
            .map(|t| t.with_timezone(&Utc) > Utc::now())
            .unwrap_or(false)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get_state(&self, user: &str) -> StoreResult<ChatState> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT state, expires_at FROM session_state WHERE user_id = ?1",
                params![user],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(match row {
            Some((state, expires_at)) if Self::live(&expires_at) => ChatState::decode(&state),
            _ => ChatState::default(),
        })
    }

    async fn set_state(&self, user: &str, state: ChatState) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO session_state (user_id, state, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET state = ?2, expires_at = ?3",
            params![user, state.encode(), Self::deadline()],
        )?;
        Ok(())
    }

    async fn delete_state(&self, user: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM session_state WHERE user_id = ?1",
            params![user],
        )?;
        Ok(())
    }

    async fn get_attr(&self, user: &str, key: &str) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT value, expires_at FROM session_attr WHERE user_id = ?1 AND key = ?2",
                params![user, key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(match row {
            Some((value, expires_at)) if Self::live(&expires_at) => Some(value),
            _ => None,
        })
    }

    async fn set_attr(&self, user: &str, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO session_attr (user_id, key, value, expires_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, key) DO UPDATE SET value = ?3, expires_at = ?4",
            params![user, key, value, Self::deadline()],
        )?;
        Ok(())
    }

    async fn delete_attr(&self, user: &str, key: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM session_attr WHERE user_id = ?1 AND key = ?2",
            params![user, key],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expire(store: &SqliteSessionStore, user: &str) {
        let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
        let conn = store.conn.lock().unwrap();
        conn.execute(
            "UPDATE session_state SET expires_at = ?1 WHERE user_id = ?2",
            params![past, user],
        )
        .unwrap();
        conn.execute(
            "UPDATE session_attr SET expires_at = ?1 WHERE user_id = ?2",
            params![past, user],
        )
        .unwrap();
    }

    #[tokio::test]
    async fn state_roundtrip_and_default() {
        let store = SqliteSessionStore::open_in_memory().unwrap();

        assert_eq!(store.get_state("u1").await.unwrap(), ChatState::Start);

        store.set_state("u1", ChatState::EnterVerse).await.unwrap();
        assert_eq!(store.get_state("u1").await.unwrap(), ChatState::EnterVerse);

        store.delete_state("u1").await.unwrap();
        assert_eq!(store.get_state("u1").await.unwrap(), ChatState::Start);
    }

    #[tokio::test]
    async fn attrs_are_per_user_and_per_key() {
        let store = SqliteSessionStore::open_in_memory().unwrap();

        store.set_attr("u1", "passage", "12").await.unwrap();
        store.set_attr("u2", "passage", "99").await.unwrap();

        assert_eq!(
            store.get_attr("u1", "passage").await.unwrap().as_deref(),
            Some("12")
        );
        assert_eq!(
            store.get_attr("u2", "passage").await.unwrap().as_deref(),
            Some("99")
        );
        assert_eq!(store.get_attr("u1", "verse").await.unwrap(), None);

        store.set_attr("u1", "passage", "13").await.unwrap();
        assert_eq!(
            store.get_attr("u1", "passage").await.unwrap().as_deref(),
            Some("13")
        );

        store.delete_attr("u1", "passage").await.unwrap();
        assert_eq!(store.get_attr("u1", "passage").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let store = SqliteSessionStore::open_in_memory().unwrap();

        store.set_state("u1", ChatState::AwaitSample).await.unwrap();
        store.set_attr("u1", "passage", "3").await.unwrap();
        expire(&store, "u1");

        // Partial expiry must degrade to "unset", never to an error.
        assert_eq!(store.get_state("u1").await.unwrap(), ChatState::Start);
        assert_eq!(store.get_attr("u1", "passage").await.unwrap(), None);

        assert_eq!(store.purge_expired().unwrap(), 2);
    }

    #[tokio::test]
    async fn unknown_stored_state_decodes_to_initial() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO session_state (user_id, state, expires_at) VALUES ('u1', 'bogus', ?1)",
                params![SqliteSessionStore::deadline()],
            )
            .unwrap();
        }
        assert_eq!(store.get_state("u1").await.unwrap(), ChatState::Start);
    }
}
