//! Persisted store blobs, one per user key.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::util::unix_timestamp_millis;

use super::Database;

/// Key under which a user's store blob lives.
pub fn state_key(user: &str) -> String {
    format!("closet-store:{user}")
}

/// Trait for store blob storage operations (async)
#[allow(async_fn_in_trait)]
pub trait StateRepository {
    /// Load the blob saved under `key`, if any
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Save (or replace) the blob under `key`
    async fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// libSQL implementation of `StateRepository`
pub struct LibSqlStateRepository {
    db: Database,
}

impl LibSqlStateRepository {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }
}

impl StateRepository for LibSqlStateRepository {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .db
            .connection()
            .query("SELECT value FROM kv_store WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .connection()
            .execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                libsql::params![key, value, unix_timestamp_millis()],
            )
            .await?;
        Ok(())
    }
}

/// In-process implementation of `StateRepository`, for tests and ephemeral
/// sessions.
#[derive(Debug, Default)]
pub struct MemoryStateRepository {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Database("state repository lock poisoned".to_string()))
    }
}

impl StateRepository for MemoryStateRepository {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn exercise(repo: &impl StateRepository) {
        let key = state_key("user-1");
        assert_eq!(repo.load(&key).await.unwrap(), None);

        repo.save(&key, r#"{"bookmarks":[]}"#).await.unwrap();
        repo.save(&key, r#"{"bookmarks":[1]}"#).await.unwrap();
        assert_eq!(
            repo.load(&key).await.unwrap().as_deref(),
            Some(r#"{"bookmarks":[1]}"#)
        );
        assert_eq!(repo.load(&state_key("user-2")).await.unwrap(), None);
    }

    #[test]
    fn state_key_is_user_scoped() {
        assert_eq!(state_key("abc"), "closet-store:abc");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_libsql_repository() {
        let db = Database::open_in_memory().await.unwrap();
        exercise(&LibSqlStateRepository::new(db)).await;
    }

    #[tokio::test]
    async fn test_memory_repository() {
        exercise(&MemoryStateRepository::new()).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blob_survives_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("state.db");

        let repo = LibSqlStateRepository::new(Database::open(&path).await.unwrap());
        repo.save(&state_key("local"), "{}").await.unwrap();
        drop(repo);

        let repo = LibSqlStateRepository::new(Database::open(&path).await.unwrap());
        assert_eq!(
            repo.load(&state_key("local")).await.unwrap().as_deref(),
            Some("{}")
        );
    }
}
