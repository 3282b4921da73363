//! SQLite-backed favorites store.
//!
//! Favorites are copies: once created they are independent of the
//! conversation, so eviction or deletion of the source message never touches
//! them. Every operation is fail-soft: a broken or missing underlying store
//! degrades to an empty result or a no-op with a log line, never an error
//! surfaced to the caller.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tokio_rusqlite::Connection;
use tracing::warn;

use crate::chat::core::errors::ChatResult;
use crate::chat::core::favorite::FavoriteItem;
use crate::chat::core::ids::MessageId;
use crate::chat::core::settings::StorageConfig;
use crate::chat::storage::StoreFuture;

/// Persisted set of favorited images.
pub trait FavoritesStore: Send + Sync {
    /// All favorites, newest first. Empty on any storage failure.
    fn list(&self) -> StoreFuture<'_, Vec<FavoriteItem>>;

    /// Insert a favorite. No-op if one with the same id already exists.
    fn add(&self, item: FavoriteItem) -> StoreFuture<'_, ()>;

    /// Delete by id. No-op if absent.
    fn remove(&self, id: MessageId) -> StoreFuture<'_, ()>;

    /// Delete all favorites.
    fn clear(&self) -> StoreFuture<'_, ()>;

    /// Membership test driving favorite/unfavorite toggles. `false` on any
    /// storage failure.
    fn contains(&self, id: MessageId) -> StoreFuture<'_, bool>;
}

/// `SQLite` implementation of the favorites store.
pub struct SqliteFavoritesStore {
    conn: Arc<Connection>,
    table: String,
}

impl SqliteFavoritesStore {
    /// Initialize the store and create the table if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn new(conn: Arc<Connection>, config: &StorageConfig) -> ChatResult<Self> {
        let table = config.favorites_table.clone();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    id TEXT PRIMARY KEY,
                    image_url TEXT NOT NULL,
                    prompt TEXT NOT NULL,
                    ts INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{table_name}_ts
                    ON {table_name} (ts DESC);"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }

    async fn try_list(&self) -> ChatResult<Vec<FavoriteItem>> {
        let table = self.table.clone();
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT id, image_url, prompt, ts
                     FROM {table}
                     ORDER BY ts DESC"
                ))?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, i64>(3)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(rows)
            })
            .await?;

        // A single corrupt row must not poison the whole collection
        let mut favorites = Vec::with_capacity(rows.len());
        for (id, image_url, prompt, ts) in rows {
            let Ok(id) = MessageId::from_str(&id) else {
                warn!("skipping favorite with invalid id: {id}");
                continue;
            };
            let Some(timestamp) = Utc.timestamp_millis_opt(ts).single() else {
                warn!("skipping favorite with invalid timestamp: {ts}");
                continue;
            };
            favorites.push(FavoriteItem {
                id,
                image_url,
                prompt,
                timestamp,
            });
        }
        Ok(favorites)
    }

    async fn try_add(&self, item: FavoriteItem) -> ChatResult<()> {
        let table = self.table.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT OR IGNORE INTO {table} (id, image_url, prompt, ts)
                         VALUES (?1, ?2, ?3, ?4)"
                    ),
                    rusqlite::params![
                        item.id,
                        item.image_url,
                        item.prompt,
                        item.timestamp.timestamp_millis()
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn try_remove(&self, id: MessageId) -> ChatResult<()> {
        let table = self.table.clone();
        self.conn
            .call(move |conn| {
                conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn try_clear(&self) -> ChatResult<()> {
        let table = self.table.clone();
        self.conn
            .call(move |conn| {
                conn.execute(&format!("DELETE FROM {table}"), [])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn try_contains(&self, id: MessageId) -> ChatResult<bool> {
        let table = self.table.clone();
        let count = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM {table} WHERE id = ?1"),
                    [id],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count > 0)
    }
}

impl FavoritesStore for SqliteFavoritesStore {
    fn list(&self) -> StoreFuture<'_, Vec<FavoriteItem>> {
        Box::pin(async move {
            match self.try_list().await {
                Ok(favorites) => favorites,
                Err(err) => {
                    warn!("failed to list favorites: {err}");
                    Vec::new()
                }
            }
        })
    }

    fn add(&self, item: FavoriteItem) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if let Err(err) = self.try_add(item).await {
                warn!("failed to save favorite: {err}");
            }
        })
    }

    fn remove(&self, id: MessageId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if let Err(err) = self.try_remove(id).await {
                warn!("failed to remove favorite: {err}");
            }
        })
    }

    fn clear(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if let Err(err) = self.try_clear().await {
                warn!("failed to clear favorites: {err}");
            }
        })
    }

    fn contains(&self, id: MessageId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            match self.try_contains(id).await {
                Ok(found) => found,
                Err(err) => {
                    warn!("failed to check favorite: {err}");
                    false
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store() -> SqliteFavoritesStore {
        let conn = Arc::new(Connection::open_in_memory().await.unwrap());
        SqliteFavoritesStore::new(conn, &StorageConfig::default())
            .await
            .unwrap()
    }

    fn favorite_at(ms: i64, prompt: &str) -> FavoriteItem {
        FavoriteItem {
            id: MessageId::new(),
            image_url: "img".to_string(),
            prompt: prompt.to_string(),
            timestamp: Utc.timestamp_millis_opt(ms).single().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_add_is_idempotent_per_id() {
        let store = open_store().await;
        let item = favorite_at(1_000, "a red fox in snow");

        store.add(item.clone()).await;
        store.add(item.clone()).await;

        let favorites = store.list().await;
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].prompt, "a red fox in snow");
        assert!(store.contains(item.id).await);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = open_store().await;
        store.add(favorite_at(1_000, "oldest")).await;
        store.add(favorite_at(3_000, "newest")).await;
        store.add(favorite_at(2_000, "middle")).await;

        let prompts: Vec<String> = store.list().await.into_iter().map(|f| f.prompt).collect();
        assert_eq!(prompts, ["newest", "middle", "oldest"]);
    }

    #[tokio::test]
    async fn test_remove_missing_id_is_a_noop() {
        let store = open_store().await;
        store.add(favorite_at(1_000, "kept")).await;

        store.remove(MessageId::new()).await;

        assert_eq!(store.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let store = open_store().await;
        store.add(favorite_at(1_000, "one")).await;
        store.add(favorite_at(2_000, "two")).await;

        store.clear().await;

        assert!(store.list().await.is_empty());
        assert!(!store.contains(MessageId::new()).await);
    }

    #[tokio::test]
    async fn test_corrupt_row_is_skipped_not_fatal() {
        let conn = Arc::new(Connection::open_in_memory().await.unwrap());
        let store = SqliteFavoritesStore::new(Arc::clone(&conn), &StorageConfig::default())
            .await
            .unwrap();
        store.add(favorite_at(1_000, "valid")).await;

        conn.call(|conn| {
            conn.execute(
                "INSERT INTO favorites (id, image_url, prompt, ts)
                 VALUES ('not-a-uuid', 'img', 'broken', 2000)",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let favorites = store.list().await;
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].prompt, "valid");
    }
}
