//! SQLite-backed conversation store with a cap on retained images.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tokio_rusqlite::Connection;

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::MessageId;
use crate::chat::core::message::{ChatMessage, Sender};
use crate::chat::core::settings::StorageConfig;
use crate::chat::storage::StoreFuture;

/// Ordered conversation storage.
pub trait MessageStore: Send + Sync {
    /// Load the full conversation, ascending by timestamp.
    ///
    /// Callers must treat an error as an empty history and surface a
    /// non-fatal notification; the app stays usable without history.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn load(&self) -> StoreFuture<'_, ChatResult<Vec<ChatMessage>>>;

    /// Replace the entire persisted set with `messages`, after applying the
    /// image cap. The replacement happens inside one transaction, so readers
    /// observe either the prior state or the full new state.
    ///
    /// Returns the retained (post-eviction) messages so the caller's
    /// in-memory view stays consistent with what was persisted.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn save_all(
        &self,
        messages: Vec<ChatMessage>,
    ) -> StoreFuture<'_, ChatResult<Vec<ChatMessage>>>;

    /// Remove all persisted messages.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn clear(&self) -> StoreFuture<'_, ChatResult<()>>;
}

/// Drop the oldest image-bearing messages once more than `max_images` of
/// them exist.
///
/// Evicted messages are removed entirely, caption included. Messages without
/// an image are never evicted, whatever their count, so text-only history
/// survives in full.
#[must_use]
pub fn apply_image_cap(messages: Vec<ChatMessage>, max_images: usize) -> Vec<ChatMessage> {
    let image_count = messages.iter().filter(|m| m.has_image()).count();
    if image_count <= max_images {
        return messages;
    }

    let mut image_bearing: Vec<(DateTime<Utc>, MessageId)> = messages
        .iter()
        .filter(|m| m.has_image())
        .map(|m| (m.timestamp, m.id))
        .collect();
    // Stable sort: equal timestamps keep conversation order
    image_bearing.sort_by_key(|&(ts, _)| ts);

    let evicted: HashSet<MessageId> = image_bearing
        .iter()
        .take(image_count - max_images)
        .map(|&(_, id)| id)
        .collect();

    messages
        .into_iter()
        .filter(|m| !evicted.contains(&m.id))
        .collect()
}

/// `SQLite` implementation of the message store.
pub struct SqliteMessageStore {
    conn: Arc<Connection>,
    table: String,
    max_images: usize,
}

impl SqliteMessageStore {
    /// Initialize the store and create the table if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn new(conn: Arc<Connection>, config: &StorageConfig) -> ChatResult<Self> {
        let table = config.messages_table.clone();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    id TEXT PRIMARY KEY,
                    content TEXT NOT NULL,
                    sender TEXT NOT NULL,
                    ts INTEGER NOT NULL,
                    image_url TEXT,
                    prompt TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_{table_name}_ts
                    ON {table_name} (ts);"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            table,
            max_images: config.max_images,
        })
    }
}

type MessageRow = (MessageId, String, String, i64, Option<String>, Option<String>);

fn row_to_message(row: MessageRow) -> ChatResult<ChatMessage> {
    let (id, content, sender, ts, image_url, prompt) = row;
    let timestamp = Utc
        .timestamp_millis_opt(ts)
        .single()
        .ok_or_else(|| ChatError::InvalidRecord("invalid timestamp".to_string()))?;
    let sender = Sender::from_str(&sender)
        .map_err(|value| ChatError::InvalidRecord(format!("invalid sender: {value}")))?;
    Ok(ChatMessage {
        id,
        content,
        sender,
        timestamp,
        image_url,
        prompt,
    })
}

impl MessageStore for SqliteMessageStore {
    fn load(&self) -> StoreFuture<'_, ChatResult<Vec<ChatMessage>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT id, content, sender, ts, image_url, prompt
                         FROM {table}
                         ORDER BY ts ASC"
                    ))?;
                    let rows = stmt
                        .query_map([], |row| {
                            Ok((
                                row.get::<_, MessageId>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, i64>(3)?,
                                row.get::<_, Option<String>>(4)?,
                                row.get::<_, Option<String>>(5)?,
                            ))
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            rows.into_iter().map(row_to_message).collect()
        })
    }

    fn save_all(
        &self,
        messages: Vec<ChatMessage>,
    ) -> StoreFuture<'_, ChatResult<Vec<ChatMessage>>> {
        Box::pin(async move {
            let retained = apply_image_cap(messages, self.max_images);

            let table = self.table.clone();
            let retained = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    {
                        tx.execute(&format!("DELETE FROM {table}"), [])?;
                        let mut stmt = tx.prepare(&format!(
                            "INSERT INTO {table}
                            (id, content, sender, ts, image_url, prompt)
                            VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
                        ))?;

                        for message in &retained {
                            stmt.execute(rusqlite::params![
                                message.id,
                                message.content,
                                message.sender.as_str(),
                                message.timestamp.timestamp_millis(),
                                message.image_url,
                                message.prompt
                            ])?;
                        }
                    }

                    tx.commit()?;
                    Ok(retained)
                })
                .await?;

            Ok(retained)
        })
    }

    fn clear(&self) -> StoreFuture<'_, ChatResult<()>> {
        Box::pin(async move {
            let table = self.table.clone();
            self.conn
                .call(move |conn| {
                    conn.execute(&format!("DELETE FROM {table}"), [])?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_at(ms: i64, content: &str, image_url: Option<&str>) -> ChatMessage {
        ChatMessage {
            id: MessageId::new(),
            content: content.to_string(),
            sender: if image_url.is_some() {
                Sender::Bot
            } else {
                Sender::User
            },
            timestamp: Utc.timestamp_millis_opt(ms).single().unwrap(),
            image_url: image_url.map(String::from),
            prompt: image_url.map(|_| content.to_string()),
        }
    }

    async fn open_store(max_images: usize) -> SqliteMessageStore {
        let conn = Arc::new(Connection::open_in_memory().await.unwrap());
        let config = StorageConfig {
            max_images,
            ..StorageConfig::default()
        };
        SqliteMessageStore::new(conn, &config).await.unwrap()
    }

    #[test]
    fn test_cap_keeps_everything_under_limit() {
        let messages: Vec<ChatMessage> = (0..5)
            .map(|i| message_at(i, &format!("m{i}"), Some("img")))
            .collect();
        let retained = apply_image_cap(messages.clone(), 5);
        assert_eq!(retained, messages);
    }

    #[test]
    fn test_cap_evicts_oldest_images_entirely() {
        let mut messages = Vec::new();
        for i in 0..8 {
            messages.push(message_at(i, &format!("img{i}"), Some("img")));
        }
        let retained = apply_image_cap(messages, 5);

        assert_eq!(retained.len(), 5);
        let contents: Vec<&str> = retained.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["img3", "img4", "img5", "img6", "img7"]);
    }

    #[test]
    fn test_cap_never_evicts_text_messages() {
        let mut messages = Vec::new();
        for i in 0..6 {
            messages.push(message_at(i * 2, &format!("text{i}"), None));
            messages.push(message_at(i * 2 + 1, &format!("img{i}"), Some("img")));
        }
        let retained = apply_image_cap(messages, 2);

        let text_count = retained.iter().filter(|m| !m.has_image()).count();
        let image_count = retained.iter().filter(|m| m.has_image()).count();
        assert_eq!(text_count, 6);
        assert_eq!(image_count, 2);
        assert_eq!(retained.last().unwrap().content, "img5");
    }

    #[test]
    fn test_cap_ignores_empty_image_urls() {
        let messages = vec![
            message_at(0, "blank", Some("")),
            message_at(1, "real", Some("img")),
        ];
        let retained = apply_image_cap(messages, 1);
        assert_eq!(retained.len(), 2);
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip_in_timestamp_order() {
        let store = open_store(50).await;
        let messages = vec![
            message_at(2_000, "second", None),
            message_at(1_000, "first", None),
            message_at(3_000, "third", Some("img")),
        ];

        store.save_all(messages).await.unwrap();
        let loaded = store.load().await.unwrap();

        let contents: Vec<&str> = loaded.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
        assert_eq!(loaded[2].image_url.as_deref(), Some("img"));
        assert_eq!(loaded[2].prompt.as_deref(), Some("third"));
    }

    #[tokio::test]
    async fn test_save_all_applies_cap_and_returns_retained() {
        let store = open_store(3).await;
        let messages: Vec<ChatMessage> = (0..5)
            .map(|i| message_at(i, &format!("img{i}"), Some("img")))
            .collect();

        let retained = store.save_all(messages).await.unwrap();
        assert_eq!(retained.len(), 3);

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].content, "img2");
    }

    #[tokio::test]
    async fn test_save_all_replaces_previous_contents() {
        let store = open_store(50).await;
        store
            .save_all(vec![message_at(0, "old", None)])
            .await
            .unwrap();
        store
            .save_all(vec![message_at(1, "new", None)])
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].content, "new");
    }

    #[tokio::test]
    async fn test_clear_empties_the_store() {
        let store = open_store(50).await;
        store
            .save_all(vec![message_at(0, "hello", None)])
            .await
            .unwrap();
        store.clear().await.unwrap();

        assert!(store.load().await.unwrap().is_empty());
    }
}
