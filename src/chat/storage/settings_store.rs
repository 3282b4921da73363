//! SQLite-backed key-value settings store.
//!
//! Holds the configured endpoint, the generation parameters, and the
//! optional alternate backend profile, each under its own key. Reads are
//! fail-soft and fall back to defaults; no validation happens here, the
//! controller validates before a generation is attempted.

use std::sync::Arc;

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;
use tracing::warn;

use crate::chat::core::errors::ChatResult;
use crate::chat::core::settings::{BackendProfile, GenerationSettings, StorageConfig};
use crate::chat::storage::StoreFuture;

/// Key for the primary endpoint URL.
const KEY_API_ENDPOINT: &str = "api_endpoint";
/// Key for the JSON-encoded generation settings.
const KEY_GENERATION_SETTINGS: &str = "generation_settings";
/// Key for the JSON-encoded alternate backend profile.
const KEY_BACKEND_PROFILE: &str = "backend_profile";

/// Persisted configuration record.
pub trait SettingsStore: Send + Sync {
    /// The configured endpoint URL, empty string when unset.
    fn endpoint(&self) -> StoreFuture<'_, String>;

    /// Persist the endpoint URL.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn set_endpoint(&self, endpoint: String) -> StoreFuture<'_, ChatResult<()>>;

    /// The persisted generation settings, defaults when unset or corrupt.
    fn generation_settings(&self) -> StoreFuture<'_, GenerationSettings>;

    /// Persist the generation settings.
    ///
    /// # Errors
    /// Returns an error if storage access or serialization fails.
    fn set_generation_settings(
        &self,
        settings: GenerationSettings,
    ) -> StoreFuture<'_, ChatResult<()>>;

    /// The alternate backend profile, `None` when unset or corrupt.
    fn backend_profile(&self) -> StoreFuture<'_, Option<BackendProfile>>;

    /// Persist the alternate backend profile.
    ///
    /// # Errors
    /// Returns an error if storage access or serialization fails.
    fn set_backend_profile(&self, profile: BackendProfile) -> StoreFuture<'_, ChatResult<()>>;

    /// Remove the alternate backend profile.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn clear_backend_profile(&self) -> StoreFuture<'_, ChatResult<()>>;
}

/// `SQLite` implementation of the settings store.
pub struct SqliteSettingsStore {
    conn: Arc<Connection>,
    table: String,
}

impl SqliteSettingsStore {
    /// Initialize the store and create the table if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn new(conn: Arc<Connection>, config: &StorageConfig) -> ChatResult<Self> {
        let table = config.settings_table.clone();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                )"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }

    async fn get(&self, key: &'static str) -> ChatResult<Option<String>> {
        let table = self.table.clone();
        let value = self
            .conn
            .call(move |conn| {
                let value = conn
                    .query_row(
                        &format!("SELECT value FROM {table} WHERE key = ?1"),
                        [key],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?;
                Ok(value)
            })
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &'static str, value: String) -> ChatResult<()> {
        let table = self.table.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    &format!("INSERT OR REPLACE INTO {table} (key, value) VALUES (?1, ?2)"),
                    rusqlite::params![key, value],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &'static str) -> ChatResult<()> {
        let table = self.table.clone();
        self.conn
            .call(move |conn| {
                conn.execute(&format!("DELETE FROM {table} WHERE key = ?1"), [key])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn endpoint(&self) -> StoreFuture<'_, String> {
        Box::pin(async move {
            match self.get(KEY_API_ENDPOINT).await {
                Ok(value) => value.unwrap_or_default(),
                Err(err) => {
                    warn!("failed to read endpoint: {err}");
                    String::new()
                }
            }
        })
    }

    fn set_endpoint(&self, endpoint: String) -> StoreFuture<'_, ChatResult<()>> {
        Box::pin(async move { self.set(KEY_API_ENDPOINT, endpoint).await })
    }

    fn generation_settings(&self) -> StoreFuture<'_, GenerationSettings> {
        Box::pin(async move {
            let raw = match self.get(KEY_GENERATION_SETTINGS).await {
                Ok(Some(raw)) => raw,
                Ok(None) => return GenerationSettings::default(),
                Err(err) => {
                    warn!("failed to read generation settings: {err}");
                    return GenerationSettings::default();
                }
            };
            serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!("failed to parse generation settings, using defaults: {err}");
                GenerationSettings::default()
            })
        })
    }

    fn set_generation_settings(
        &self,
        settings: GenerationSettings,
    ) -> StoreFuture<'_, ChatResult<()>> {
        Box::pin(async move {
            let raw = serde_json::to_string(&settings)?;
            self.set(KEY_GENERATION_SETTINGS, raw).await
        })
    }

    fn backend_profile(&self) -> StoreFuture<'_, Option<BackendProfile>> {
        Box::pin(async move {
            let raw = match self.get(KEY_BACKEND_PROFILE).await {
                Ok(Some(raw)) => raw,
                Ok(None) => return None,
                Err(err) => {
                    warn!("failed to read backend profile: {err}");
                    return None;
                }
            };
            match serde_json::from_str(&raw) {
                Ok(profile) => Some(profile),
                Err(err) => {
                    warn!("failed to parse backend profile: {err}");
                    None
                }
            }
        })
    }

    fn set_backend_profile(&self, profile: BackendProfile) -> StoreFuture<'_, ChatResult<()>> {
        Box::pin(async move {
            let raw = serde_json::to_string(&profile)?;
            self.set(KEY_BACKEND_PROFILE, raw).await
        })
    }

    fn clear_backend_profile(&self) -> StoreFuture<'_, ChatResult<()>> {
        Box::pin(async move { self.delete(KEY_BACKEND_PROFILE).await })
    }
}
