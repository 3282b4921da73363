//! Application bootstrap.
//!
//! Explicit construction, no hidden globals: the embedding application calls
//! [`ChatApp::initialize`] once and holds the returned handle. Tests build
//! their own stores over in-memory connections instead.

use std::sync::Arc;

use tokio_rusqlite::Connection;

use crate::chat::controller::{ChatBackends, ChatController, Notifier, TracingNotifier};
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::settings::StorageConfig;
use crate::chat::storage::SettingsStore;
use crate::generation::ImageClient;

/// Install a `tracing` subscriber reading `RUST_LOG`, defaulting to INFO.
///
/// Call once from the embedding application, before any other API.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
}

/// Ready-to-use application handle: stores, client, and controller wired
/// over one `SQLite` database.
pub struct ChatApp {
    controller: Arc<ChatController>,
    settings_store: Arc<dyn SettingsStore>,
}

impl ChatApp {
    /// Open the database, build the stores and controller, and load the
    /// persisted conversation.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or a store cannot
    /// be initialized.
    pub async fn initialize(config: StorageConfig) -> ChatResult<Self> {
        Self::initialize_with(config, Arc::new(TracingNotifier)).await
    }

    /// Like [`ChatApp::initialize`], with a custom notification sink.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or a store cannot
    /// be initialized.
    pub async fn initialize_with(
        config: StorageConfig,
        notifier: Arc<dyn Notifier>,
    ) -> ChatResult<Self> {
        let conn = Arc::new(Connection::open(&config.sqlite_path).await?);
        let backends = ChatBackends::sqlite(conn, &config).await?;
        let settings_store = Arc::clone(&backends.settings_store);
        let client =
            ImageClient::new().map_err(|err| ChatError::InvalidConfig(err.to_string()))?;

        let controller = Arc::new(ChatController::new(backends, client, notifier));
        controller.load_history().await;

        Ok(Self {
            controller,
            settings_store,
        })
    }

    /// The conversation controller.
    #[must_use]
    pub fn controller(&self) -> &Arc<ChatController> {
        &self.controller
    }

    /// The settings store, for the settings UI.
    #[must_use]
    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.settings_store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_in_memory_starts_empty() {
        let app = ChatApp::initialize(StorageConfig::in_memory()).await.unwrap();

        assert!(app.controller().messages().await.is_empty());
        assert!(!app.controller().is_generating());
        assert!(app.controller().favorites().await.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_persists_across_handles() {
        let path = std::env::temp_dir().join(format!(
            "chatgenie-app-test-{}.sqlite",
            uuid::Uuid::new_v4()
        ));
        let config = StorageConfig {
            sqlite_path: path.clone(),
            ..StorageConfig::default()
        };

        {
            let app = ChatApp::initialize(config.clone()).await.unwrap();
            app.settings()
                .set_endpoint("http://localhost:7860".to_string())
                .await
                .unwrap();
            assert!(app.controller().messages().await.is_empty());
        }

        let app = ChatApp::initialize(config).await.unwrap();
        assert_eq!(app.settings().endpoint().await, "http://localhost:7860");

        let _ = std::fs::remove_file(path);
    }
}
