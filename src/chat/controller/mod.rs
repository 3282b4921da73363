//! Conversation orchestration.
//!
//! The controller owns the in-memory message list and drives the generation
//! flow: append a user message and a pending bot placeholder, call the
//! backend, then mutate the placeholder (matched by id) into its fulfilled or
//! failed state and persist. At most one generation is in flight; competing
//! sends are ignored, never queued.

pub mod notify;

pub use notify::{Notifier, Severity, TracingNotifier};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tokio_rusqlite::Connection;
use tracing::{debug, error, warn};

use crate::chat::core::errors::ChatResult;
use crate::chat::core::favorite::FavoriteItem;
use crate::chat::core::ids::MessageId;
use crate::chat::core::message::ChatMessage;
use crate::chat::core::settings::StorageConfig;
use crate::chat::storage::{
    FavoritesStore, MessageStore, SettingsStore, SqliteFavoritesStore, SqliteMessageStore,
    SqliteSettingsStore,
};
use crate::generation::ImageClient;

/// Whether a generation was user-initiated or a retry of an earlier prompt.
#[derive(Clone, Copy)]
enum GenerationKind {
    Initial,
    Retry,
}

impl GenerationKind {
    const fn status(self) -> &'static str {
        match self {
            Self::Initial => "Generating image...",
            Self::Retry => "Regenerating image...",
        }
    }

    const fn success_caption(self) -> &'static str {
        match self {
            Self::Initial => "Your generated image:",
            Self::Retry => "Your regenerated image:",
        }
    }

    const fn failure_caption(self) -> &'static str {
        match self {
            Self::Initial => {
                "Failed to generate image. Please check your settings and try again."
            }
            Self::Retry => {
                "Failed to regenerate image. Please check your settings and try again."
            }
        }
    }
}

/// Clears the in-flight flag when dropped, whatever path the generation
/// took. The input affordance must never stay disabled.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Store backends for the chat controller.
pub struct ChatBackends {
    /// Conversation storage.
    pub message_store: Arc<dyn MessageStore>,
    /// Favorites storage.
    pub favorites_store: Arc<dyn FavoritesStore>,
    /// Settings storage.
    pub settings_store: Arc<dyn SettingsStore>,
}

impl ChatBackends {
    /// Build `SQLite` backends over a shared connection.
    ///
    /// # Errors
    /// Returns an error if any backend cannot be initialized.
    pub async fn sqlite(conn: Arc<Connection>, config: &StorageConfig) -> ChatResult<Self> {
        let message_store = Arc::new(SqliteMessageStore::new(Arc::clone(&conn), config).await?);
        let favorites_store = Arc::new(SqliteFavoritesStore::new(Arc::clone(&conn), config).await?);
        let settings_store = Arc::new(SqliteSettingsStore::new(conn, config).await?);

        Ok(Self {
            message_store,
            favorites_store,
            settings_store,
        })
    }
}

/// Orchestrates sending prompts, regeneration, favoriting, and persistence.
pub struct ChatController {
    message_store: Arc<dyn MessageStore>,
    favorites_store: Arc<dyn FavoritesStore>,
    settings_store: Arc<dyn SettingsStore>,
    client: ImageClient,
    notifier: Arc<dyn Notifier>,
    messages: RwLock<Vec<ChatMessage>>,
    generating: AtomicBool,
}

impl ChatController {
    /// Create a controller over the given backends.
    #[must_use]
    pub fn new(backends: ChatBackends, client: ImageClient, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            message_store: backends.message_store,
            favorites_store: backends.favorites_store,
            settings_store: backends.settings_store,
            client,
            notifier,
            messages: RwLock::new(Vec::new()),
            generating: AtomicBool::new(false),
        }
    }

    /// Load the persisted conversation into memory.
    ///
    /// A failed load degrades to an empty history with a notification; the
    /// app stays usable and new messages can still be sent.
    pub async fn load_history(&self) {
        match self.message_store.load().await {
            Ok(loaded) => {
                *self.messages.write().await = loaded;
            }
            Err(err) => {
                warn!("failed to load messages: {err}");
                self.notifier.notify(
                    Severity::Error,
                    "Failed to load messages",
                    "Could not load your chat history",
                );
            }
        }
    }

    /// Send a prompt: append the user message and a pending bot message,
    /// then drive the generation to completion.
    ///
    /// Ignored while another generation is in flight.
    pub async fn send_message(&self, content: &str) {
        let Some(_guard) = self.begin_generation() else {
            debug!("generation already in flight, ignoring send");
            return;
        };

        let user = ChatMessage::user(content);
        let pending = ChatMessage::pending_bot(GenerationKind::Initial.status(), content);
        let pending_id = pending.id;
        // Both messages are visible (and persisted) before any network I/O
        self.append_and_persist(vec![user, pending]).await;

        self.run_generation(pending_id, content, GenerationKind::Initial)
            .await;
    }

    /// Generate again from the prompt of an earlier message.
    ///
    /// Ignored while another generation is in flight, and a no-op when the
    /// message is gone or carries no prompt. Appends a fresh pending bot
    /// message; the original message is left untouched.
    pub async fn regenerate(&self, message_id: MessageId) {
        let Some(_guard) = self.begin_generation() else {
            debug!("generation already in flight, ignoring regenerate");
            return;
        };

        let prompt = {
            let messages = self.messages.read().await;
            messages
                .iter()
                .find(|m| m.id == message_id)
                .and_then(|m| m.prompt.clone())
        };
        let Some(prompt) = prompt else {
            debug!("message {message_id} has no prompt, ignoring regenerate");
            return;
        };

        let pending = ChatMessage::pending_bot(GenerationKind::Retry.status(), prompt.clone());
        let pending_id = pending.id;
        self.append_and_persist(vec![pending]).await;

        self.run_generation(pending_id, &prompt, GenerationKind::Retry)
            .await;
    }

    /// Copy a message into the favorites collection.
    ///
    /// Returns `false` (and does nothing) unless the message carries both an
    /// image and its originating prompt. Adding twice is idempotent.
    pub async fn favorite(&self, message_id: MessageId) -> bool {
        let item = {
            let messages = self.messages.read().await;
            messages
                .iter()
                .find(|m| m.id == message_id)
                .and_then(FavoriteItem::from_message)
        };
        match item {
            Some(item) => {
                self.favorites_store.add(item).await;
                true
            }
            None => {
                debug!("message {message_id} is not favoritable");
                false
            }
        }
    }

    /// Remove a favorite by source message id.
    pub async fn unfavorite(&self, id: MessageId) {
        self.favorites_store.remove(id).await;
    }

    /// Whether a favorite exists for this message id.
    pub async fn is_favorited(&self, id: MessageId) -> bool {
        self.favorites_store.contains(id).await
    }

    /// Flip favorite status, driven by a membership test against the
    /// favorites store. Returns the new state.
    pub async fn toggle_favorite(&self, id: MessageId) -> bool {
        if self.favorites_store.contains(id).await {
            self.favorites_store.remove(id).await;
            false
        } else {
            self.favorite(id).await
        }
    }

    /// All favorites, newest first.
    pub async fn favorites(&self) -> Vec<FavoriteItem> {
        self.favorites_store.list().await
    }

    /// Delete all favorites.
    pub async fn clear_favorites(&self) {
        self.favorites_store.clear().await;
    }

    /// Delete the whole conversation, persisted and in-memory. Favorites are
    /// untouched.
    pub async fn clear_chat(&self) {
        match self.message_store.clear().await {
            Ok(()) => {
                self.messages.write().await.clear();
            }
            Err(err) => {
                warn!("failed to clear messages: {err}");
                self.notifier.notify(
                    Severity::Error,
                    "Failed to clear chat",
                    "Could not clear your chat history",
                );
            }
        }
    }

    /// Snapshot of the current conversation, ascending by timestamp.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.messages.read().await.clone()
    }

    /// Whether a generation is currently in flight.
    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }

    fn begin_generation(&self) -> Option<InFlightGuard<'_>> {
        self.generating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then(|| InFlightGuard(&self.generating))
    }

    async fn run_generation(&self, pending_id: MessageId, prompt: &str, kind: GenerationKind) {
        let endpoint = self.settings_store.endpoint().await;
        if endpoint.trim().is_empty() {
            self.notifier.notify(
                Severity::Error,
                "API endpoint not set",
                "Please configure the API endpoint in settings.",
            );
            self.resolve_pending(pending_id, kind.failure_caption(), None)
                .await;
            return;
        }

        let settings = self.settings_store.generation_settings().await;
        if let Err(err) = settings.validate() {
            self.notifier.notify(
                Severity::Error,
                "Invalid generation settings",
                &err.to_string(),
            );
            self.resolve_pending(pending_id, kind.failure_caption(), None)
                .await;
            return;
        }

        match self.client.generate(&endpoint, prompt, &settings).await {
            Ok(image) => {
                self.resolve_pending(pending_id, kind.success_caption(), Some(image.data_url))
                    .await;
            }
            Err(err) => {
                error!("image generation failed: {err}");
                self.notifier
                    .notify(Severity::Error, "Image generation failed", &err.to_string());
                self.resolve_pending(pending_id, kind.failure_caption(), None)
                    .await;
            }
        }
    }

    /// Mutate the pending message in place, same id, then persist.
    async fn resolve_pending(&self, id: MessageId, caption: &str, image_url: Option<String>) {
        {
            let mut messages = self.messages.write().await;
            if let Some(message) = messages.iter_mut().find(|m| m.id == id) {
                match image_url {
                    Some(url) => message.fulfill(caption, url),
                    None => message.fail(caption),
                }
            }
        }
        self.persist().await;
    }

    async fn append_and_persist(&self, new_messages: Vec<ChatMessage>) {
        {
            let mut messages = self.messages.write().await;
            messages.extend(new_messages);
        }
        self.persist().await;
    }

    /// Persist the current list. The store applies the image cap; adopting
    /// the retained set it returns keeps the in-memory view and the
    /// persisted view identical after eviction.
    async fn persist(&self) {
        let snapshot = self.messages.read().await.clone();
        match self.message_store.save_all(snapshot).await {
            Ok(retained) => {
                *self.messages.write().await = retained;
            }
            Err(err) => {
                warn!("failed to save messages: {err}");
            }
        }
    }
}
