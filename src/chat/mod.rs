//! Chat subsystem: conversation model, persistent stores, and orchestration.
//!
//! Organized into:
//! - `core`: Ids, errors, messages, favorites, and settings types
//! - `storage`: `SQLite` stores for conversation, favorites, and settings
//! - `controller`: The send/regenerate/favorite state machine

pub mod controller;
pub mod core;
pub mod storage;

// Re-export commonly used types for convenience
pub use controller::{ChatBackends, ChatController, Notifier, Severity, TracingNotifier};
pub use self::core::{
    BackendProfile, ChatError, ChatMessage, ChatResult, FavoriteItem, GenerationSettings,
    MessageId, Sender, StorageConfig,
};
pub use storage::{
    FavoritesStore, MessageStore, SettingsStore, SqliteFavoritesStore, SqliteMessageStore,
    SqliteSettingsStore, StoreFuture, apply_image_cap,
};
