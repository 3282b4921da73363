//! Persistent stores for conversation, favorites, and settings.

use std::future::Future;
use std::pin::Pin;

pub mod favorites_store;
pub mod message_store;
pub mod settings_store;

pub use favorites_store::{FavoritesStore, SqliteFavoritesStore};
pub use message_store::{MessageStore, SqliteMessageStore, apply_image_cap};
pub use settings_store::{SettingsStore, SqliteSettingsStore};

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
