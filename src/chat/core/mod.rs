//! Core chat types and identifiers.

pub mod errors;
pub mod favorite;
pub mod ids;
pub mod message;
pub mod settings;

pub use errors::{ChatError, ChatResult};
pub use favorite::FavoriteItem;
pub use ids::MessageId;
pub use message::{ChatMessage, Sender};
pub use settings::{BackendProfile, GenerationSettings, StorageConfig};
