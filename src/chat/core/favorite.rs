//! Favorited images, persisted independently of the conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::ids::MessageId;
use crate::chat::core::message::ChatMessage;

/// A user-curated copy of a generated image and its originating prompt.
///
/// The `id` is the source message's id at the moment of favoriting, used as
/// the join key for toggle affordances. Everything else is copied, not
/// referenced: evicting or deleting the source message leaves the favorite
/// untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FavoriteItem {
    /// Id of the source message at favorite-time.
    pub id: MessageId,
    /// Copied image reference.
    pub image_url: String,
    /// Copied originating prompt.
    pub prompt: String,
    /// Favorite-time timestamp, used for newest-first ordering.
    pub timestamp: DateTime<Utc>,
}

impl FavoriteItem {
    /// Copy a message into a favorite.
    ///
    /// Returns `None` unless the message carries both an image reference and
    /// the prompt that produced it.
    #[must_use]
    pub fn from_message(message: &ChatMessage) -> Option<Self> {
        if !message.is_favoritable() {
            return None;
        }
        let image_url = message.image_url.clone()?;
        let prompt = message.prompt.clone()?;
        Some(Self {
            id: message.id,
            image_url,
            prompt,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_message_copies_fields() {
        let mut message = ChatMessage::pending_bot("Generating image...", "a red fox in snow");
        message.fulfill("Your generated image:", "img-1");

        let favorite = FavoriteItem::from_message(&message).unwrap();
        assert_eq!(favorite.id, message.id);
        assert_eq!(favorite.image_url, "img-1");
        assert_eq!(favorite.prompt, "a red fox in snow");
    }

    #[test]
    fn test_from_message_rejects_pending_messages() {
        let message = ChatMessage::pending_bot("Generating image...", "a red fox in snow");
        assert!(FavoriteItem::from_message(&message).is_none());
    }
}
