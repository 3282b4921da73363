//! Chat message model and lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::chat::core::ids::MessageId;

/// Author of a chat message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// Message typed by the user.
    User,
    /// Message produced by the generation flow.
    Bot,
}

impl Sender {
    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "bot" => Ok(Self::Bot),
            _ => Err(value.to_string()),
        }
    }
}

/// A single message in the conversation.
///
/// Bot messages start out pending (status text, no image) and are later
/// mutated in place into a fulfilled or failed state. The `id` and
/// `timestamp` are assigned at creation and never change, so a message keeps
/// its position in timestamp order across the transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique identifier, stable for the message's lifetime.
    pub id: MessageId,
    /// Display text: prompt echo, status text, or result caption.
    pub content: String,
    /// Who authored the message.
    pub sender: Sender,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Reference to generated image data, present only on fulfilled bot
    /// messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// The prompt that produced this message's image. Required for
    /// regeneration and favoriting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl ChatMessage {
    /// Build a user message echoing the typed prompt.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            content: content.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            image_url: None,
            prompt: None,
        }
    }

    /// Build a pending bot message carrying status text and the prompt it
    /// will be generated from.
    #[must_use]
    pub fn pending_bot(status: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            content: status.into(),
            sender: Sender::Bot,
            timestamp: Utc::now(),
            image_url: None,
            prompt: Some(prompt.into()),
        }
    }

    /// Transition a pending bot message into its fulfilled state.
    pub fn fulfill(&mut self, caption: impl Into<String>, image_url: impl Into<String>) {
        self.content = caption.into();
        self.image_url = Some(image_url.into());
    }

    /// Transition a pending bot message into its failed state. The image
    /// reference stays unset.
    pub fn fail(&mut self, caption: impl Into<String>) {
        self.content = caption.into();
        self.image_url = None;
    }

    /// Whether this message carries a non-empty image reference.
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image_url.as_deref().is_some_and(|url| !url.is_empty())
    }

    /// Whether this message can be copied into the favorites collection:
    /// both an image reference and the originating prompt must be present.
    #[must_use]
    pub fn is_favoritable(&self) -> bool {
        self.has_image() && self.prompt.as_deref().is_some_and(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fulfill_preserves_identity() {
        let mut message = ChatMessage::pending_bot("Generating image...", "a red fox in snow");
        let id = message.id;
        let timestamp = message.timestamp;

        message.fulfill("Your generated image:", "img-1");

        assert_eq!(message.id, id);
        assert_eq!(message.timestamp, timestamp);
        assert_eq!(message.image_url.as_deref(), Some("img-1"));
        assert!(message.is_favoritable());
    }

    #[test]
    fn test_fail_leaves_image_unset() {
        let mut message = ChatMessage::pending_bot("Generating image...", "a red fox in snow");
        let id = message.id;

        message.fail("Failed to generate image. Please check your settings and try again.");

        assert_eq!(message.id, id);
        assert!(message.image_url.is_none());
        assert!(!message.has_image());
        assert!(!message.is_favoritable());
    }

    #[test]
    fn test_user_message_is_not_favoritable() {
        let message = ChatMessage::user("a red fox in snow");
        assert!(!message.is_favoritable());
    }

    #[test]
    fn test_sender_round_trips_through_string() {
        for sender in [Sender::User, Sender::Bot] {
            let parsed: Sender = sender.as_str().parse().unwrap();
            assert_eq!(sender, parsed);
        }
    }
}
