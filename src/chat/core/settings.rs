//! Configuration types: generation parameters, backend profiles, storage.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::chat::core::errors::{ChatError, ChatResult};

/// Parameters sent with every image-generation request.
///
/// Persisted as JSON. Every field has its own default so records written by
/// older schema versions (or hand-edited ones) decode field-by-field instead
/// of failing whole.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Sampling steps, 1 to 50.
    #[serde(default = "default_steps")]
    pub steps: u32,
    /// Classifier-free guidance scale, 1 to 20.
    #[serde(default = "default_cfg_scale")]
    pub cfg_scale: f64,
    /// Output width in pixels.
    #[serde(default = "default_dimension")]
    pub width: u32,
    /// Output height in pixels.
    #[serde(default = "default_dimension")]
    pub height: u32,
    /// Sampler name understood by the backend.
    #[serde(default = "default_sampler")]
    pub sampler_name: String,
    /// Scheduler name understood by the backend.
    #[serde(default = "default_scheduler")]
    pub scheduler: String,
    /// Negative prompt, empty by default.
    #[serde(default)]
    pub negative_prompt: String,
}

fn default_steps() -> u32 {
    20
}

fn default_cfg_scale() -> f64 {
    7.0
}

fn default_dimension() -> u32 {
    512
}

fn default_sampler() -> String {
    "Euler a".to_string()
}

fn default_scheduler() -> String {
    "Automatic".to_string()
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            cfg_scale: default_cfg_scale(),
            width: default_dimension(),
            height: default_dimension(),
            sampler_name: default_sampler(),
            scheduler: default_scheduler(),
            negative_prompt: String::new(),
        }
    }
}

impl GenerationSettings {
    /// Validate parameter ranges before a generation request is sent.
    ///
    /// # Errors
    /// Returns an error if any value is out of range.
    pub fn validate(&self) -> ChatResult<()> {
        if !(1..=50).contains(&self.steps) {
            return Err(ChatError::InvalidConfig(
                "steps must be between 1 and 50".to_string(),
            ));
        }
        if !(1.0..=20.0).contains(&self.cfg_scale) {
            return Err(ChatError::InvalidConfig(
                "cfg_scale must be between 1 and 20".to_string(),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ChatError::InvalidConfig(
                "width and height must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Optional alternate backend profile, stored independently of the primary
/// endpoint.
///
/// The wire client always speaks the Automatic1111-style JSON contract; the
/// profile only carries where an alternate backend lives and an opaque
/// workflow template for backends that take one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackendProfile {
    /// Endpoint URL of the alternate backend.
    #[serde(default)]
    pub endpoint: String,
    /// Opaque workflow template, if the backend uses one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
}

/// Storage configuration for the chat database.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Messages table name.
    pub messages_table: String,
    /// Favorites table name.
    pub favorites_table: String,
    /// Settings table name.
    pub settings_table: String,
    /// Maximum number of image-bearing messages retained by the message
    /// store. Older image messages beyond the cap are evicted on save.
    pub max_images: usize,
}

impl StorageConfig {
    /// Default cap on retained image-bearing messages.
    pub const DEFAULT_MAX_IMAGES: usize = 50;

    /// Configuration backed by an in-memory database, for tests and
    /// throwaway sessions.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            sqlite_path: PathBuf::from(":memory:"),
            ..Self::default()
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("chatgenie.sqlite"),
            messages_table: "messages".to_string(),
            favorites_table: "favorites".to_string(),
            settings_table: "settings".to_string(),
            max_images: Self::DEFAULT_MAX_IMAGES,
        }
    }
}
