//! Wire types for the Automatic1111-style generation API.

use serde::{Deserialize, Serialize};

use crate::chat::core::settings::GenerationSettings;

/// JSON body POSTed to the generation endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct GenerationRequest {
    /// Positive prompt.
    pub prompt: String,
    /// Sampling steps.
    pub steps: u32,
    /// Classifier-free guidance scale.
    pub cfg_scale: f64,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Sampler name.
    pub sampler_name: String,
    /// Scheduler name.
    pub scheduler: String,
    /// Negative prompt.
    pub negative_prompt: String,
}

impl GenerationRequest {
    /// Build a request body from a prompt and the persisted settings.
    #[must_use]
    pub fn new(prompt: impl Into<String>, settings: &GenerationSettings) -> Self {
        Self {
            prompt: prompt.into(),
            steps: settings.steps,
            cfg_scale: settings.cfg_scale,
            width: settings.width,
            height: settings.height,
            sampler_name: settings.sampler_name.clone(),
            scheduler: settings.scheduler.clone(),
            negative_prompt: settings.negative_prompt.clone(),
        }
    }
}

/// JSON body returned by the generation endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct GenerationResponse {
    /// Base64-encoded images, first one wins.
    #[serde(default)]
    pub images: Vec<String>,
}

/// A displayable reference to a generated image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Inline `data:` URL carrying the image payload.
    pub data_url: String,
}
