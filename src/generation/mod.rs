//! HTTP client for an Automatic1111-style image-generation backend.
//!
//! One request, one response: no retry, no streaming, no timeout beyond the
//! transport defaults. Failures are reported once; retrying is a user
//! decision (regenerate).

pub mod error;
pub mod types;

pub use error::GenerationError;
pub use types::{GeneratedImage, GenerationRequest, GenerationResponse};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use url::Url;

use crate::chat::core::settings::GenerationSettings;

/// Client for the image-generation endpoint.
pub struct ImageClient {
    http: reqwest::Client,
}

impl ImageClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http })
    }

    /// Send a prompt to `endpoint` and return a displayable image reference.
    ///
    /// The endpoint is checked before any I/O; the response must carry at
    /// least one base64 image payload, which is wrapped into an inline
    /// `data:` URL.
    ///
    /// # Errors
    /// Returns [`GenerationError::MissingEndpoint`] or
    /// [`GenerationError::InvalidEndpoint`] for configuration problems,
    /// [`GenerationError::Request`] or [`GenerationError::BadStatus`] for
    /// transport failures, and [`GenerationError::ResponseFormat`] when the
    /// body holds no usable image.
    pub async fn generate(
        &self,
        endpoint: &str,
        prompt: &str,
        settings: &GenerationSettings,
    ) -> Result<GeneratedImage, GenerationError> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(GenerationError::MissingEndpoint);
        }
        let url = Url::parse(endpoint)?;

        let body = GenerationRequest::new(prompt, settings);
        let response = self.http.post(url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::BadStatus(status));
        }

        let payload: GenerationResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::ResponseFormat(format!("invalid JSON body: {err}")))?;

        let Some(first) = payload.images.first() else {
            return Err(GenerationError::ResponseFormat(
                "no images in response".to_string(),
            ));
        };
        if BASE64.decode(first).is_err() {
            return Err(GenerationError::ResponseFormat(
                "image payload is not valid base64".to_string(),
            ));
        }

        Ok(GeneratedImage {
            data_url: format!("data:image/png;base64,{first}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    // "hello" -- any valid base64 will do
    const PNG_B64: &str = "aGVsbG8=";

    #[tokio::test]
    async fn test_generate_posts_settings_and_wraps_first_image() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/sdapi/v1/txt2img").json_body(json!({
                    "prompt": "a red fox in snow",
                    "steps": 20,
                    "cfg_scale": 7.0,
                    "width": 512,
                    "height": 512,
                    "sampler_name": "Euler a",
                    "scheduler": "Automatic",
                    "negative_prompt": ""
                }));
                then.status(200)
                    .json_body(json!({ "images": [PNG_B64, "aWdub3JlZA=="] }));
            })
            .await;

        let client = ImageClient::new().unwrap();
        let image = client
            .generate(
                &server.url("/sdapi/v1/txt2img"),
                "a red fox in snow",
                &GenerationSettings::default(),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(image.data_url, format!("data:image/png;base64,{PNG_B64}"));
    }

    #[tokio::test]
    async fn test_empty_endpoint_fails_before_any_io() {
        let client = ImageClient::new().unwrap();
        let err = client
            .generate("", "prompt", &GenerationSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::MissingEndpoint));
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_unparseable_endpoint_is_a_configuration_error() {
        let client = ImageClient::new().unwrap();
        let err = client
            .generate("not a url", "prompt", &GenerationSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::InvalidEndpoint(_)));
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/gen");
                then.status(500);
            })
            .await;

        let client = ImageClient::new().unwrap();
        let err = client
            .generate(&server.url("/gen"), "prompt", &GenerationSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::BadStatus(status) if status.as_u16() == 500));
    }

    #[tokio::test]
    async fn test_missing_images_array_is_a_format_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/gen");
                then.status(200).json_body(json!({ "detail": "queued" }));
            })
            .await;

        let client = ImageClient::new().unwrap();
        let err = client
            .generate(&server.url("/gen"), "prompt", &GenerationSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::ResponseFormat(_)));
    }

    #[tokio::test]
    async fn test_garbage_payload_is_a_format_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/gen");
                then.status(200)
                    .json_body(json!({ "images": ["!!not base64!!"] }));
            })
            .await;

        let client = ImageClient::new().unwrap();
        let err = client
            .generate(&server.url("/gen"), "prompt", &GenerationSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::ResponseFormat(_)));
    }
}
