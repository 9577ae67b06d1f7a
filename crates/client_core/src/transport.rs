//! Outgoing side of a comparison: the two-part multipart upload.

use std::time::Duration;

use async_trait::async_trait;
use mime_guess::mime::Mime;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::{
    domain::{ImageSlot, SelectedImage},
    error::SubmissionError,
    protocol::{RawReply, DEFAULT_COMPARE_ENDPOINT, FALLBACK_MIME_TYPE},
};
use tracing::{debug, error, info, warn};

#[async_trait]
pub trait CompareTransport: Send + Sync {
    /// Issues exactly one request carrying both images and returns the reply untouched.
    async fn send_pair(
        &self,
        first: &SelectedImage,
        second: &SelectedImage,
    ) -> Result<RawReply, SubmissionError>;
}

#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub endpoint: String,
    /// `None` waits for the service indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COMPARE_ENDPOINT.to_string(),
            request_timeout: None,
        }
    }
}

pub struct HttpCompareTransport {
    http: Client,
    endpoint: String,
}

impl HttpCompareTransport {
    pub fn new(options: TransportOptions) -> Result<Self, SubmissionError> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| SubmissionError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            endpoint: options.endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn image_part(slot: ImageSlot, image: &SelectedImage) -> Result<Part, SubmissionError> {
        let bytes = tokio::fs::read(image.local_path())
            .await
            .map_err(|err| SubmissionError::ImageUnreadable {
                name: image.name.clone(),
                reason: err.to_string(),
            })?;
        debug!(
            field = slot.field_name(),
            name = %image.name,
            mime_type = %image.mime_type,
            size_bytes = bytes.len(),
            "prepared image part"
        );

        let mime_type = if image.mime_type.parse::<Mime>().is_ok() {
            image.mime_type.as_str()
        } else {
            warn!(
                field = slot.field_name(),
                mime_type = %image.mime_type,
                "unusable mime type, sending as {FALLBACK_MIME_TYPE}"
            );
            FALLBACK_MIME_TYPE
        };

        Part::bytes(bytes)
            .file_name(image.name.clone())
            .mime_str(mime_type)
            .map_err(|err| SubmissionError::Transport(err.to_string()))
    }
}

#[async_trait]
impl CompareTransport for HttpCompareTransport {
    async fn send_pair(
        &self,
        first: &SelectedImage,
        second: &SelectedImage,
    ) -> Result<RawReply, SubmissionError> {
        let form = Form::new()
            .part(
                ImageSlot::First.field_name(),
                Self::image_part(ImageSlot::First, first).await?,
            )
            .part(
                ImageSlot::Second.field_name(),
                Self::image_part(ImageSlot::Second, second).await?,
            );

        info!(endpoint = %self.endpoint, "posting image pair for comparison");
        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                error!(endpoint = %self.endpoint, error = %err, "compare request failed");
                SubmissionError::Transport(err.to_string())
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| SubmissionError::Transport(err.to_string()))?;
        debug!(status, body_len = body.len(), "compare reply received");
        Ok(RawReply { status, body })
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
