//! Wire contract of the face comparison service.

use serde::{Deserialize, Serialize};

pub const DEFAULT_COMPARE_ENDPOINT: &str = "https://fs-api.microbox.tech/compare";
pub const FIRST_IMAGE_FIELD: &str = "img1";
pub const SECOND_IMAGE_FIELD: &str = "img2";
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Markers searched for in bodies that fail to parse as JSON, in priority order.
pub const ENTITY_TOO_LARGE_MARKER: &str = "413 Request Entity Too Large";
pub const PAYLOAD_TOO_LARGE_CODE: &str = "413";
pub const UNAVAILABLE_CODES: [&str; 3] = ["500", "502", "503"];

/// Error body the service sends alongside a non-2xx status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Raw reply as received off the wire, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReply {
    pub status: u16,
    pub body: String,
}

impl RawReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
