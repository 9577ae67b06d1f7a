use std::{fmt, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::{FIRST_IMAGE_FIELD, SECOND_IMAGE_FIELD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSlot {
    First,
    Second,
}

impl ImageSlot {
    pub const ALL: [ImageSlot; 2] = [ImageSlot::First, ImageSlot::Second];

    /// 1-based number shown to the user ("Image 1", "Image 2").
    pub fn number(self) -> u8 {
        match self {
            ImageSlot::First => 1,
            ImageSlot::Second => 2,
        }
    }

    /// Multipart field the slot's image is uploaded under.
    pub fn field_name(self) -> &'static str {
        match self {
            ImageSlot::First => FIRST_IMAGE_FIELD,
            ImageSlot::Second => SECOND_IMAGE_FIELD,
        }
    }
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSlot::First => f.write_str("first"),
            ImageSlot::Second => f.write_str("second"),
        }
    }
}

/// A locally chosen image, ready to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedImage {
    pub uri: String,
    pub name: String,
    pub mime_type: String,
}

impl SelectedImage {
    pub const CAPTURE_MIME_TYPE: &'static str = "image/jpeg";

    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Descriptor for a freshly captured camera photo.
    pub fn captured(uri: impl Into<String>, taken_at: DateTime<Utc>) -> Self {
        Self {
            uri: uri.into(),
            name: format!("photo_{}.jpg", taken_at.timestamp_millis()),
            mime_type: Self::CAPTURE_MIME_TYPE.to_string(),
        }
    }

    pub fn has_uri(&self) -> bool {
        !self.uri.trim().is_empty()
    }

    /// Filesystem location behind `uri`, accepting both bare paths and `file://` URIs.
    pub fn local_path(&self) -> &Path {
        Path::new(self.uri.strip_prefix("file://").unwrap_or(&self.uri))
    }
}

/// Verdict returned by the comparison service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub verified: bool,
    pub similarity_percentage: f64,
    pub distance: f64,
    pub threshold: f64,
    pub model: String,
}
