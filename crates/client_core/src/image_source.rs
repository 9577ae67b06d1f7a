//! Where selected images come from. The native camera/gallery pickers are
//! outside this crate; callers hand in an `ImageSource`.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use shared::{
    domain::{ImageSlot, SelectedImage},
    error::SubmissionError,
    protocol::FALLBACK_MIME_TYPE,
};
use tracing::debug;

#[async_trait]
pub trait ImageSource: Send + Sync {
    /// `Ok(None)` means the user cancelled the pick.
    async fn pick(&self, slot: ImageSlot) -> Result<Option<SelectedImage>, SubmissionError>;
}

/// Describes a gallery file: name from the last path segment, MIME type from the extension.
pub fn image_from_path(path: &Path) -> SelectedImage {
    let uri = path.to_string_lossy().into_owned();
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| uri.clone());
    SelectedImage::new(uri, name, infer_mime_type(path))
}

pub fn infer_mime_type(path: &Path) -> String {
    if let Some(guess) = mime_guess::from_path(path).first_raw() {
        if guess.starts_with("image/") {
            return guess.to_string();
        }
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!("image/{}", ext.to_ascii_lowercase())
        }
        _ => FALLBACK_MIME_TYPE.to_string(),
    }
}

/// Checks the file exists and is a regular file before describing it.
pub async fn pick_from_path(path: &Path) -> Result<SelectedImage, SubmissionError> {
    let image = image_from_path(path);
    let metadata =
        tokio::fs::metadata(path)
            .await
            .map_err(|err| SubmissionError::ImageUnreadable {
                name: image.name.clone(),
                reason: err.to_string(),
            })?;
    if !metadata.is_file() {
        return Err(SubmissionError::ImageUnreadable {
            name: image.name,
            reason: "not a regular file".to_string(),
        });
    }
    debug!(path = %path.display(), mime_type = %image.mime_type, "picked image from disk");
    Ok(image)
}

/// Resolves each slot to a path chosen up front (for example on the command line).
#[derive(Debug, Default, Clone)]
pub struct PathImageSource {
    paths: HashMap<ImageSlot, PathBuf>,
}

impl PathImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, slot: ImageSlot, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(slot, path.into());
        self
    }
}

#[async_trait]
impl ImageSource for PathImageSource {
    async fn pick(&self, slot: ImageSlot) -> Result<Option<SelectedImage>, SubmissionError> {
        match self.paths.get(&slot) {
            Some(path) => pick_from_path(path).await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "tests/image_source_tests.rs"]
mod tests;
