use std::io::ErrorKind;
use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::constants::{IMAGE_TYPES, MAX_IMAGE_BYTES, RECIPE_IMAGE_DIR};
use crate::error::{Error, HtmlError};

/// Uploaded files under `root`, published under `base_url`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    base_url: String,
}

/// Image carried inline as `data:<mime>;base64,<payload>`.
#[derive(Debug, PartialEq)]
pub struct DataImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

impl DataImage {
    pub fn parse(data_url: &str) -> Result<Self, Error> {
        let invalid = || Error::field("image", "Upload a valid base64 encoded image.");

        let rest = data_url.strip_prefix("data:").ok_or_else(invalid)?;
        let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;
        let mime = header.strip_suffix(";base64").ok_or_else(invalid)?;

        let extension = IMAGE_TYPES
            .iter()
            .find(|(kind, _)| kind.eq_ignore_ascii_case(mime))
            .map(|(_, extension)| *extension)
            .ok_or_else(|| Error::field("image", "Unsupported image type."))?;

        let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
        if bytes.is_empty() {
            return Err(Error::field("image", "The submitted image is empty."));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(Error::field("image", "The submitted image is too large."));
        }

        Ok(Self { extension, bytes })
    }
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.to_string(),
        }
    }

    /// Writes the image and returns its path relative to the media root.
    pub async fn save_image(&self, data_url: &str) -> Result<String, Error> {
        let image = DataImage::parse(data_url)?;
        let name = format!(
            "{RECIPE_IMAGE_DIR}/{}.{}",
            uuid::Uuid::new_v4().simple(),
            image.extension
        );
        let path = self.root.join(&name);

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                HtmlError::InternalServerError.new(&format!("Could not create {dir:?}: {e}"))
            })?;
        }
        tokio::fs::write(&path, &image.bytes).await.map_err(|e| {
            HtmlError::InternalServerError.new(&format!("Could not write {path:?}: {e}"))
        })?;

        log::trace!("> Stored image {name} ({} bytes)", image.bytes.len());
        Ok(name)
    }

    /// Deletes a stored file; a missing file is not an error.
    pub async fn remove(&self, name: &str) {
        if name.is_empty() || name.contains("..") {
            return;
        }

        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => log::trace!("> Removed image {name}"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::error!("Failed to remove media file {name}: {e}"),
        }
    }

    pub fn url(&self, name: &str) -> String {
        format!("{}{}", self.base_url, name)
    }
}
