//! Media store - Product images kept as files in the assets directory.
//!
//! Uploads arrive as `data:image/<type>;base64,<payload>` URLs. They are
//! decoded, written under a random name and referenced from the `images`
//! table by file name. The same directory backs `GET /api/image/{name}`.

use crate::errors::{Error, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::path::{Path, PathBuf};

/// Largest decoded upload accepted (10MB)
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Image formats accepted from data URLs, by MIME subtype and extension
const SUPPORTED_TYPES: &[(&str, &str)] = &[
    ("png", "png"),
    ("jpeg", "jpg"),
    ("jpg", "jpg"),
    ("webp", "webp"),
    ("gif", "gif"),
    ("svg+xml", "svg"),
];

/// Image file extensions served by the image route and their content types
pub const SERVED_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
];

/// Decoded data URL
#[derive(Debug, PartialEq, Eq)]
pub struct DecodedImage {
    /// File extension matching the MIME type
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Parses and decodes a base64 `data:image/...` URL.
///
/// # Errors
/// Returns a validation error when the URL is not a base64 image data URL
/// of a supported type, or the payload is empty or too large.
pub fn decode_data_url(data_url: &str) -> Result<DecodedImage> {
    let rest = data_url
        .strip_prefix("data:image/")
        .ok_or_else(|| Error::validation("Image must be a data:image/ URL"))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| Error::validation("Image data URL must be base64 encoded"))?;

    let extension = SUPPORTED_TYPES
        .iter()
        .find(|(subtype, _)| subtype.eq_ignore_ascii_case(mime))
        .map(|(_, ext)| *ext)
        .ok_or_else(|| Error::validation(format!("Unsupported image type: {mime}")))?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::validation(format!("Invalid image data: {e}")))?;
    if bytes.is_empty() {
        return Err(Error::validation("Image is empty"));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(Error::validation("Image exceeds 10MB"));
    }

    Ok(DecodedImage { extension, bytes })
}

/// True for names made only of ASCII letters, digits, `_` and `-`.
#[must_use]
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// File-system backed image storage
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
    cdn_url: Option<String>,
}

impl MediaStore {
    /// Creates a store rooted at `dir`; images are linked through `cdn_url`
    /// when one is configured.
    pub fn new(dir: impl Into<PathBuf>, cdn_url: Option<String>) -> Self {
        Self {
            dir: dir.into(),
            cdn_url,
        }
    }

    /// Directory the files live in
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Decodes a data URL and writes it under a fresh random name.
    ///
    /// Returns the stored file name (e.g., `3f2c...e1.png`).
    pub async fn save_data_url(&self, data_url: &str) -> Result<String> {
        let image = decode_data_url(data_url)?;
        let name = format!("{}.{}", uuid::Uuid::new_v4().simple(), image.extension);

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&name), &image.bytes).await?;
        tracing::debug!(name = %name, size = image.bytes.len(), "Stored image");
        Ok(name)
    }

    /// Reads `<name>.<extension>`.
    ///
    /// # Errors
    /// Returns `NotFound` for unsafe names, unsupported extensions and
    /// missing files.
    pub async fn read(&self, name: &str, extension: &str) -> Result<(Vec<u8>, &'static str)> {
        let content_type = SERVED_TYPES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, ct)| *ct)
            .filter(|_| is_safe_name(name))
            .ok_or_else(|| Error::not_found("Image", format!("{name}.{extension}")))?;

        match tokio::fs::read(self.dir.join(format!("{name}.{extension}"))).await {
            Ok(bytes) => Ok((bytes, content_type)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found("Image", format!("{name}.{extension}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removes a stored file, logging instead of failing.
    pub async fn remove(&self, file_name: &str) {
        let Some((stem, _)) = file_name.rsplit_once('.') else {
            return;
        };
        if !is_safe_name(stem) {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.dir.join(file_name)).await {
            tracing::warn!(file = file_name, "Failed to remove image: {}", e);
        }
    }

    /// Absolute CDN URL of a stored file, when a CDN is configured.
    #[must_use]
    pub fn cdn_url_for(&self, file_name: &str) -> Option<String> {
        self.cdn_url
            .as_ref()
            .map(|base| format!("{}/{file_name}", base.trim_end_matches('/')))
    }

    /// Public URL of a stored file.
    #[must_use]
    pub fn url_for(&self, file_name: &str) -> String {
        self.cdn_url_for(file_name)
            .unwrap_or_else(|| format!("/api/image/{file_name}"))
    }
}
