//! Upload-specific invariants checked before any bytes leave the machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const IMAGE_PREFIX: &str = "image/";
const DOCUMENT_EXTRA_TYPES: &[&str] = &["application/pdf"];
const MIB: u64 = 1_048_576;

/// Default ceiling for gallery images.
pub const DEFAULT_GALLERY_MAX_BYTES: u64 = 10 * MIB;

/// Default ceiling for document and resume uploads.
pub const DEFAULT_DOCUMENT_MAX_BYTES: u64 = 5 * MIB;

/// What an upload will be used for; decides the accepted types and ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    #[default]
    Gallery,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub gallery_max_bytes: u64,
    pub document_max_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            gallery_max_bytes: DEFAULT_GALLERY_MAX_BYTES,
            document_max_bytes: DEFAULT_DOCUMENT_MAX_BYTES,
        }
    }
}

impl UploadLimits {
    pub fn max_bytes(&self, kind: UploadKind) -> u64 {
        match kind {
            UploadKind::Gallery => self.gallery_max_bytes,
            UploadKind::Document => self.document_max_bytes,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadValidationError {
    #[error("`{filename}` is not an image (declared type `{media_type}`)")]
    UnsupportedType {
        filename: String,
        media_type: String,
    },
    #[error("`{filename}` is too large (limit is {limit_mib} MiB)")]
    TooLarge {
        filename: String,
        size_bytes: u64,
        limit_mib: u64,
    },
    #[error("`{filename}` is empty")]
    Empty { filename: String },
}

/// Whether `media_type` is accepted for `kind`.
pub fn accepts_media_type(kind: UploadKind, media_type: &str) -> bool {
    let media_type = media_type.trim().to_ascii_lowercase();
    if media_type.starts_with(IMAGE_PREFIX) {
        return true;
    }
    match kind {
        UploadKind::Gallery => false,
        UploadKind::Document => DOCUMENT_EXTRA_TYPES.contains(&media_type.as_str()),
    }
}

/// Validate a file's declared type and size against `limits`.
pub fn validate_upload(
    filename: &str,
    media_type: &str,
    size_bytes: u64,
    kind: UploadKind,
    limits: &UploadLimits,
) -> Result<(), UploadValidationError> {
    if !accepts_media_type(kind, media_type) {
        return Err(UploadValidationError::UnsupportedType {
            filename: filename.to_string(),
            media_type: media_type.to_string(),
        });
    }

    if size_bytes == 0 {
        return Err(UploadValidationError::Empty {
            filename: filename.to_string(),
        });
    }

    let limit = limits.max_bytes(kind);
    if size_bytes > limit {
        return Err(UploadValidationError::TooLarge {
            filename: filename.to_string(),
            size_bytes,
            limit_mib: limit.div_ceil(MIB),
        });
    }

    Ok(())
}
