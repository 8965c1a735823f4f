//! Temporary files materialized from base64 attribute values.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// Decode `encoded` and write it to a fresh file under `dir`.
///
/// The extension follows the sniffed image type; anything unrecognised is
/// written as `.bin`.
pub fn write_base64_file(dir: &Path, property: &str, encoded: &str) -> Result<PathBuf, ApiError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let extension = image_extension(&bytes).unwrap_or("bin");
    let path = dir.join(format!("tmp_{property}_{}.{extension}", Uuid::new_v4().simple()));
    std::fs::write(&path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "materialized base64 attribute");
    Ok(path)
}

/// Delete every tracked file that still exists and empty the list.
pub fn remove_all(paths: &mut Vec<PathBuf>) {
    for path in paths.drain(..) {
        if !path.exists() {
            continue;
        }
        if let Err(err) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), error = %err, "failed to remove temporary file");
        }
    }
}

/// File extension (the MIME subtype) of a known image signature.
pub fn image_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("gif")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else if bytes.starts_with(b"BM") {
        Some("bmp")
    } else {
        None
    }
}
