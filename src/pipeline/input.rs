//! Input resolution: normalise a user-supplied path or URL to raw image bytes.
//!
//! The recognition endpoint takes the image as an opaque octet-stream, so
//! unlike a renderer we never need a file-system path — everything is
//! resolved to an in-memory buffer. Magic bytes are validated here (via
//! `image::guess_format`) so callers get a meaningful error rather than a
//! rejected upload when they pass a text file by accident.

use crate::error::ScanError;
use std::path::PathBuf;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to raw image bytes.
///
/// If the input is a URL, download it. If it is a local file, read and
/// validate it.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<Vec<u8>, ScanError> {
    if input.trim().is_empty() {
        return Err(ScanError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download(input, timeout_secs).await
    } else {
        read_local(input)
    }
}

/// First four bytes of the buffer, zero-padded, for error reporting.
pub(crate) fn magic_bytes(bytes: &[u8]) -> [u8; 4] {
    let mut magic = [0u8; 4];
    for (i, b) in bytes.iter().take(4).enumerate() {
        magic[i] = *b;
    }
    magic
}

/// Reject buffers that don't start like any image format we can decode.
fn validate_image(bytes: &[u8]) -> Result<(), ScanError> {
    image::guess_format(bytes).map_err(|_| ScanError::NotAnImage {
        magic: magic_bytes(bytes),
    })?;
    Ok(())
}

/// Read a local file, validating existence, permissions, and magic bytes.
fn read_local(path_str: &str) -> Result<Vec<u8>, ScanError> {
    let path = PathBuf::from(path_str);

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ScanError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ScanError::ImageNotFound { path });
        }
    };

    validate_image(&bytes)?;
    debug!("Resolved local image: {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

/// Download a URL into memory and validate it is an image.
async fn download(url: &str, timeout_secs: u64) -> Result<Vec<u8>, ScanError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ScanError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ScanError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ScanError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ScanError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ScanError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    validate_image(&bytes)?;
    debug!("Downloaded {} bytes", bytes.len());
    Ok(bytes)
}
