//! Error types for the shelfscan library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ScanError`] — **Fatal**: the scan cannot produce a candidate batch at
//!   all (unreadable image, endpoint not configured, recognition request
//!   rejected). Returned as `Err(ScanError)` from the top-level `scan*`
//!   functions.
//!
//! * [`SearchError`] — **Non-fatal**: one spine's search failed (HTTP error,
//!   malformed response) but the other spines are fine. Stored inside
//!   [`crate::output::SpineResult`] so callers can inspect partial success
//!   rather than losing the whole batch to one bad spine.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! spine failure via [`crate::output::ScanOutput::into_result`], or log and
//! present whatever candidates survived.

use crate::config::ScanMode;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the shelfscan library.
///
/// Spine-level search failures use [`SearchError`] and are stored in
/// [`crate::output::SpineResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ScanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input image was not found at the given path.
    #[error("Image not found: '{path}'\nCheck the path exists and is readable.")]
    ImageNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read but do not start like any supported image format.
    #[error("Input is not a recognisable image\nFirst bytes: {magic:?}")]
    NotAnImage { magic: [u8; 4] },

    /// The image decoded as a known format but could not be re-encoded.
    #[error("Failed to prepare upload payload: {detail}")]
    EncodeFailed { detail: String },

    // ── Endpoint errors ───────────────────────────────────────────────────
    /// The recognition or search host is not configured.
    #[error("The {which} host is not configured.\n{hint}")]
    HostNotConfigured { which: &'static str, hint: String },

    /// The recognition endpoint returned a non-2xx status.
    #[error("Recognition request rejected with HTTP {status}: {body}")]
    RecognitionFailed { status: u16, body: String },

    /// The recognition request failed at the transport level.
    #[error("Recognition request failed: {reason}")]
    RecognitionRequest { reason: String },

    /// The recognition call exceeded the upload timeout.
    #[error("Recognition timed out after {secs}s\nIncrease --upload-timeout.")]
    RecognitionTimeout { secs: u64 },

    /// The recognition endpoint returned 2xx but the body did not parse.
    #[error("Malformed recognition response: {detail}")]
    MalformedRecognition { detail: String },

    // ── Flow errors ───────────────────────────────────────────────────────
    /// A scan in the same mode is already running on this [`crate::Scanner`].
    #[error("A {mode} scan is already in flight; wait for it to finish")]
    ScanInFlight { mode: ScanMode },

    /// Every attempted search failed; no candidates could be produced.
    #[error("All {total} searches failed.\nFirst error: {first_error}")]
    AllSearchesFailed { total: usize, first_error: String },

    /// Some spines resolved but at least one search failed.
    ///
    /// Returned by [`crate::output::ScanOutput::into_result`] when the
    /// caller wants to treat any spine failure as an error.
    #[error("{failed}/{total} spine searches failed during the scan")]
    PartialSearchFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single spine's search.
///
/// Stored in [`crate::output::SpineResult`] when a search fails. The overall
/// scan continues unless ALL attempted searches fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SearchError {
    /// The search endpoint returned a non-2xx status.
    #[error("Spine {spine}: search returned HTTP {status}: {detail}")]
    Status {
        spine: usize,
        status: u16,
        detail: String,
    },

    /// The search request failed at the transport level.
    #[error("Spine {spine}: search request failed: {detail}")]
    Request { spine: usize, detail: String },

    /// The search endpoint returned 2xx but the body did not parse.
    #[error("Spine {spine}: malformed search response: {detail}")]
    Malformed { spine: usize, detail: String },
}

impl SearchError {
    /// The 0-indexed spine this error belongs to.
    pub fn spine(&self) -> usize {
        match self {
            SearchError::Status { spine, .. }
            | SearchError::Request { spine, .. }
            | SearchError::Malformed { spine, .. } => *spine,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = ScanError::PartialSearchFailure {
            success: 6,
            failed: 1,
            total: 7,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/7"), "got: {msg}");
    }

    #[test]
    fn scan_in_flight_display() {
        let e = ScanError::ScanInFlight {
            mode: ScanMode::Shelf,
        };
        assert!(e.to_string().contains("shelf"));
    }

    #[test]
    fn recognition_failed_display() {
        let e = ScanError::RecognitionFailed {
            status: 503,
            body: "model warming up".into(),
        };
        assert!(e.to_string().contains("503"));
        assert!(e.to_string().contains("model warming up"));
    }

    #[test]
    fn host_not_configured_display() {
        let e = ScanError::HostNotConfigured {
            which: "recognition",
            hint: "Set SHELFSCAN_GPU_HOST.".into(),
        };
        assert!(e.to_string().contains("recognition"));
        assert!(e.to_string().contains("SHELFSCAN_GPU_HOST"));
    }

    #[test]
    fn search_error_spine_accessor() {
        let e = SearchError::Status {
            spine: 4,
            status: 500,
            detail: "boom".into(),
        };
        assert_eq!(e.spine(), 4);
        assert!(e.to_string().contains("500"));
    }
}
