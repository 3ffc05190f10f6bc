//! Configuration types for a scan.
//!
//! All scan behaviour is controlled through [`ScanConfig`], built via its
//! [`ScanConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs across tasks, log them, and diff two runs to understand
//! why their candidate lists differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::ScanError;
use crate::selection::SelectionSink;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which recognition flow to run against the uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Single book: the image shows one cover; one title/author guess.
    #[default]
    Cover,
    /// Book shelf: the image shows multiple spines; index-aligned guess lists.
    Shelf,
}

impl ScanMode {
    /// `true` for [`ScanMode::Shelf`].
    pub fn is_shelf(self) -> bool {
        matches!(self, ScanMode::Shelf)
    }

    /// Path segment of the recognition endpoint for this mode.
    pub(crate) fn endpoint(self) -> &'static str {
        match self {
            ScanMode::Cover => "scan_cover",
            ScanMode::Shelf => "scan_shelf",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Cover => f.write_str("cover"),
            ScanMode::Shelf => f.write_str("shelf"),
        }
    }
}

/// Configuration for one scan.
///
/// Built via [`ScanConfig::builder()`] or using [`ScanConfig::default()`].
///
/// # Example
/// ```rust
/// use shelfscan::{ScanConfig, ScanMode};
///
/// let config = ScanConfig::builder()
///     .mode(ScanMode::Shelf)
///     .gpu_host("https://gpu.example.com")
///     .cpu_host("https://api.example.com")
///     .max_per_spine(3)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ScanConfig {
    /// Base URL of the recognition service (the GPU host). If `None`, the
    /// `SHELFSCAN_GPU_HOST` environment variable is consulted at scan time.
    pub gpu_host: Option<String>,

    /// Base URL of the book-search service (the CPU host). If `None`, the
    /// `SHELFSCAN_CPU_HOST` environment variable is consulted at scan time.
    pub cpu_host: Option<String>,

    /// Recognition flow to run. Default: [`ScanMode::Cover`].
    pub mode: ScanMode,

    /// Maximum search hits kept per shelf spine. Default: 3.
    ///
    /// A shelf photo can produce a dozen spines; keeping every fuzzy hit per
    /// spine would swamp the selection UI. Three is enough to cover the usual
    /// "right book, wrong edition" ambiguity. Cover scans are not capped —
    /// there is only one guess, and the user picks from everything it found.
    pub max_per_spine: usize,

    /// Longest edge of the uploaded image in pixels. Default: 1600.
    ///
    /// Phone cameras produce 4000 px originals; spine text is still readable
    /// at 1600 px and the upload shrinks by an order of magnitude. Raise this
    /// for shelves photographed from across a room.
    pub max_edge: u32,

    /// JPEG quality of the uploaded image, 1–100. Default: 40.
    ///
    /// Recognition tolerates aggressive compression — it reads large cover
    /// lettering, not fine print. 40 matches the compression factor the
    /// mobile capture flow has always used and keeps uploads around 100 KB.
    pub jpeg_quality: u8,

    /// Recognition upload timeout in seconds. Default: 60.
    ///
    /// The GPU host may cold-start its model on the first request of the day;
    /// 60 s absorbs that warm-up without letting a dead host hang the caller
    /// forever.
    pub upload_timeout_secs: u64,

    /// Per-search request timeout in seconds. Default: 30.
    pub search_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Selection sink receiving scan lifecycle events and the final handoff.
    pub selection_sink: Option<Arc<dyn SelectionSink>>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            gpu_host: None,
            cpu_host: None,
            mode: ScanMode::Cover,
            max_per_spine: 3,
            max_edge: 1600,
            jpeg_quality: 40,
            upload_timeout_secs: 60,
            search_timeout_secs: 30,
            download_timeout_secs: 120,
            selection_sink: None,
        }
    }
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("gpu_host", &self.gpu_host)
            .field("cpu_host", &self.cpu_host)
            .field("mode", &self.mode)
            .field("max_per_spine", &self.max_per_spine)
            .field("max_edge", &self.max_edge)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("search_timeout_secs", &self.search_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "selection_sink",
                &self.selection_sink.as_ref().map(|_| "<dyn SelectionSink>"),
            )
            .finish()
    }
}

impl ScanConfig {
    /// Create a new builder for `ScanConfig`.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ScanConfig`].
#[derive(Debug)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    pub fn gpu_host(mut self, host: impl Into<String>) -> Self {
        self.config.gpu_host = Some(host.into());
        self
    }

    pub fn cpu_host(mut self, host: impl Into<String>) -> Self {
        self.config.cpu_host = Some(host.into());
        self
    }

    pub fn mode(mut self, mode: ScanMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn max_per_spine(mut self, n: usize) -> Self {
        self.config.max_per_spine = n.max(1);
        self
    }

    pub fn max_edge(mut self, px: u32) -> Self {
        self.config.max_edge = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs;
        self
    }

    pub fn search_timeout_secs(mut self, secs: u64) -> Self {
        self.config.search_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn selection_sink(mut self, sink: Arc<dyn SelectionSink>) -> Self {
        self.config.selection_sink = Some(sink);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScanConfig, ScanError> {
        let c = &self.config;
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(ScanError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.max_per_spine == 0 {
            return Err(ScanError::InvalidConfig(
                "max_per_spine must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_mobile_capture_flow() {
        let c = ScanConfig::default();
        assert_eq!(c.mode, ScanMode::Cover);
        assert_eq!(c.max_per_spine, 3);
        assert_eq!(c.jpeg_quality, 40);
        assert!(c.gpu_host.is_none());
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let c = ScanConfig::builder()
            .jpeg_quality(250)
            .max_per_spine(0)
            .max_edge(10)
            .build()
            .unwrap();
        assert_eq!(c.jpeg_quality, 100);
        assert_eq!(c.max_per_spine, 1);
        assert_eq!(c.max_edge, 100);
    }

    #[test]
    fn mode_endpoint_paths() {
        assert_eq!(ScanMode::Cover.endpoint(), "scan_cover");
        assert_eq!(ScanMode::Shelf.endpoint(), "scan_shelf");
        assert!(ScanMode::Shelf.is_shelf());
        assert!(!ScanMode::Cover.is_shelf());
    }

    #[test]
    fn mode_display_is_lowercase() {
        assert_eq!(ScanMode::Cover.to_string(), "cover");
        assert_eq!(ScanMode::Shelf.to_string(), "shelf");
    }
}
