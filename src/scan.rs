//! Eager (full-batch) scan entry points.
//!
//! ## Why eager vs. streaming?
//!
//! This module provides the simpler API: wait for every spine, then return
//! the assembled [`ScanOutput`]. Use [`crate::stream::scan_stream`] instead
//! when you want spine results progressively (e.g. to fill a selection UI
//! while later spines are still searching).
//!
//! ## Flow
//!
//! ```text
//! resolve input → prepare payload → recognize → resolve spines → handoff
//! ```
//!
//! Everything is awaited in order; one request is in flight at a time.
//! Dropping the returned future cancels whatever request is in flight at
//! the next await point.

use crate::config::{ScanConfig, ScanMode};
use crate::error::ScanError;
use crate::output::{ScanOutput, ScanStats};
use crate::pipeline::{encode, input, recognize, search};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Environment variable consulted when [`ScanConfig::gpu_host`] is unset.
pub const GPU_HOST_ENV: &str = "SHELFSCAN_GPU_HOST";
/// Environment variable consulted when [`ScanConfig::cpu_host`] is unset.
pub const CPU_HOST_ENV: &str = "SHELFSCAN_CPU_HOST";

/// A reusable scan client.
///
/// Holds the HTTP connection pool and one in-flight gate per mode: a second
/// `scan` call in the same mode while one is running fails fast with
/// [`ScanError::ScanInFlight`] instead of queueing a duplicate upload —
/// the double-tap guard the capture UI relies on.
pub struct Scanner {
    client: reqwest::Client,
    config: ScanConfig,
    gates: ModeGates,
}

impl Scanner {
    /// Create a scanner from a configuration.
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ScanError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            gates: ModeGates::default(),
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan an image given as a local file path or HTTP/HTTPS URL.
    pub async fn scan(&self, input_str: impl AsRef<str>) -> Result<ScanOutput, ScanError> {
        let input_str = input_str.as_ref();
        let _gate = self.acquire_gate()?;
        info!("Starting {} scan: {}", self.config.mode, input_str);
        let bytes = input::resolve_input(input_str, self.config.download_timeout_secs).await?;
        self.run(bytes).await
    }

    /// Scan an image already held in memory.
    pub async fn scan_from_bytes(&self, bytes: &[u8]) -> Result<ScanOutput, ScanError> {
        let _gate = self.acquire_gate()?;
        info!("Starting {} scan from {} bytes", self.config.mode, bytes.len());
        self.run(bytes.to_vec()).await
    }

    fn acquire_gate(&self) -> Result<GateGuard<'_>, ScanError> {
        self.gates
            .acquire(self.config.mode)
            .ok_or(ScanError::ScanInFlight {
                mode: self.config.mode,
            })
    }

    /// The common path once raw image bytes are in hand.
    async fn run(&self, bytes: Vec<u8>) -> Result<ScanOutput, ScanError> {
        let total_start = Instant::now();
        let config = &self.config;
        let (gpu_host, cpu_host) = resolve_hosts(config)?;

        // Image codecs are CPU-bound; keep them off the async executor.
        let encode_config = config.clone();
        let payload =
            tokio::task::spawn_blocking(move || encode::prepare_payload(&bytes, &encode_config))
                .await
                .map_err(|e| ScanError::Internal(format!("encode task: {e}")))??;

        if let Some(ref sink) = config.selection_sink {
            sink.on_scan_start(config.mode);
        }

        let upload_start = Instant::now();
        let recognition = recognize::recognize(&self.client, config, &gpu_host, payload).await?;
        let upload_duration_ms = upload_start.elapsed().as_millis() as u64;

        if let Some(ref sink) = config.selection_sink {
            sink.on_recognition_complete(recognition.spine_count());
        }

        let search_start = Instant::now();
        let batch = search::resolve_candidates(&self.client, config, &cpu_host, &recognition).await;
        let search_duration_ms = search_start.elapsed().as_millis() as u64;

        let searched = batch.spines.iter().filter(|s| !s.skipped).count();
        let skipped = batch.spines.len() - searched;
        let failed = batch.spines.iter().filter(|s| s.error.is_some()).count();

        // Every attempted search failing means nothing was resolved; surface
        // the first error instead of an empty-looking success.
        if searched > 0 && failed == searched {
            let first_error = batch
                .spines
                .iter()
                .find_map(|s| s.error.as_ref())
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ScanError::AllSearchesFailed {
                total: searched,
                first_error,
            });
        }

        let stats = ScanStats {
            spines_total: batch.spines.len(),
            spines_searched: searched,
            spines_skipped: skipped,
            spines_failed: failed,
            candidates_found: batch.candidates.len(),
            duplicates_dropped: batch.duplicates_dropped,
            upload_duration_ms,
            search_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "Scan complete: {} candidate(s) from {} spine(s), {}ms total",
            stats.candidates_found, stats.spines_total, stats.total_duration_ms
        );

        let output = ScanOutput {
            candidates: batch.candidates,
            spines: batch.spines,
            recognition,
            mode: config.mode,
            stats,
        };

        // The readiness signal: the batch is fully assembled before the
        // collaborator hears about it. Empty batches are not handed off.
        if !output.candidates.is_empty() {
            if let Some(ref sink) = config.selection_sink {
                sink.on_selection_start(&output.candidates, output.is_shelf());
            }
        }

        Ok(output)
    }
}

/// One atomic flag per mode; cover and shelf scans gate independently.
#[derive(Default)]
struct ModeGates {
    cover: AtomicBool,
    shelf: AtomicBool,
}

impl ModeGates {
    fn flag(&self, mode: ScanMode) -> &AtomicBool {
        match mode {
            ScanMode::Cover => &self.cover,
            ScanMode::Shelf => &self.shelf,
        }
    }

    /// Claim the gate for a mode; `None` when a scan is already running.
    fn acquire(&self, mode: ScanMode) -> Option<GateGuard<'_>> {
        let flag = self.flag(mode);
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        Some(GateGuard { flag })
    }
}

/// Releases the gate on drop, including on error and cancellation paths.
struct GateGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Resolve the recognition and search hosts, most-specific first.
///
/// 1. **Explicit config** (`gpu_host` / `cpu_host`) — the caller chose.
/// 2. **Environment** (`SHELFSCAN_GPU_HOST` / `SHELFSCAN_CPU_HOST`) — set at
///    the execution-environment level (shell profile, CI, launcher).
///
/// Anything else is a configuration error with a remediation hint.
pub(crate) fn resolve_hosts(config: &ScanConfig) -> Result<(String, String), ScanError> {
    let gpu = host_from(config.gpu_host.as_deref(), GPU_HOST_ENV).ok_or_else(|| {
        ScanError::HostNotConfigured {
            which: "recognition",
            hint: format!("Set ScanConfig::gpu_host or the {GPU_HOST_ENV} environment variable."),
        }
    })?;
    let cpu = host_from(config.cpu_host.as_deref(), CPU_HOST_ENV).ok_or_else(|| {
        ScanError::HostNotConfigured {
            which: "search",
            hint: format!("Set ScanConfig::cpu_host or the {CPU_HOST_ENV} environment variable."),
        }
    })?;
    debug!("Hosts resolved: recognition={}, search={}", gpu, cpu);
    Ok((gpu, cpu))
}

fn host_from(configured: Option<&str>, env_var: &str) -> Option<String> {
    if let Some(host) = configured {
        if !host.is_empty() {
            return Some(host.to_string());
        }
    }
    match std::env::var(env_var) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => None,
    }
}

// ── Free-function entry points ───────────────────────────────────────────

/// Scan an image file or URL and return the candidate batch.
///
/// This is the primary entry point for the library. Builds a one-shot
/// [`Scanner`] internally; hold your own `Scanner` to reuse connections
/// across scans.
///
/// # Errors
/// Returns `Err(ScanError)` only for fatal errors — unreadable input,
/// unconfigured hosts, a rejected recognition call, or every search
/// failing. Partial search failure is reported in the output's stats.
pub async fn scan(
    input_str: impl AsRef<str>,
    config: &ScanConfig,
) -> Result<ScanOutput, ScanError> {
    Scanner::new(config.clone())?.scan(input_str).await
}

/// Scan image bytes already held in memory.
///
/// This is the recommended API when the image comes from a camera buffer or
/// upload stream rather than a file on disk.
pub async fn scan_from_bytes(
    bytes: &[u8],
    config: &ScanConfig,
) -> Result<ScanOutput, ScanError> {
    Scanner::new(config.clone())?.scan_from_bytes(bytes).await
}

/// Synchronous wrapper around [`scan`].
///
/// Creates a temporary tokio runtime internally.
pub fn scan_sync(
    input_str: impl AsRef<str>,
    config: &ScanConfig,
) -> Result<ScanOutput, ScanError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ScanError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(scan(input_str, config))
}

/// Scan and write the output as pretty-printed JSON to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn scan_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ScanConfig,
) -> Result<ScanStats, ScanError> {
    let output = scan(input_str, config).await?;
    let path = output_path.as_ref();

    let json = serde_json::to_vec_pretty(&output)
        .map_err(|e| ScanError::Internal(format!("serialize output: {e}")))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ScanError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json)
        .await
        .map_err(|e| ScanError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ScanError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output.stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_blocks_second_acquire_in_same_mode() {
        let gates = ModeGates::default();
        let guard = gates.acquire(ScanMode::Cover).expect("first acquire");
        assert!(gates.acquire(ScanMode::Cover).is_none());
        // A shelf scan is a different gate.
        assert!(gates.acquire(ScanMode::Shelf).is_some());
        drop(guard);
        assert!(gates.acquire(ScanMode::Cover).is_some());
    }

    #[test]
    fn explicit_hosts_win_over_environment() {
        let config = ScanConfig::builder()
            .gpu_host("https://gpu.example.com")
            .cpu_host("https://api.example.com")
            .build()
            .unwrap();
        let (gpu, cpu) = resolve_hosts(&config).unwrap();
        assert_eq!(gpu, "https://gpu.example.com");
        assert_eq!(cpu, "https://api.example.com");
    }

    #[test]
    fn missing_gpu_host_is_a_config_error() {
        // Only meaningful when the environment doesn't provide a host.
        if std::env::var(GPU_HOST_ENV).is_ok() {
            println!("SKIP — {GPU_HOST_ENV} is set in this environment");
            return;
        }
        let config = ScanConfig::builder()
            .cpu_host("https://api.example.com")
            .build()
            .unwrap();
        let err = resolve_hosts(&config).unwrap_err();
        match err {
            ScanError::HostNotConfigured { which, .. } => assert_eq!(which, "recognition"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn scan_with_missing_file_fails_before_any_network_call() {
        let config = ScanConfig::builder()
            .gpu_host("https://gpu.invalid")
            .cpu_host("https://api.invalid")
            .build()
            .unwrap();
        let err = scan("/definitely/not/a/real/cover.jpg", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::ImageNotFound { .. }));
    }

    #[tokio::test]
    async fn scan_from_garbage_bytes_is_not_an_image() {
        let config = ScanConfig::builder()
            .gpu_host("https://gpu.invalid")
            .cpu_host("https://api.invalid")
            .build()
            .unwrap();
        let err = scan_from_bytes(b"not pixels", &config).await.unwrap_err();
        assert!(matches!(err, ScanError::NotAnImage { .. }));
    }
}
