//! # shelfscan
//!
//! Identify books from cover and shelf photos using remote recognition and
//! search services.
//!
//! ## Why this crate?
//!
//! Typing a title into a search box is fine for one book; cataloguing a
//! shelf of forty is not. This crate takes a photo, lets a recognition
//! service read the covers or spines, resolves each guess against a book
//! search service, and hands back a clean, ISBN-deduplicated candidate list
//! for the user to confirm.
//!
//! ## Pipeline Overview
//!
//! ```text
//! photo
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Encode     downscale + JPEG re-encode (CPU-bound, spawn_blocking)
//!  ├─ 3. Recognize  POST payload → title/author guesses (GPU host)
//!  ├─ 4. Normalize  deterministic cleanup of OCR-ish guesses
//!  ├─ 5. Search     one sequential query per spine, ISBN dedup (CPU host)
//!  └─ 6. Handoff    candidate batch → selection sink
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shelfscan::{scan, ScanConfig, ScanMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Hosts auto-detected from SHELFSCAN_GPU_HOST / SHELFSCAN_CPU_HOST
//!     let config = ScanConfig::builder().mode(ScanMode::Shelf).build()?;
//!     let output = scan("shelf.jpg", &config).await?;
//!     for c in &output.candidates {
//!         println!("{} — {} ({})", c.title, c.author, c.isbn);
//!     }
//!     eprintln!("{} spines, {} failed",
//!         output.stats.spines_total,
//!         output.stats.spines_failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `shelfscan` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! shelfscan = { version = "0.3", default-features = false }
//! ```
//!
//! ## Failure model
//!
//! Fatal problems (unreadable image, rejected recognition call,
//! unconfigured hosts) come back as [`ScanError`]. A single spine's failed
//! search does not abort a shelf scan — it is recorded on that spine's
//! [`SpineResult`] and the remaining spines continue. Strict callers can
//! convert partial failure into an error with [`ScanOutput::into_result`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod candidate;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod recommend;
pub mod scan;
pub mod selection;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use candidate::{ApiBook, Candidate, IdGenerator};
pub use config::{ScanConfig, ScanConfigBuilder, ScanMode};
pub use error::{ScanError, SearchError};
pub use output::{ScanOutput, ScanStats, SpineResult};
pub use pipeline::recognize::{CoverGuess, Recognition, ShelfGuess};
pub use recommend::RecommendationList;
pub use scan::{scan, scan_from_bytes, scan_sync, scan_to_file, Scanner};
pub use selection::{NoopSelectionSink, SelectionSink, SharedSelectionSink};
pub use stream::{scan_stream, scan_stream_from_bytes, SpineStream};
