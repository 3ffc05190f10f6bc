//! Pipeline stages for image-to-candidates scanning.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different upload format) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ recognize ──▶ normalize ──▶ search
//! (path/URL) (JPEG)    (GPU host)    (cleanup)     (CPU host, dedup)
//! ```
//!
//! 1. [`input`]     — canonicalise the user-supplied path or URL to raw bytes
//! 2. [`encode`]    — downscale and re-encode as JPEG to bound the upload;
//!    runs in `spawn_blocking` because image codecs are CPU-bound
//! 3. [`recognize`] — POST the payload to the mode-specific recognition
//!    endpoint and parse the title/author guesses
//! 4. [`normalize`] — deterministic text cleanup of OCR-ish guesses before
//!    they become query parameters
//! 5. [`search`]    — one search request per spine, sequential, with
//!    per-spine caps and ISBN deduplication; the only stage that tolerates
//!    partial failure

pub mod encode;
pub mod input;
pub mod normalize;
pub mod recognize;
pub mod search;
