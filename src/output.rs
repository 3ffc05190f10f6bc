//! Scan output types: per-spine results, batch statistics, and the final
//! candidate batch handed to the selection collaborator.

use crate::candidate::Candidate;
use crate::config::ScanMode;
use crate::error::{ScanError, SearchError};
use crate::pipeline::recognize::Recognition;
use serde::{Deserialize, Serialize};

/// Outcome of one recognized title/author pair.
///
/// A cover scan produces exactly one spine; a shelf scan produces one per
/// detected book. A spine is `skipped` when both the title and author guess
/// were empty after normalization — no search is issued for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpineResult {
    /// 0-indexed position within the recognition output.
    pub spine: usize,
    /// Title guess after normalization (may be empty).
    pub title: String,
    /// Author guess after normalization (may be empty).
    pub author: String,
    /// `true` when no search was issued because both guesses were empty.
    pub skipped: bool,
    /// Candidates this spine contributed to the batch, deduplicated against
    /// everything contributed before it.
    pub candidates: Vec<Candidate>,
    /// Set when the search for this spine failed; the scan continued.
    pub error: Option<SearchError>,
}

impl SpineResult {
    /// Number of candidates this spine contributed.
    pub fn found(&self) -> usize {
        self.candidates.len()
    }
}

/// Statistics for one scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    /// Spines the recognizer reported.
    pub spines_total: usize,
    /// Spines for which a search was issued.
    pub spines_searched: usize,
    /// Spines skipped because both guesses were empty.
    pub spines_skipped: usize,
    /// Spines whose search failed.
    pub spines_failed: usize,
    /// Candidates in the final deduplicated batch.
    pub candidates_found: usize,
    /// Search hits dropped because their ISBN was already in the batch.
    pub duplicates_dropped: usize,
    /// Wall time of the image upload + recognition call.
    pub upload_duration_ms: u64,
    /// Wall time of the sequential search loop.
    pub search_duration_ms: u64,
    /// Wall time of the whole scan.
    pub total_duration_ms: u64,
}

/// Everything a scan produced.
///
/// Returned by the `scan*` entry points even when some spines failed —
/// check [`ScanStats::spines_failed`], or call [`ScanOutput::into_result`]
/// to turn partial failure into an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutput {
    /// The deduplicated candidate batch, in spine order.
    pub candidates: Vec<Candidate>,
    /// Per-spine outcomes, in recognition order.
    pub spines: Vec<SpineResult>,
    /// What the recognizer said, after guess normalization.
    pub recognition: Recognition,
    /// Mode the scan ran in.
    pub mode: ScanMode,
    pub stats: ScanStats,
}

impl ScanOutput {
    /// `true` when this batch came from a shelf scan.
    pub fn is_shelf(&self) -> bool {
        self.mode.is_shelf()
    }

    /// `true` when the scan produced no candidates at all.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Treat any spine failure as an error.
    ///
    /// Callers that cannot present a partial batch (e.g. batch importers)
    /// use this instead of inspecting stats.
    pub fn into_result(self) -> Result<Self, ScanError> {
        if self.stats.spines_failed > 0 {
            return Err(ScanError::PartialSearchFailure {
                success: self.stats.spines_searched - self.stats.spines_failed,
                failed: self.stats.spines_failed,
                total: self.stats.spines_total,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::recognize::{CoverGuess, Recognition};

    fn output_with_failures(failed: usize) -> ScanOutput {
        ScanOutput {
            candidates: vec![],
            spines: vec![],
            recognition: Recognition::Cover(CoverGuess {
                title: "Dune".into(),
                author: "Frank Herbert".into(),
            }),
            mode: ScanMode::Cover,
            stats: ScanStats {
                spines_total: 3,
                spines_searched: 3,
                spines_failed: failed,
                ..ScanStats::default()
            },
        }
    }

    #[test]
    fn into_result_passes_clean_scans() {
        assert!(output_with_failures(0).into_result().is_ok());
    }

    #[test]
    fn into_result_rejects_partial_failure() {
        let err = output_with_failures(1).into_result().unwrap_err();
        match err {
            ScanError::PartialSearchFailure {
                success,
                failed,
                total,
            } => {
                assert_eq!(success, 2);
                assert_eq!(failed, 1);
                assert_eq!(total, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn spine_found_counts_candidates() {
        let spine = SpineResult {
            spine: 0,
            title: "Dune".into(),
            author: String::new(),
            skipped: false,
            candidates: vec![],
            error: None,
        };
        assert_eq!(spine.found(), 0);
    }
}
