//! Selection handoff: notify an external collaborator as a scan progresses
//! and hand it the finished candidate batch.
//!
//! Inject an [`Arc<dyn SelectionSink>`] via
//! [`crate::config::ScanConfigBuilder::selection_sink`] to receive lifecycle
//! events and, once the batch is fully assembled, the
//! [`SelectionSink::on_selection_start`] handoff.
//!
//! # Why a sink trait instead of channels?
//!
//! The trait is the least-invasive integration point: callers can forward
//! events to a UI state store, a terminal progress bar, or a test recorder —
//! without the library knowing anything about how the host application
//! communicates. The trait is `Send + Sync` so the same sink can be shared
//! with other tasks while a scan runs.
//!
//! # Readiness, not timing
//!
//! `on_selection_start` fires exactly once per scan that produced candidates,
//! strictly after the batch is deduplicated and stats are computed. Callers
//! can open their selection UI directly from the callback; there is no delay
//! to wait out and no race to paper over.

use crate::candidate::Candidate;
use crate::config::ScanMode;
use std::sync::Arc;

/// Called by the scan pipeline as it progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Spines are resolved strictly sequentially, so the
/// per-spine methods are never called concurrently for the same scan.
pub trait SelectionSink: Send + Sync {
    /// Called once, after the upload payload is ready and before the
    /// recognition request is sent.
    fn on_scan_start(&self, mode: ScanMode) {
        let _ = mode;
    }

    /// Called when the recognizer responded, with the number of spines it
    /// reported (1 for a cover scan).
    fn on_recognition_complete(&self, spines_total: usize) {
        let _ = spines_total;
    }

    /// Called just before the search request for a spine is sent (or the
    /// spine is skipped).
    fn on_spine_start(&self, spine: usize, total: usize) {
        let _ = (spine, total);
    }

    /// Called when a spine's search succeeded.
    ///
    /// `found` is the number of candidates the spine contributed after the
    /// per-spine cap and ISBN deduplication.
    fn on_spine_resolved(&self, spine: usize, total: usize, found: usize) {
        let _ = (spine, total, found);
    }

    /// Called when a spine's search failed; the scan continues with the
    /// remaining spines.
    fn on_spine_error(&self, spine: usize, total: usize, error: &str) {
        let _ = (spine, total, error);
    }

    /// The handoff: the batch is complete and the user should now choose.
    ///
    /// Fires only when at least one candidate was found.
    fn on_selection_start(&self, candidates: &[Candidate], is_shelf: bool) {
        let _ = (candidates, is_shelf);
    }
}

/// A no-op implementation for callers that don't need handoff events.
///
/// This is the default when no sink is configured.
pub struct NoopSelectionSink;

impl SelectionSink for NoopSelectionSink {}

/// Convenience alias matching the type stored in [`crate::config::ScanConfig`].
pub type SharedSelectionSink = Arc<dyn SelectionSink>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingSink {
        starts: AtomicUsize,
        resolved: AtomicUsize,
        errors: AtomicUsize,
        handoffs: AtomicUsize,
        handoff_size: AtomicUsize,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                starts: AtomicUsize::new(0),
                resolved: AtomicUsize::new(0),
                errors: AtomicUsize::new(0),
                handoffs: AtomicUsize::new(0),
                handoff_size: AtomicUsize::new(0),
            }
        }
    }

    impl SelectionSink for RecordingSink {
        fn on_spine_start(&self, _spine: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_spine_resolved(&self, _spine: usize, _total: usize, _found: usize) {
            self.resolved.fetch_add(1, Ordering::SeqCst);
        }

        fn on_spine_error(&self, _spine: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_selection_start(&self, candidates: &[Candidate], _is_shelf: bool) {
            self.handoffs.fetch_add(1, Ordering::SeqCst);
            self.handoff_size.store(candidates.len(), Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_sink_does_not_panic() {
        let sink = NoopSelectionSink;
        sink.on_scan_start(ScanMode::Shelf);
        sink.on_recognition_complete(4);
        sink.on_spine_start(0, 4);
        sink.on_spine_resolved(0, 4, 2);
        sink.on_spine_error(1, 4, "HTTP 500");
        sink.on_selection_start(&[], true);
    }

    #[test]
    fn recording_sink_receives_events() {
        let sink = RecordingSink::new();
        sink.on_spine_start(0, 2);
        sink.on_spine_resolved(0, 2, 3);
        sink.on_spine_start(1, 2);
        sink.on_spine_error(1, 2, "HTTP 502");
        sink.on_selection_start(&[], true);

        assert_eq!(sink.starts.load(Ordering::SeqCst), 2);
        assert_eq!(sink.resolved.load(Ordering::SeqCst), 1);
        assert_eq!(sink.errors.load(Ordering::SeqCst), 1);
        assert_eq!(sink.handoffs.load(Ordering::SeqCst), 1);
        assert_eq!(sink.handoff_size.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arc_dyn_sink_works() {
        let sink: SharedSelectionSink = Arc::new(NoopSelectionSink);
        sink.on_scan_start(ScanMode::Cover);
        sink.on_selection_start(&[], false);
    }
}
