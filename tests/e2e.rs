//! End-to-end integration tests for shelfscan.
//!
//! The live tests make real recognition and search calls. They are gated
//! behind the `SHELFSCAN_E2E_ENABLED` environment variable (plus configured
//! hosts) so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   SHELFSCAN_E2E_ENABLED=1 \
//!   SHELFSCAN_GPU_HOST=https://gpu.example.com \
//!   SHELFSCAN_CPU_HOST=https://api.example.com \
//!   SHELFSCAN_E2E_COVER=./my_cover.jpg \
//!   cargo test --test e2e -- --nocapture
//!
//! Everything else in this file runs offline.

use shelfscan::{scan, scan_from_bytes, scan_stream, ScanConfig, ScanError, ScanMode, ScanOutput};
use std::collections::HashSet;
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless SHELFSCAN_E2E_ENABLED is set *and* the env var
/// `$image_var` points at an existing image file.
macro_rules! e2e_skip_unless_ready {
    ($image_var:expr) => {{
        if std::env::var("SHELFSCAN_E2E_ENABLED").is_err() {
            println!("SKIP — set SHELFSCAN_E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let Ok(path) = std::env::var($image_var) else {
            println!("SKIP — set {} to a test image path", $image_var);
            return;
        };
        let p = PathBuf::from(path);
        if !p.exists() {
            println!("SKIP — test image not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Assert the invariants every candidate batch must satisfy.
fn assert_batch_invariants(output: &ScanOutput, context: &str) {
    // No duplicate ISBNs within one batch.
    let mut seen = HashSet::new();
    for c in &output.candidates {
        if !c.isbn.is_empty() {
            assert!(
                seen.insert(c.isbn.clone()),
                "[{context}] duplicate ISBN in batch: {}",
                c.isbn
            );
        }
    }

    // Ids are batch-local and unique.
    let ids: HashSet<_> = output.candidates.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids.len(), output.candidates.len(), "[{context}] duplicate ids");

    // Stats agree with the data they summarise.
    let s = &output.stats;
    assert_eq!(s.candidates_found, output.candidates.len(), "[{context}]");
    assert_eq!(s.spines_total, output.spines.len(), "[{context}]");
    assert_eq!(
        s.spines_searched + s.spines_skipped,
        s.spines_total,
        "[{context}]"
    );
    assert!(s.spines_failed <= s.spines_searched, "[{context}]");

    // Shelf scans cap contributions per spine; cover scans do not.
    if output.is_shelf() {
        for spine in &output.spines {
            assert!(
                spine.found() <= 3,
                "[{context}] spine {} contributed {} candidates",
                spine.spine,
                spine.found()
            );
        }
    }

    println!(
        "[{context}] ✓  {} candidate(s), {} spine(s), invariants hold",
        output.candidates.len(),
        output.spines.len()
    );
}

fn offline_config(mode: ScanMode) -> ScanConfig {
    // Hosts are set explicitly so these tests never depend on the
    // environment; they fail before any request is actually sent.
    ScanConfig::builder()
        .mode(mode)
        .gpu_host("https://gpu.invalid")
        .cpu_host("https://api.invalid")
        .build()
        .unwrap()
}

// ── Offline tests (no network) ───────────────────────────────────────────────

#[tokio::test]
async fn scan_nonexistent_file_is_image_not_found() {
    let err = scan("/definitely/not/a/real/cover.jpg", &offline_config(ScanMode::Cover))
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::ImageNotFound { .. }), "got: {err}");
}

#[tokio::test]
async fn scan_stream_nonexistent_file_is_image_not_found() {
    let err = scan_stream("/definitely/not/a/real/shelf.jpg", &offline_config(ScanMode::Shelf))
        .await
        .err()
        .expect("stream setup must fail");
    assert!(matches!(err, ScanError::ImageNotFound { .. }), "got: {err}");
}

#[tokio::test]
async fn scan_text_file_is_not_an_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cover.jpg");
    std::fs::write(&path, "this is not an image").unwrap();

    let err = scan(path.to_str().unwrap(), &offline_config(ScanMode::Cover))
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::NotAnImage { .. }), "got: {err}");
}

#[tokio::test]
async fn unreachable_recognizer_is_a_fatal_request_error() {
    // A valid image against an unreachable host must surface a typed
    // recognition error, never a panic.
    let img = image::RgbImage::from_pixel(64, 96, image::Rgb([180, 40, 40]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();

    let err = scan_from_bytes(&bytes, &offline_config(ScanMode::Cover))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            ScanError::RecognitionRequest { .. } | ScanError::RecognitionTimeout { .. }
        ),
        "got: {err}"
    );
}

#[test]
fn scan_output_json_round_trips() {
    use shelfscan::{CoverGuess, Recognition, ScanStats};

    let output = ScanOutput {
        candidates: vec![],
        spines: vec![],
        recognition: Recognition::Cover(CoverGuess {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
        }),
        mode: ScanMode::Cover,
        stats: ScanStats::default(),
    };

    let json = serde_json::to_string(&output).unwrap();
    let back: ScanOutput = serde_json::from_str(&json).unwrap();
    assert_eq!(back.mode, ScanMode::Cover);
    assert!(back.candidates.is_empty());
}

// ── Live tests (gated) ───────────────────────────────────────────────────────

#[tokio::test]
async fn live_cover_scan_holds_invariants() {
    let path = e2e_skip_unless_ready!("SHELFSCAN_E2E_COVER");

    let config = ScanConfig::builder().mode(ScanMode::Cover).build().unwrap();
    let output = scan(path.to_str().unwrap(), &config)
        .await
        .expect("cover scan should succeed");

    assert_eq!(output.stats.spines_total, 1);
    assert!(!output.is_shelf());
    assert_batch_invariants(&output, "cover");
}

#[tokio::test]
async fn live_shelf_scan_holds_invariants() {
    let path = e2e_skip_unless_ready!("SHELFSCAN_E2E_SHELF");

    let config = ScanConfig::builder().mode(ScanMode::Shelf).build().unwrap();
    let output = scan(path.to_str().unwrap(), &config)
        .await
        .expect("shelf scan should succeed");

    assert!(output.is_shelf());
    assert_batch_invariants(&output, "shelf");
}

#[tokio::test]
async fn live_shelf_stream_yields_spines_in_order() {
    use futures::StreamExt;

    let path = e2e_skip_unless_ready!("SHELFSCAN_E2E_SHELF");

    let config = ScanConfig::builder().mode(ScanMode::Shelf).build().unwrap();
    let mut stream = scan_stream(path.to_str().unwrap(), &config)
        .await
        .expect("stream setup should succeed");

    let mut expected = 0usize;
    while let Some(item) = stream.next().await {
        match item {
            Ok(spine) => {
                assert_eq!(spine.spine, expected, "spines must arrive in order");
                assert!(spine.found() <= 3);
            }
            Err(e) => {
                assert_eq!(e.spine(), expected, "errors carry their spine index");
            }
        }
        expected += 1;
    }
    assert!(expected > 0, "stream yielded no spines");
}
