//! Recognition client: upload the image payload and parse title/author
//! guesses.
//!
//! This is the single most expensive call of a scan — the GPU host runs a
//! vision model over the photo. It is also the one call a scan cannot
//! survive losing: with no guesses there is nothing to search for, so any
//! failure here is fatal for the action ([`ScanError`], not a per-spine
//! error). One attempt per user action; a bad photo should be retaken, not
//! retried.

use crate::config::{ScanConfig, ScanMode};
use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

/// Cover-scan response: one guess for the single book in frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverGuess {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
}

/// Shelf-scan response: index-aligned guess lists, one entry per detected
/// spine. `authors` may be shorter than `titles`; a missing entry means the
/// recognizer saw no author on that spine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShelfGuess {
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
}

/// What the recognizer reported for an uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Recognition {
    Cover(CoverGuess),
    Shelf(ShelfGuess),
}

impl Recognition {
    /// Raw (title, author) pairs in spine order.
    ///
    /// A cover scan yields exactly one pair. For shelf scans the author list
    /// is padded with empty strings up to the title count, so pairs stay
    /// index-aligned even when the recognizer returned ragged lists.
    pub fn pairs(&self) -> Vec<(String, String)> {
        match self {
            Recognition::Cover(guess) => vec![(guess.title.clone(), guess.author.clone())],
            Recognition::Shelf(guess) => guess
                .titles
                .iter()
                .enumerate()
                .map(|(i, title)| {
                    let author = guess.authors.get(i).cloned().unwrap_or_default();
                    (title.clone(), author)
                })
                .collect(),
        }
    }

    /// Number of spines (1 for a cover scan).
    pub fn spine_count(&self) -> usize {
        match self {
            Recognition::Cover(_) => 1,
            Recognition::Shelf(guess) => guess.titles.len(),
        }
    }
}

/// Build the recognition endpoint URL for a mode.
///
/// The host may be configured with or without a trailing slash.
/// `nosearch=false` keeps server-side search disabled; resolution happens
/// client-side where the dedup policy lives.
pub(crate) fn recognition_url(gpu_host: &str, mode: ScanMode) -> String {
    format!(
        "{}/books/{}?nosearch=false",
        gpu_host.trim_end_matches('/'),
        mode.endpoint()
    )
}

/// POST the payload to the mode-specific recognition endpoint.
///
/// 2xx → parsed guesses. Non-2xx → [`ScanError::RecognitionFailed`] with
/// the status and body logged for the operator.
pub async fn recognize(
    client: &reqwest::Client,
    config: &ScanConfig,
    gpu_host: &str,
    payload: Vec<u8>,
) -> Result<Recognition, ScanError> {
    let url = recognition_url(gpu_host, config.mode);
    debug!("Uploading {} bytes to {}", payload.len(), url);

    let response = client
        .post(&url)
        .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
        .timeout(Duration::from_secs(config.upload_timeout_secs))
        .body(payload)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ScanError::RecognitionTimeout {
                    secs: config.upload_timeout_secs,
                }
            } else {
                ScanError::RecognitionRequest {
                    reason: e.to_string(),
                }
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!("Recognition rejected: HTTP {} — {}", status, body);
        return Err(ScanError::RecognitionFailed {
            status: status.as_u16(),
            body,
        });
    }

    let recognition = match config.mode {
        ScanMode::Cover => response
            .json::<CoverGuess>()
            .await
            .map(Recognition::Cover),
        ScanMode::Shelf => response
            .json::<ShelfGuess>()
            .await
            .map(Recognition::Shelf),
    }
    .map_err(|e| ScanError::MalformedRecognition {
        detail: e.to_string(),
    })?;

    info!(
        "Recognition returned {} spine(s) for a {} scan",
        recognition.spine_count(),
        config.mode
    );
    Ok(recognition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_handles_trailing_slash() {
        assert_eq!(
            recognition_url("https://gpu.example.com/", ScanMode::Cover),
            "https://gpu.example.com/books/scan_cover?nosearch=false"
        );
        assert_eq!(
            recognition_url("https://gpu.example.com", ScanMode::Shelf),
            "https://gpu.example.com/books/scan_shelf?nosearch=false"
        );
    }

    #[test]
    fn cover_pairs_yield_one_entry() {
        let r = Recognition::Cover(CoverGuess {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
        });
        assert_eq!(r.pairs(), vec![("Dune".into(), "Frank Herbert".into())]);
        assert_eq!(r.spine_count(), 1);
    }

    #[test]
    fn shelf_pairs_pad_ragged_author_lists() {
        let r = Recognition::Shelf(ShelfGuess {
            titles: vec!["Dune".into(), "Hyperion".into(), "Solaris".into()],
            authors: vec!["Frank Herbert".into()],
        });
        let pairs = r.pairs();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[1], ("Hyperion".into(), String::new()));
        assert_eq!(pairs[2], ("Solaris".into(), String::new()));
    }

    #[test]
    fn guesses_deserialize_with_missing_fields() {
        let cover: CoverGuess = serde_json::from_str(r#"{"title": "Dune"}"#).unwrap();
        assert_eq!(cover.title, "Dune");
        assert!(cover.author.is_empty());

        let shelf: ShelfGuess = serde_json::from_str(r#"{}"#).unwrap();
        assert!(shelf.titles.is_empty());
        assert!(shelf.authors.is_empty());
    }
}
