//! Candidate resolution: one search request per spine, sequential, with
//! per-spine caps and ISBN deduplication.
//!
//! ## Error policy
//!
//! A failed search is recorded on its spine and the loop continues — a shelf
//! photo where one spine's query times out should still surface the other
//! eleven books. The caller decides whether an all-failed batch is fatal
//! (see [`crate::scan`]).
//!
//! ## Sequencing
//!
//! Requests are issued strictly one at a time. The search host is a small
//! shared service; a twelve-spine shelf must not hit it with twelve
//! concurrent queries on one user action.

use crate::candidate::{ApiBook, Candidate, IdGenerator};
use crate::config::ScanConfig;
use crate::error::SearchError;
use crate::output::SpineResult;
use crate::pipeline::normalize;
use crate::pipeline::recognize::Recognition;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Response envelope of `GET {cpu_host}/books/search`.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ApiBook>,
}

/// One normalized spine awaiting resolution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SpinePlan {
    pub spine: usize,
    pub title: String,
    pub author: String,
    /// Both guesses empty after normalization — no search will be issued.
    pub skip: bool,
}

/// Normalize recognition output into per-spine search plans.
///
/// A spine is skipped only when BOTH fields are empty; a pair with one
/// missing field is still worth searching.
pub(crate) fn plan_spines(recognition: &Recognition) -> Vec<SpinePlan> {
    recognition
        .pairs()
        .into_iter()
        .enumerate()
        .map(|(i, (raw_title, raw_author))| {
            let title = normalize::clean_guess(&raw_title);
            let author = normalize::clean_author(&raw_author);
            let skip = title.is_empty() && author.is_empty();
            SpinePlan {
                spine: i,
                title,
                author,
                skip,
            }
        })
        .collect()
}

/// Build the search endpoint URL.
pub(crate) fn search_url(cpu_host: &str) -> String {
    format!("{}/books/search", cpu_host.trim_end_matches('/'))
}

/// Query parameters for a spine: only non-empty fields are sent.
pub(crate) fn query_params(title: &str, author: &str) -> Vec<(&'static str, String)> {
    let mut params = Vec::with_capacity(2);
    if !title.is_empty() {
        params.push(("title", title.to_string()));
    }
    if !author.is_empty() {
        params.push(("author", author.to_string()));
    }
    params
}

/// `true` when the batch already contains this ISBN.
///
/// Hits without an ISBN are never treated as duplicates of each other —
/// dropping two distinct no-ISBN results as "duplicates" would hide books.
pub(crate) fn contains_isbn(batch: &[Candidate], isbn: &str) -> bool {
    !isbn.is_empty() && batch.iter().any(|c| c.isbn == isbn)
}

/// Search the CPU host for one spine's title/author pair.
pub async fn search_pair(
    client: &reqwest::Client,
    config: &ScanConfig,
    cpu_host: &str,
    spine: usize,
    title: &str,
    author: &str,
) -> Result<Vec<ApiBook>, SearchError> {
    let url = search_url(cpu_host);
    let params = query_params(title, author);
    debug!("Spine {}: searching {:?}", spine, params);

    let response = client
        .get(&url)
        .query(&params)
        .timeout(Duration::from_secs(config.search_timeout_secs))
        .send()
        .await
        .map_err(|e| SearchError::Request {
            spine,
            detail: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        warn!("Spine {}: search returned HTTP {} — {}", spine, status, detail);
        return Err(SearchError::Status {
            spine,
            status: status.as_u16(),
            detail,
        });
    }

    let body: SearchResponse = response.json().await.map_err(|e| SearchError::Malformed {
        spine,
        detail: e.to_string(),
    })?;
    Ok(body.results)
}

/// Result of resolving a whole recognition batch.
#[derive(Debug)]
pub struct ResolvedBatch {
    pub candidates: Vec<Candidate>,
    pub spines: Vec<SpineResult>,
    pub duplicates_dropped: usize,
}

/// Resolve every spine sequentially into a deduplicated candidate batch.
///
/// Shelf scans keep at most [`ScanConfig::max_per_spine`] hits per spine;
/// cover scans keep everything. Within one batch no two candidates share an
/// ISBN — later hits with an already-seen ISBN are dropped and counted.
pub async fn resolve_candidates(
    client: &reqwest::Client,
    config: &ScanConfig,
    cpu_host: &str,
    recognition: &Recognition,
) -> ResolvedBatch {
    let plans = plan_spines(recognition);
    let total = plans.len();
    let limit = if config.mode.is_shelf() {
        config.max_per_spine
    } else {
        usize::MAX
    };

    let mut ids = IdGenerator::new();
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut spines: Vec<SpineResult> = Vec::with_capacity(total);
    let mut duplicates_dropped = 0usize;

    for plan in plans {
        if let Some(ref sink) = config.selection_sink {
            sink.on_spine_start(plan.spine, total);
        }

        if plan.skip {
            debug!("Spine {}: empty guesses, skipping search", plan.spine);
            spines.push(SpineResult {
                spine: plan.spine,
                title: plan.title,
                author: plan.author,
                skipped: true,
                candidates: Vec::new(),
                error: None,
            });
            continue;
        }

        match search_pair(client, config, cpu_host, plan.spine, &plan.title, &plan.author).await {
            Ok(books) => {
                let mut contributed = Vec::new();
                for book in books.into_iter().take(limit) {
                    if contains_isbn(&candidates, &book.isbn) {
                        duplicates_dropped += 1;
                        continue;
                    }
                    let candidate = Candidate::from_api(book, ids.next_id());
                    candidates.push(candidate.clone());
                    contributed.push(candidate);
                }
                if let Some(ref sink) = config.selection_sink {
                    sink.on_spine_resolved(plan.spine, total, contributed.len());
                }
                spines.push(SpineResult {
                    spine: plan.spine,
                    title: plan.title,
                    author: plan.author,
                    skipped: false,
                    candidates: contributed,
                    error: None,
                });
            }
            Err(e) => {
                warn!("Spine {}: continuing after failed search: {}", plan.spine, e);
                if let Some(ref sink) = config.selection_sink {
                    sink.on_spine_error(plan.spine, total, &e.to_string());
                }
                spines.push(SpineResult {
                    spine: plan.spine,
                    title: plan.title,
                    author: plan.author,
                    skipped: false,
                    candidates: Vec::new(),
                    error: Some(e),
                });
            }
        }
    }

    ResolvedBatch {
        candidates,
        spines,
        duplicates_dropped,
    }
}
