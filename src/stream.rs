//! Streaming scan API: emit spine results as they resolve.
//!
//! ## Why stream?
//!
//! A twelve-spine shelf takes a dozen sequential searches. A stream-based
//! API lets callers fill the selection UI as each spine resolves instead of
//! staring at a spinner until the whole batch is done.
//!
//! Unlike the eager [`crate::scan::scan`] which returns only after every
//! spine finishes, [`scan_stream`] yields one item per spine, in spine
//! order — searches stay strictly sequential, so items arrive in order by
//! construction. ISBN deduplication spans the whole stream: a spine's
//! candidates exclude ISBNs already emitted by earlier spines.

use crate::candidate::{Candidate, IdGenerator};
use crate::config::ScanConfig;
use crate::error::{ScanError, SearchError};
use crate::output::SpineResult;
use crate::pipeline::search::{self, SpinePlan};
use crate::pipeline::{encode, input, recognize};
use crate::scan::resolve_hosts;
use futures::stream;
use std::collections::VecDeque;
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of spine results.
pub type SpineStream = Pin<Box<dyn Stream<Item = Result<SpineResult, SearchError>> + Send>>;

/// Everything one spine resolution needs, carried between stream items.
struct StreamState {
    client: reqwest::Client,
    config: ScanConfig,
    cpu_host: String,
    plans: VecDeque<SpinePlan>,
    total: usize,
    limit: usize,
    seen_isbns: Vec<String>,
    ids: IdGenerator,
}

/// Scan an image, streaming spine results as they resolve.
///
/// The upload and recognition happen before this function returns; the
/// per-spine searches run lazily as the stream is polled. Dropping the
/// stream cancels any remaining searches.
///
/// # Returns
/// - `Ok(SpineStream)` — a stream of `Result<SpineResult, SearchError>`
/// - `Err(ScanError)` — fatal error (unreadable image, recognition
///   rejected, hosts not configured)
pub async fn scan_stream(
    input_str: impl AsRef<str>,
    config: &ScanConfig,
) -> Result<SpineStream, ScanError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming {} scan: {}", config.mode, input_str);

    let bytes = input::resolve_input(input_str, config.download_timeout_secs).await?;
    scan_stream_from_bytes(&bytes, config).await
}

/// Streaming equivalent of [`crate::scan::scan_from_bytes`].
pub async fn scan_stream_from_bytes(
    bytes: &[u8],
    config: &ScanConfig,
) -> Result<SpineStream, ScanError> {
    let (gpu_host, cpu_host) = resolve_hosts(config)?;

    let encode_config = config.clone();
    let owned = bytes.to_vec();
    let payload =
        tokio::task::spawn_blocking(move || encode::prepare_payload(&owned, &encode_config))
            .await
            .map_err(|e| ScanError::Internal(format!("encode task: {e}")))??;

    let client = reqwest::Client::builder()
        .build()
        .map_err(|e| ScanError::Internal(format!("HTTP client: {e}")))?;

    if let Some(ref sink) = config.selection_sink {
        sink.on_scan_start(config.mode);
    }

    let recognition = recognize::recognize(&client, config, &gpu_host, payload).await?;
    if let Some(ref sink) = config.selection_sink {
        sink.on_recognition_complete(recognition.spine_count());
    }

    let plans: VecDeque<SpinePlan> = search::plan_spines(&recognition).into();
    let total = plans.len();
    let limit = if config.mode.is_shelf() {
        config.max_per_spine
    } else {
        usize::MAX
    };

    let state = StreamState {
        client,
        config: config.clone(),
        cpu_host,
        plans,
        total,
        limit,
        seen_isbns: Vec::new(),
        ids: IdGenerator::new(),
    };

    let s = stream::unfold(state, |mut st| async move {
        let plan = st.plans.pop_front()?;
        let item = resolve_spine(&mut st, plan).await;
        Some((item, st))
    });

    Ok(Box::pin(s))
}

async fn resolve_spine(
    st: &mut StreamState,
    plan: SpinePlan,
) -> Result<SpineResult, SearchError> {
    if let Some(ref sink) = st.config.selection_sink {
        sink.on_spine_start(plan.spine, st.total);
    }

    if plan.skip {
        return Ok(SpineResult {
            spine: plan.spine,
            title: plan.title,
            author: plan.author,
            skipped: true,
            candidates: Vec::new(),
            error: None,
        });
    }

    let books = search::search_pair(
        &st.client,
        &st.config,
        &st.cpu_host,
        plan.spine,
        &plan.title,
        &plan.author,
    )
    .await;

    match books {
        Ok(books) => {
            let mut contributed: Vec<Candidate> = Vec::new();
            for book in books.into_iter().take(st.limit) {
                if !book.isbn.is_empty() {
                    if st.seen_isbns.iter().any(|s| s == &book.isbn) {
                        continue;
                    }
                    st.seen_isbns.push(book.isbn.clone());
                }
                contributed.push(Candidate::from_api(book, st.ids.next_id()));
            }
            if let Some(ref sink) = st.config.selection_sink {
                sink.on_spine_resolved(plan.spine, st.total, contributed.len());
            }
            Ok(SpineResult {
                spine: plan.spine,
                title: plan.title,
                author: plan.author,
                skipped: false,
                candidates: contributed,
                error: None,
            })
        }
        Err(e) => {
            if let Some(ref sink) = st.config.selection_sink {
                sink.on_spine_error(plan.spine, st.total, &e.to_string());
            }
            Err(e)
        }
    }
}
