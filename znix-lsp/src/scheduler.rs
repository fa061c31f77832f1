//! Debounced external checks, one pending timer per document.
//!
//! Every `schedule` call stamps the document with a fresh generation and
//! replaces the document's pending timer. When a timer fires, its job is
//! spawned as a task of its own, so later edits never interrupt a check
//! that is already running. Jobs receive their generation and should only
//! publish while [`CheckScheduler::is_current`] still holds for it.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tower_lsp::lsp_types::Url;

#[derive(Debug, Default)]
pub struct CheckScheduler {
    /// Timers that have not fired yet (or just fired)
    pending: DashMap<Url, JoinHandle<()>>,
    /// Latest generation handed out per document
    generations: DashMap<Url, u64>,
    /// Shared across documents so a reopened document never reuses an old
    /// generation
    counter: AtomicU64,
}

impl CheckScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` after `delay` unless `uri` is scheduled again or cancelled
    /// first. Returns the generation the job will receive.
    pub fn schedule<F, Fut>(&self, uri: Url, delay: Duration, job: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.generations.insert(uri.clone(), generation);

        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::trace!(generation, "check timer fired");
            drop(tokio::spawn(job(generation)));
        });

        if let Some(previous) = self.pending.insert(uri, timer) {
            previous.abort();
        }
        tracing::debug!(generation, ?delay, "external check scheduled");
        generation
    }

    /// Drop the pending timer of `uri` and invalidate any check in flight.
    pub fn cancel_pending(&self, uri: &Url) {
        if let Some((_, timer)) = self.pending.remove(uri) {
            timer.abort();
        }
        self.generations.remove(uri);
        tracing::debug!(%uri, "pending check cancelled");
    }

    /// Whether `generation` is still the latest scheduled for `uri`.
    #[must_use]
    pub fn is_current(&self, uri: &Url, generation: u64) -> bool {
        self.generations
            .get(uri)
            .is_some_and(|latest| *latest == generation)
    }
}
