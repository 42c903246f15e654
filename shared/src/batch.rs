//! Bounded-concurrency fan-out over a set of documents.
//!
//! Batch parallelism is independent of, and larger than, the oracle's own
//! admission gate; excess calls simply queue behind it. One document's
//! failure never cancels the others.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::{stream, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::CacheStore;
use crate::dto::{BatchOutcome, BatchReport, Document, DocumentStatus, FailureInfo};
use crate::orchestrator::Orchestrator;
use crate::retry::with_retry;

/// Live progress over the current batch; `completed` only ever grows while
/// a batch runs, regardless of completion order.
#[derive(Debug, Default)]
pub struct BatchProgress {
    completed: AtomicUsize,
    total: AtomicUsize,
}

impl BatchProgress {
    pub fn snapshot(&self) -> (usize, usize) {
        (
            self.completed.load(Ordering::SeqCst),
            self.total.load(Ordering::SeqCst),
        )
    }

    fn start(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
    }

    fn tick(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct BatchRunner {
    orchestrator: Arc<Orchestrator>,
    cache: Arc<CacheStore>,
    max_parallel: usize,
    progress: Arc<BatchProgress>,
}

impl BatchRunner {
    pub fn new(orchestrator: Arc<Orchestrator>, cache: Arc<CacheStore>, max_parallel: usize) -> Self {
        Self {
            orchestrator,
            cache,
            max_parallel: max_parallel.max(1),
            progress: Arc::new(BatchProgress::default()),
        }
    }

    pub fn progress(&self) -> Arc<BatchProgress> {
        Arc::clone(&self.progress)
    }

    pub fn cache(&self) -> Arc<CacheStore> {
        Arc::clone(&self.cache)
    }

    /// Evaluate all documents, capturing every outcome individually, then
    /// flush the cache once for the whole batch.
    pub async fn run(&self, documents: Vec<Document>, force_rerun: bool) -> BatchReport {
        let batch_id = Uuid::new_v4();
        info!(
            %batch_id,
            documents = documents.len(),
            force_rerun,
            max_parallel = self.max_parallel,
            "batch start"
        );
        self.progress.start(documents.len());

        let futs = documents.into_iter().map(|doc| {
            let orchestrator = Arc::clone(&self.orchestrator);
            let cache = Arc::clone(&self.cache);
            let progress = Arc::clone(&self.progress);
            async move {
                let outcome = orchestrator.evaluate(&doc, force_rerun, &cache).await;
                progress.tick();
                outcome
            }
        });

        let outcomes: Vec<BatchOutcome> = stream::iter(futs)
            .buffer_unordered(self.max_parallel)
            .collect()
            .await;

        let mut failures: Vec<FailureInfo> = outcomes
            .iter()
            .filter_map(|o| o.failure.clone())
            .collect();

        self.cache
            .set_meta("last_batch", serde_json::json!(batch_id.to_string()));
        if let Err(e) = with_retry("cache_save", 2, 10_000, || self.cache.save()).await {
            warn!(error = %e, "cache flush failed after batch");
            failures.push(FailureInfo::from_error(
                &e,
                &self.cache.path().display().to_string(),
            ));
        }

        let report = BatchReport {
            batch_id,
            outcomes,
            failures,
        };
        info!(
            %batch_id,
            done = report.count(DocumentStatus::Done),
            skipped = report.count(DocumentStatus::Skipped),
            failed = report.count(DocumentStatus::Failed),
            "batch complete"
        );
        report
    }
}
