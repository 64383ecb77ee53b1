use std::{sync::Arc, time::Duration};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::{
    task::JoinHandle,
    time::{sleep, sleep_until, Instant},
};

use crate::{
    api::PostFetcher,
    classifier::Classifier,
    domain::FetchDescriptor,
    infrastructure::{notifier::Notifier, shutdown::ShutdownListener},
    tasks::queue::{QueueSnapshot, WorkQueue},
};

/// Drains the work queue one descriptor at a time: fetch, classify, alert, honour backoff.
///
/// Any number of producers may call [`QueueProcessor::submit`]; at most one drain task runs.
pub struct QueueProcessor {
    queue: WorkQueue<FetchDescriptor>,
    fetcher: Arc<dyn PostFetcher>,
    classifier: Arc<Classifier>,
    notifier: Arc<dyn Notifier>,
    shutdown: ShutdownListener,
    next_fetch_at: Mutex<Option<Instant>>,
    drain_handle: Mutex<Option<JoinHandle<()>>>,
}

impl QueueProcessor {
    pub fn new(
        fetcher: Arc<dyn PostFetcher>,
        classifier: Arc<Classifier>,
        notifier: Arc<dyn Notifier>,
        shutdown: ShutdownListener,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue: WorkQueue::new(),
            fetcher,
            classifier,
            notifier,
            shutdown,
            next_fetch_at: Mutex::new(None),
            drain_handle: Mutex::new(None),
        })
    }

    pub fn submit(self: &Arc<Self>, descriptor: FetchDescriptor) {
        tracing::debug!(
            target: "queue",
            site = %descriptor.site,
            post_id = descriptor.post_id,
            kind = descriptor.kind.label(),
            "queued"
        );
        self.queue.push(descriptor);
        self.trigger_drain();
    }

    /// Starts a drain task unless one is already running.
    pub fn trigger_drain(self: &Arc<Self>) {
        // claim and store under the handle lock so a claimed queue always has its handle
        let mut slot = self.drain_handle.lock();
        if !self.queue.try_claim() {
            return;
        }
        let this = Arc::clone(self);
        *slot = Some(tokio::spawn(async move { this.drain().await }));
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.queue.snapshot()
    }

    /// Waits until no drain task is running.
    pub async fn wait_idle(&self) {
        loop {
            let handle = {
                let mut slot = self.drain_handle.lock();
                match slot.take() {
                    Some(handle) => Some(handle),
                    None if !self.queue.snapshot().draining => return,
                    None => None,
                }
            };
            match handle {
                Some(handle) => {
                    if let Err(err) = handle.await {
                        if err.is_panic() {
                            tracing::error!(target: "queue", "drain task panicked");
                        }
                    }
                }
                // another waiter took the handle
                None => sleep(Duration::from_millis(5)).await,
            }
        }
    }

    async fn drain(&self) {
        let _claim = ClaimGuard(&self.queue);
        let mut shutdown = self.shutdown.clone();
        let mut processed = 0usize;

        loop {
            if shutdown.is_triggered() {
                self.queue.release();
                tracing::info!(
                    target: "queue",
                    processed,
                    abandoned = self.queue.snapshot().pending,
                    "drain stopped for shutdown"
                );
                return;
            }
            if !self.wait_for_backoff(&mut shutdown).await {
                continue;
            }
            let Some(descriptor) = self.queue.next_or_release() else {
                break;
            };
            self.process(descriptor).await;
            processed += 1;
        }

        tracing::debug!(target: "queue", processed, "queue drained");
    }

    /// Returns `false` when shutdown interrupted the wait.
    async fn wait_for_backoff(&self, shutdown: &mut ShutdownListener) -> bool {
        let deadline = *self.next_fetch_at.lock();
        let Some(deadline) = deadline else {
            return true;
        };
        if deadline <= Instant::now() {
            return true;
        }
        tokio::select! {
            _ = sleep_until(deadline) => true,
            _ = shutdown.cancelled() => false,
        }
    }

    async fn process(&self, descriptor: FetchDescriptor) {
        let waited_ms = (Utc::now() - descriptor.queued_at).num_milliseconds();
        tracing::info!(
            target: "queue",
            site = %descriptor.site,
            post_id = descriptor.post_id,
            kind = descriptor.kind.label(),
            waited_ms,
            pending = self.queue.snapshot().pending,
            "fetching"
        );

        let outcome = self.fetcher.fetch(&descriptor).await;

        if let Some(post) = outcome.post {
            tracing::debug!(
                target: "queue",
                post = %serde_json::to_string(&post).unwrap_or_default(),
                "fetched"
            );
            match self.classifier.classify(&post) {
                Some(reason) => {
                    tracing::info!(
                        target: "queue",
                        reason,
                        permalink = %post.permalink,
                        reputation = post.author_reputation,
                        "post flagged"
                    );
                    self.notifier.notify(reason, &post.permalink).await;
                }
                None => {
                    tracing::debug!(target: "queue", permalink = %post.permalink, "post clean");
                }
            }
        }

        if let Some(backoff) = outcome.backoff {
            tracing::info!(
                target: "queue",
                backoff_secs = backoff.as_secs(),
                "API requested backoff before the next request"
            );
            *self.next_fetch_at.lock() = Some(Instant::now() + backoff);
        }
    }
}

/// Frees the drain claim if the drain task unwinds.
struct ClaimGuard<'a>(&'a WorkQueue<FetchDescriptor>);

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.release();
        }
    }
}
