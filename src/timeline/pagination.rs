use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::record::{ChannelId, MessageRecord};
use super::store::TimelineStore;
use crate::client::ChatClient;
use crate::error::{ClientError, TimelineError};

/// Run on the store once a fetch has been merged, e.g. to snap to bottom
/// after the first page.
pub type Completion = Box<dyn FnOnce(&mut TimelineStore)>;

struct FetchResult {
    generation: u64,
    channels: Vec<ChannelId>,
    result: Result<Vec<MessageRecord>, ClientError>,
}

/// What happened when a finished fetch was applied to the store.
#[derive(Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Merged { fetched: usize, added: usize },
    /// Nothing older exists; the sentinel is now at the top.
    Exhausted,
    Failed(ClientError),
    /// The channel set changed while the fetch was in flight; its results
    /// were dropped.
    Stale,
}

/// Backward pagination over the active channel set with at most one fetch
/// in flight per store.
///
/// Fetches run as tokio tasks. Their results come back over a channel and
/// are only applied by [`PaginationController::poll`] or
/// [`PaginationController::next_outcome`], both called from the loop that
/// owns the store.
pub struct PaginationController {
    client: Arc<dyn ChatClient>,
    page_size: usize,
    tx: mpsc::UnboundedSender<FetchResult>,
    rx: mpsc::UnboundedReceiver<FetchResult>,
    pending: Option<(u64, Completion)>,
    dispatched: usize,
}

impl PaginationController {
    pub fn new(client: Arc<dyn ChatClient>, page_size: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            page_size: page_size.max(1),
            tx,
            rx,
            pending: None,
            dispatched: 0,
        }
    }

    /// Number of fetches handed to the client so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Fetch the page before `before` for every channel in `channels`.
    ///
    /// Without an explicit boundary each channel pages back from its own
    /// oldest held message, so channels with uneven traffic leave no gaps.
    /// A channel with nothing held starts from the oldest held message of
    /// any channel, or from now on an empty store.
    ///
    /// Returns `Busy` or `Exhausted` without doing anything when a fetch is
    /// already in flight or history has run out. An empty channel set is a
    /// silent no-op. Must be called inside a tokio runtime.
    pub fn request_older(
        &mut self,
        store: &mut TimelineStore,
        channels: &[ChannelId],
        before: Option<DateTime<Utc>>,
        on_complete: Option<Completion>,
    ) -> Result<(), TimelineError> {
        if store.is_polling() {
            debug!("history fetch already in flight");
            return Err(TimelineError::Busy);
        }
        if store.is_top_reached() {
            debug!("history exhausted, not fetching");
            return Err(TimelineError::Exhausted);
        }
        if channels.is_empty() {
            debug!("no channels selected, not fetching");
            return Ok(());
        }

        let fallback = before
            .or_else(|| store.earliest_timestamp())
            .unwrap_or_else(Utc::now);
        let bounds: Vec<(ChannelId, DateTime<Utc>)> = channels
            .iter()
            .map(|&channel| {
                let bound = before
                    .or_else(|| store.earliest_timestamp_in(channel))
                    .unwrap_or(fallback);
                (channel, bound)
            })
            .collect();
        let generation = store.generation();
        let channels = channels.to_vec();

        store.set_polling(true);
        self.pending = on_complete.map(|cb| (generation, cb));
        self.dispatched += 1;
        info!(?bounds, generation, "requesting older history");

        let client = Arc::clone(&self.client);
        let limit = self.page_size;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let pages = join_all(
                bounds
                    .iter()
                    .map(|&(channel, before)| client.fetch_history(channel, before, limit)),
            )
            .await;

            let result = pages
                .into_iter()
                .collect::<Result<Vec<Vec<MessageRecord>>, ClientError>>()
                .map(|pages| pages.into_iter().flatten().collect());

            let _ = tx.send(FetchResult {
                generation,
                channels,
                result,
            });
        });

        Ok(())
    }

    /// Apply every fetch that has finished since the last call.
    pub fn poll(&mut self, store: &mut TimelineStore) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(done) = self.rx.try_recv() {
            outcomes.push(self.apply(store, done));
        }
        outcomes
    }

    /// Wait for the next fetch to finish and apply it.
    pub async fn next_outcome(&mut self, store: &mut TimelineStore) -> Option<FetchOutcome> {
        let done = self.rx.recv().await?;
        Some(self.apply(store, done))
    }

    fn apply(&mut self, store: &mut TimelineStore, done: FetchResult) -> FetchOutcome {
        if done.generation != store.generation() {
            debug!(
                channels = ?done.channels,
                generation = done.generation,
                current = store.generation(),
                "dropping history for a channel set that is no longer shown"
            );
            if self.pending.as_ref().is_some_and(|(g, _)| *g == done.generation) {
                self.pending = None;
            }
            return FetchOutcome::Stale;
        }

        let outcome = match done.result {
            Err(err) => {
                warn!(channels = ?done.channels, error = %err, "history fetch failed");
                FetchOutcome::Failed(err)
            }
            Ok(records) if records.is_empty() => {
                info!(channels = ?done.channels, "reached the top of history");
                store.mark_top_reached();
                store.insert_sentinel();
                FetchOutcome::Exhausted
            }
            Ok(records) => {
                let fetched = records.len();
                let added = store.insert_many(records);
                debug!(fetched, added, "merged history page");
                FetchOutcome::Merged { fetched, added }
            }
        };

        store.set_polling(false);
        if let Some((_, on_complete)) = self.pending.take() {
            on_complete(store);
        }
        outcome
    }
}
