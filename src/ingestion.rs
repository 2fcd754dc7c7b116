//! Ingestion engine: historical catch-up plus steady-state polling
//!
//! One engine task owns all store mutation. Each pass reconciles local state
//! with the chain head: fetch the unseen block range, drop events already in
//! the dedup ledger, fold the rest into the aggregate store (each accrual
//! made durable before its id is recorded), then flush the ledger and
//! advance the cursor.

use {
    crate::{
        aggregator::MintAggregator,
        chain::{EventSource, SourceError},
        events::MintEvent,
        persistence::{self, SnapshotStore, StoreError},
    },
    std::{collections::HashSet, sync::Arc, time::Duration},
    thiserror::Error,
    tokio::{sync::RwLock, time::interval},
};

/// Failure of one sync pass. The engine never exits on these; the next
/// scheduled poll retries from the last durably advanced cursor.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Durable set of already-applied event ids.
#[derive(Debug, Default)]
pub struct ProcessedLedger {
    ids: HashSet<String>,
}

impl ProcessedLedger {
    pub fn from_ids(ids: Vec<String>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn record(&mut self, id: String) {
        self.ids.insert(id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Serialized form: sorted so snapshots do not churn with hash order.
    pub fn to_sorted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }
}

/// What one sync pass did, for logging and tests.
#[derive(Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Chain head has not moved past the cursor.
    NoNewBlocks { head: u64 },
    /// Range processed and cursor advanced.
    Advanced {
        from: u64,
        head: u64,
        fetched: usize,
        applied: usize,
    },
}

pub struct IngestionEngine {
    source: Arc<dyn EventSource>,
    store: Arc<dyn SnapshotStore>,
    aggregates: Arc<RwLock<MintAggregator>>,
    ledger: ProcessedLedger,
    cursor: Option<u64>,
    start_block: u64,
}

impl IngestionEngine {
    pub fn new(
        source: Arc<dyn EventSource>,
        store: Arc<dyn SnapshotStore>,
        aggregates: Arc<RwLock<MintAggregator>>,
        ledger: ProcessedLedger,
        cursor: Option<u64>,
        start_block: u64,
    ) -> Self {
        Self {
            source,
            store,
            aggregates,
            ledger,
            cursor,
            start_block,
        }
    }

    /// Last fully processed block, if any pass has completed.
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    pub fn ledger(&self) -> &ProcessedLedger {
        &self.ledger
    }

    /// Block the next pass will start from.
    fn next_from_block(&self) -> u64 {
        match self.cursor {
            Some(cursor) => cursor + 1,
            None => self.start_block,
        }
    }

    /// One pass: reconcile local state with the chain head.
    ///
    /// Shared by catch-up and polling. Dedup, apply, and the aggregate flush
    /// run per event; the ledger flushes once per batch; the cursor advances
    /// (and persists) last, only after everything it covers is durable. Any
    /// error aborts the pass with the cursor untouched.
    pub async fn sync_to_head(&mut self) -> Result<SyncOutcome, IngestError> {
        let head = self.source.latest_block().await?;
        if let Some(cursor) = self.cursor {
            if head <= cursor {
                return Ok(SyncOutcome::NoNewBlocks { head });
            }
        }

        let from = self.next_from_block();
        if from > head {
            // Configured start is still ahead of the chain; nothing to query.
            return Ok(SyncOutcome::NoNewBlocks { head });
        }

        let events = self.source.events(from, head).await?;
        let fetched = events.len();
        let mut applied = 0usize;

        for event in &events {
            if self.apply_if_new(event).await? {
                applied += 1;
            }
        }

        persistence::save_ledger(self.store.as_ref(), &self.ledger.to_sorted_ids())?;
        persistence::save_cursor(self.store.as_ref(), head)?;
        self.cursor = Some(head);

        Ok(SyncOutcome::Advanced {
            from,
            head,
            fetched,
            applied,
        })
    }

    /// Apply one event unless its id is already in the ledger. Returns
    /// whether the event was new.
    ///
    /// The accrual is staged on a copy of the aggregate and committed only
    /// once the snapshot is durable, so a failed flush leaves the live
    /// aggregate exactly as it was and the retry applies the event once.
    async fn apply_if_new(&mut self, event: &MintEvent) -> Result<bool, IngestError> {
        let id = event.event_id();
        if self.ledger.contains(&id) {
            log::debug!("Skipping already processed event {}", id);
            return Ok(false);
        }

        let mut staged = self.aggregates.read().await.clone();
        staged.apply(event.user, event.amount, event.cycle_id);
        persistence::save_aggregates(self.store.as_ref(), &staged.snapshot())?;

        // The engine is the only writer, so replacing the shared aggregate
        // cannot drop anyone else's update.
        *self.aggregates.write().await = staged;

        // Recorded only after the accrual is durable: a recorded id always
        // has exactly one accrual behind it.
        self.ledger.record(id);
        log::info!(
            "📥 Mint by {}: {} (cycle {}) at block {}",
            event.user,
            event.amount,
            event.cycle_id,
            event.block_number
        );
        Ok(true)
    }

    /// Run forever: one historical catch-up pass, then fixed-interval polls.
    pub async fn run(mut self, poll_interval: Duration) {
        log::info!(
            "🚀 Catch-up starting at block {} ({} events already processed)",
            self.next_from_block(),
            self.ledger.len()
        );
        match self.sync_to_head().await {
            Ok(outcome) => log_outcome("Catch-up", &outcome),
            Err(e) => log::error!("❌ Catch-up failed, retrying on poll schedule: {}", e),
        }

        let mut timer = interval(poll_interval);
        timer.tick().await; // first tick completes immediately
        loop {
            timer.tick().await;
            match self.sync_to_head().await {
                Ok(outcome) => log_outcome("Poll", &outcome),
                Err(e) => log::warn!("⚠️ Poll cycle failed: {}", e),
            }
        }
    }
}

fn log_outcome(phase: &str, outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::NoNewBlocks { head } => {
            log::info!("{}: no new blocks past {}", phase, head);
        }
        SyncOutcome::Advanced {
            from,
            head,
            fetched,
            applied,
        } => {
            log::info!(
                "✅ {}: blocks {}..={}, {} events fetched, {} new",
                phase,
                from,
                head,
                fetched,
                applied
            );
        }
    }
}
