pub mod store;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Point-in-time copy of the aggregate counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_users: u64,
    pub total_messages: u64,
}

/// Where flushed counters end up
#[async_trait]
pub trait StatsSink: Send + Sync {
    async fn save(&self, snapshot: StatsSnapshot) -> Result<()>;
}

struct Counters {
    total_users: AtomicU64,
    total_messages: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_users: self.total_users.load(Ordering::Relaxed),
            total_messages: self.total_messages.load(Ordering::Relaxed),
        }
    }
}

/// Process-wide message counters with a trailing-debounce flush.
///
/// Every increment cancels the pending flush (if any) and schedules a new one
/// `delay` later, so a burst of messages results in a single write carrying
/// the counters as they are when the timer fires.
pub struct Stats {
    counters: Arc<Counters>,
    sink: Arc<dyn StatsSink>,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Stats {
    pub fn new(initial: StatsSnapshot, sink: Arc<dyn StatsSink>, delay: Duration) -> Self {
        let counters = Counters {
            total_users: AtomicU64::new(initial.total_users),
            total_messages: AtomicU64::new(initial.total_messages),
        };
        Self {
            counters: Arc::new(counters),
            sink,
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.counters.snapshot()
    }

    pub fn total_messages(&self) -> u64 {
        self.counters.total_messages.load(Ordering::Relaxed)
    }

    /// Count one accepted text message and (re)arm the flush timer.
    /// Must be called from within a tokio runtime.
    pub fn record_message(&self) {
        self.counters.total_messages.fetch_add(1, Ordering::Relaxed);
        self.schedule_flush();
    }

    fn schedule_flush(&self) {
        let counters = Arc::clone(&self.counters);
        let sink = Arc::clone(&self.sink);
        let delay = self.delay;

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            persist(&counters, sink.as_ref()).await;
        }));
    }

    /// Run the pending flush right away instead of waiting for the timer.
    /// Does nothing when no flush is pending.
    pub async fn flush(&self) {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = pending {
            if handle.is_finished() {
                return;
            }
            handle.abort();
            persist(&self.counters, self.sink.as_ref()).await;
        }
    }
}

async fn persist(counters: &Counters, sink: &dyn StatsSink) {
    let snapshot = counters.snapshot();
    match sink.save(snapshot).await {
        Ok(()) => debug!("Stats flushed: {} messages", snapshot.total_messages),
        Err(e) => warn!("Failed to persist stats: {:#}", e),
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Sink that remembers every write
    #[derive(Default)]
    pub struct RecordingSink {
        writes: Mutex<Vec<StatsSnapshot>>,
    }

    impl RecordingSink {
        pub fn writes(&self) -> Vec<StatsSnapshot> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatsSink for RecordingSink {
        async fn save(&self, snapshot: StatsSnapshot) -> Result<()> {
            self.writes.lock().unwrap().push(snapshot);
            Ok(())
        }
    }

    /// Stats backed by a recording sink, with the canonical 5s delay
    pub fn recording_stats() -> (Stats, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let stats = Stats::new(
            StatsSnapshot::default(),
            sink.clone(),
            Duration::from_secs(5),
        );
        (stats, sink)
    }
}
