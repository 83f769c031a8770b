//! Result bridge
//!
//! A run's records travel over an unbounded channel. [`Harvest`] exposes the
//! receiving end as an async `Stream`; [`BlockingHarvest`] wraps it together
//! with a private current-thread runtime and exposes a plain `Iterator`.

use crate::output::stats::{RunStats, StatsSnapshot};
use crate::state::{Failure, FailureLog};
use crate::Record;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// Handle on a live or finished run
///
/// Yields records as workers produce them. The stream ends once the run has
/// finished and every record has been read. Dropping the handle cancels the
/// run.
pub struct Harvest {
    records: UnboundedReceiverStream<Record>,
    failures: FailureLog,
    stats: Arc<RunStats>,
    cancel: CancellationToken,
}

impl Harvest {
    pub(crate) fn new(
        receiver: UnboundedReceiver<Record>,
        failures: FailureLog,
        stats: Arc<RunStats>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            records: UnboundedReceiverStream::new(receiver),
            failures,
            stats,
            cancel,
        }
    }

    /// Failures recorded so far
    pub fn failures(&self) -> Vec<Failure> {
        self.failures.snapshot()
    }

    /// Statistics so far
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Requests cancellation
    ///
    /// In-flight items finish, pending ones are dropped, and the stream ends
    /// after the records already produced.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that cancels this run when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Collects every remaining record
    pub async fn collect_records(&mut self) -> Vec<Record> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await {
            records.push(record);
        }
        records
    }
}

impl Stream for Harvest {
    type Item = Record;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Record>> {
        Pin::new(&mut self.records).poll_next(cx)
    }
}

impl Drop for Harvest {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Synchronous view of a run
///
/// Each call to `next` drives the run's runtime until a record is available
/// or the run has finished. Workers only make progress while the iterator is
/// being advanced.
pub struct BlockingHarvest {
    // dropped before the runtime so the run is cancelled first
    harvest: Harvest,
    runtime: Runtime,
}

impl BlockingHarvest {
    pub(crate) fn new(harvest: Harvest, runtime: Runtime) -> Self {
        Self { harvest, runtime }
    }

    /// Failures recorded so far
    pub fn failures(&self) -> Vec<Failure> {
        self.harvest.failures()
    }

    /// Statistics so far
    pub fn stats(&self) -> StatsSnapshot {
        self.harvest.stats()
    }

    pub fn cancel(&self) {
        self.harvest.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.harvest.cancellation_token()
    }
}

impl Iterator for BlockingHarvest {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        let harvest = &mut self.harvest;
        self.runtime.block_on(harvest.next())
    }
}
