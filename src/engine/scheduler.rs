//! Work queue shared by the workers of one run
//!
//! This module handles:
//! - FIFO ordering of pending work items, discovered requests at the tail
//! - Tracking how many items are in flight
//! - Detecting quiescence (queue empty and nothing in flight) and closing
//! - Draining the queue on cancellation
//!
//! The queue, the in-flight counter and the closed flag live under one lock,
//! so quiescence can never be observed between a worker popping an item and
//! that item being counted as in flight.

use crate::state::WorkItem;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

#[derive(Default)]
struct QueueState {
    items: VecDeque<WorkItem>,
    in_flight: usize,
    closed: bool,
}

/// Unbounded work queue with in-flight accounting
#[derive(Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends an item at the tail
    ///
    /// Returns `false` if the queue is closed and the item was dropped.
    pub fn push(&self, item: WorkItem) -> bool {
        {
            let mut state = self.lock();
            if state.closed {
                return false;
            }
            state.items.push_back(item);
        }
        self.notify.notify_one();
        true
    }

    /// Takes the next item, waiting while other workers may still add more
    ///
    /// A returned item counts as in flight until [`WorkQueue::complete`] is
    /// called for it. Returns `None` once the queue is closed, either by
    /// cancellation or because it is empty with nothing in flight.
    pub async fn pop(&self) -> Option<WorkItem> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // register before checking, so a push between the check and the await is not missed
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(item) = state.items.pop_front() {
                    state.in_flight += 1;
                    return Some(item);
                }
                if state.in_flight == 0 {
                    state.closed = true;
                    drop(state);
                    tracing::debug!("Work queue is quiescent, closing");
                    self.notify.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Marks one popped item as finished
    pub fn complete(&self) {
        let quiescent = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            if state.items.is_empty() && state.in_flight == 0 && !state.closed {
                state.closed = true;
                true
            } else {
                false
            }
        };

        if quiescent {
            tracing::debug!("Last in-flight item completed, closing work queue");
            self.notify.notify_waiters();
        }
    }

    /// Closes the queue and returns the items that were never processed
    pub fn close(&self) -> Vec<WorkItem> {
        let drained = {
            let mut state = self.lock();
            state.closed = true;
            state.items.drain(..).collect()
        };
        self.notify.notify_waiters();
        drained
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
