/// Lifecycle states of a work item
///
/// An item moves through these states while a worker processes it:
///
/// ```text
/// Pending ─┬─ duplicate ──────────────────────────────→ Discarded
///          ├─ cache hit ───→ Fetched ─→ Extracting ─→ Completed
///          └─ Fetching ─┬─→ Fetched ─→ Extracting ─→ Completed
///                       └─→ Failed
/// ```
use crate::request::{fingerprint, FetchRequest, Fingerprint};
use std::fmt;

/// Represents the current state of a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    // ===== Active States =====
    /// Item is queued and waiting for a worker
    Pending,

    /// Transport is being called, possibly over several attempts
    Fetching,

    /// A payload is available, from the transport or the cache
    Fetched,

    /// The extraction stream is being drained
    Extracting,

    // ===== Terminal States =====
    /// Extraction finished and every output was routed
    Completed,

    /// Fingerprint was already seen in this run
    Discarded,

    /// Fetch failed permanently or retries were exhausted
    Failed,
}

impl ItemState {
    /// Returns true if no further processing happens in this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Discarded | Self::Failed)
    }

    /// Returns true if this item may still produce output
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Checks whether moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: ItemState) -> bool {
        use ItemState::*;
        matches!(
            (self, next),
            (Pending, Fetching)
                | (Pending, Fetched)
                | (Pending, Discarded)
                | (Fetching, Fetched)
                | (Fetching, Failed)
                | (Fetched, Extracting)
                | (Extracting, Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::Extracting => "extracting",
            Self::Completed => "completed",
            Self::Discarded => "discarded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fetch request in flight, tagged with its progress
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub request: FetchRequest,
    pub fingerprint: Fingerprint,
    pub attempts: u32,
    state: ItemState,
}

impl WorkItem {
    pub fn new(request: FetchRequest) -> Self {
        let fingerprint = fingerprint(&request);
        Self {
            request,
            fingerprint,
            attempts: 0,
            state: ItemState::Pending,
        }
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    /// Moves the item to `next`, logging illegal steps
    ///
    /// Illegal transitions are still applied; they indicate a bug in the
    /// worker loop, not bad input.
    pub fn advance(&mut self, next: ItemState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                "Unexpected item transition {} -> {} for {}",
                self.state,
                next,
                self.request
            );
        }
        tracing::trace!("{} {} -> {}", self.request, self.state, next);
        self.state = next;
    }
}
