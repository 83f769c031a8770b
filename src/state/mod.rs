//! Per-run state
//!
//! # Components
//!
//! - `ItemState` / `WorkItem`: lifecycle of a single request inside a run
//! - `Deduplicator`: fingerprints already claimed in the run
//! - `FailureLog`: failures recorded by workers, readable while the run is live

mod dedup;
mod failures;
mod item_state;

pub use dedup::Deduplicator;
pub use failures::{Failure, FailureLog, FailurePhase};
pub use item_state::{ItemState, WorkItem};
