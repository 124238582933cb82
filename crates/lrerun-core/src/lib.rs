//! lrerun-core: pure domain model for remote load-test runs.
//! Run states, post-run actions, progress estimation, threshold policy and
//! timeslot validation. No IO, no async.

pub mod progress;
pub mod threshold;
pub mod timeslot;
pub mod types;

pub use progress::{progress, progress_bar};
pub use threshold::{
    DEFAULT_MAX_ERRORS, DEFAULT_MAX_FAILED_TXNS, ThresholdBreach, ThresholdConfig, evaluate,
    should_abort,
};
pub use timeslot::{InvalidDuration, MAX_HOURS, MAX_TOTAL_MINUTES, TimeslotDuration};
pub use types::{ParseError, PostRunAction, RunState, RunStatusSnapshot};
