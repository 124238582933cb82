//! Error budget policy for a running load test.
//!
//! Counters are cumulative and compared without any rate window. The policy
//! is only consulted while the run is in `Running`: a run that is already
//! collating results is never force-aborted.

use std::fmt;

use crate::types::{RunState, RunStatusSnapshot};

/// Default maximum tolerated error count.
pub const DEFAULT_MAX_ERRORS: u64 = 5000;

/// Default maximum tolerated failed-transaction count.
pub const DEFAULT_MAX_FAILED_TXNS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdConfig {
    pub max_errors: u64,
    pub max_failed_txns: u64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            max_errors: DEFAULT_MAX_ERRORS,
            max_failed_txns: DEFAULT_MAX_FAILED_TXNS,
        }
    }
}

/// Which budgets a snapshot exhausted, with the observed counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdBreach {
    pub errors: Option<(u64, u64)>,
    pub failed_txns: Option<(u64, u64)>,
}

impl ThresholdBreach {
    /// Human-readable reason listing every breached budget.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ThresholdBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(2);
        if let Some((count, limit)) = self.errors {
            parts.push(format!("Error threshold breached ({count}/{limit})"));
        }
        if let Some((count, limit)) = self.failed_txns {
            parts.push(format!("Failed Txn threshold breached ({count}/{limit})"));
        }
        f.write_str(&parts.join(" | "))
    }
}

/// Evaluate a snapshot against the budgets.
///
/// Returns `None` unless `current_state` is `Running` and at least one
/// counter reached its limit (inclusive).
pub fn evaluate(
    snapshot: &RunStatusSnapshot,
    current_state: RunState,
    thresholds: &ThresholdConfig,
) -> Option<ThresholdBreach> {
    if current_state != RunState::Running {
        return None;
    }

    let errors = (snapshot.total_errors >= thresholds.max_errors)
        .then_some((snapshot.total_errors, thresholds.max_errors));
    let failed_txns = (snapshot.total_failed_transactions >= thresholds.max_failed_txns)
        .then_some((snapshot.total_failed_transactions, thresholds.max_failed_txns));

    if errors.is_none() && failed_txns.is_none() {
        return None;
    }
    Some(ThresholdBreach {
        errors,
        failed_txns,
    })
}

/// Either budget alone is enough to abort.
pub fn should_abort(
    snapshot: &RunStatusSnapshot,
    current_state: RunState,
    thresholds: &ThresholdConfig,
) -> bool {
    evaluate(snapshot, current_state, thresholds).is_some()
}
