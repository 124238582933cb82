//! Threshold guard: decides whether a running job burned its error budget and
//! issues the remote abort.

use lrerun_core::{RunStatusSnapshot, ThresholdBreach, ThresholdConfig, evaluate};
use lrerun_gateway::RemoteJobGateway;

/// Result of an abort attempt. The local failure reason is kept even when the
/// remote rejected the abort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortOutcome {
    pub reason: String,
    pub remote_accepted: bool,
}

pub struct ThresholdGuard<G> {
    gateway: G,
    thresholds: ThresholdConfig,
}

impl<G: RemoteJobGateway> ThresholdGuard<G> {
    pub fn new(gateway: G, thresholds: ThresholdConfig) -> Self {
        Self {
            gateway,
            thresholds,
        }
    }

    /// `Some` when the snapshot is `Running` and a budget is exhausted.
    pub fn check(&self, snapshot: &RunStatusSnapshot) -> Option<ThresholdBreach> {
        evaluate(snapshot, snapshot.state, &self.thresholds)
    }

    /// Abort failures are logged, never raised.
    pub async fn abort(
        &self,
        snapshot: &RunStatusSnapshot,
        breach: &ThresholdBreach,
    ) -> AbortOutcome {
        let reason = breach.reason();
        tracing::warn!(
            run_id = snapshot.run_id,
            errors = snapshot.total_errors,
            failed_txns = snapshot.total_failed_transactions,
            reason = %reason,
            "threshold breached, aborting run"
        );

        let remote_accepted = match self.gateway.abort_run(snapshot.run_id).await {
            Ok(()) => {
                tracing::info!(run_id = snapshot.run_id, "abort request accepted");
                true
            }
            Err(e) => {
                tracing::error!(run_id = snapshot.run_id, error = %e, "abort request failed");
                false
            }
        };
        AbortOutcome {
            reason,
            remote_accepted,
        }
    }
}
