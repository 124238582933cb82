//! Run launch: a single start-run call. A failed launch is fatal and never
//! retried, so a run is never started twice.

use lrerun_gateway::{GatewayError, RemoteJobGateway, TimeslotRequest};

#[derive(Debug, thiserror::Error)]
#[error("failed to start run for test {test_id}: {source}")]
pub struct LaunchError {
    pub test_id: u64,
    #[source]
    pub source: GatewayError,
}

/// A started run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub run_id: u64,
    pub dashboard_url: String,
}

pub struct RunLauncher<G> {
    gateway: G,
}

impl<G: RemoteJobGateway> RunLauncher<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub async fn start(
        &self,
        test_id: u64,
        payload: &TimeslotRequest,
    ) -> Result<RunHandle, LaunchError> {
        tracing::info!(
            test_id,
            test_instance_id = payload.test_instance_id,
            duration_minutes = payload.duration_in_minutes,
            "starting run"
        );
        let launch = self
            .gateway
            .start_run(test_id, payload)
            .await
            .map_err(|source| LaunchError { test_id, source })?;

        tracing::info!(
            test_id,
            run_id = launch.run_id,
            internal_run_id = launch.internal_run_id,
            dashboard = %launch.dashboard_url,
            "run started"
        );
        Ok(RunHandle {
            run_id: launch.run_id,
            dashboard_url: launch.dashboard_url,
        })
    }
}
