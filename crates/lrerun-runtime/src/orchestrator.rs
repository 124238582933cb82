//! Run orchestration: login → resolve → negotiate → launch → monitor → logout.
//!
//! Steps are strictly sequential and never retried here. The session is
//! released on every exit path, including setup failures.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lrerun_core::{RunState, ThresholdConfig};
use lrerun_gateway::{Credentials, RemoteJobGateway};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::launcher::{LaunchError, RunLauncher};
use crate::monitor::{MonitorConfig, MonitorExit, MonitorReport, RunMonitor};
use crate::resolver::{ResolveError, TestInstanceResolver};
use crate::session::{Session, SessionError};
use crate::timeslot::{ResourceProfile, TimeslotError, TimeslotNegotiator};

/// Failures before a run is being monitored. All are fatal.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Timeslot(#[from] TimeslotError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
    /// Cancellation arrived before the run was started; nothing was launched.
    #[error("cancelled before test {test_id} was started")]
    Cancelled { test_id: u64 },
}

impl SetupError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cancelled { .. } => RunOutcome::Cancelled.exit_code(),
            _ => 1,
        }
    }
}

/// Everything needed to execute one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub test_id: u64,
    pub timeslot_minutes: u32,
    pub profile: ResourceProfile,
    pub poll_interval: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub thresholds: ThresholdConfig,
    pub run_id_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    ThresholdAborted,
    /// Terminal `Run Failure` or `Canceled` on the remote side.
    RunFailed,
    MonitorTimedOut,
    Cancelled,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::ThresholdAborted => 2,
            Self::RunFailed => 3,
            Self::MonitorTimedOut => 4,
            Self::Cancelled => 130,
        }
    }

    fn classify(report: &MonitorReport) -> Self {
        match &report.exit {
            MonitorExit::Terminal => match report.snapshot.state {
                RunState::RunFailure | RunState::Canceled => Self::RunFailed,
                _ => Self::Completed,
            },
            MonitorExit::Aborted(_) => Self::ThresholdAborted,
            MonitorExit::TimedOut => Self::MonitorTimedOut,
            MonitorExit::Cancelled => Self::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: u64,
    pub test_id: u64,
    pub test_instance_id: u64,
    pub outcome: RunOutcome,
    pub final_state: RunState,
    pub total_errors: u64,
    pub total_failed_transactions: u64,
    pub failure_reason: Option<String>,
    /// Whether the remote accepted the abort, when one was issued.
    pub abort_accepted: Option<bool>,
    pub dashboard_url: String,
    /// The remote finished analysis, so reports can be downloaded.
    pub reports_available: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub monitored_secs: u64,
    pub status_polls: u32,
}

pub struct RunOrchestrator<'a, G> {
    gateway: &'a G,
    credentials: &'a Credentials,
    cancel: CancellationToken,
}

impl<'a, G: RemoteJobGateway> RunOrchestrator<'a, G> {
    pub fn new(gateway: &'a G, credentials: &'a Credentials, cancel: CancellationToken) -> Self {
        Self {
            gateway,
            credentials,
            cancel,
        }
    }

    pub async fn execute(&self, request: &RunRequest) -> Result<RunReport, SetupError> {
        let session = Session::open(self.gateway, self.credentials).await?;
        let result = self.run_steps(request).await;
        session.release().await;
        result
    }

    async fn run_steps(&self, request: &RunRequest) -> Result<RunReport, SetupError> {
        let test_id = request.test_id;
        let test_instance_id = TestInstanceResolver::new(self.gateway).resolve(test_id).await?;

        let duration = TimeslotNegotiator::new(self.gateway)
            .check_availability(
                test_id,
                test_instance_id,
                request.timeslot_minutes,
                &request.profile,
            )
            .await?;

        if self.cancel.is_cancelled() {
            tracing::warn!(test_id, "cancelled during setup, not starting the run");
            return Err(SetupError::Cancelled { test_id });
        }

        let payload = request.profile.reservation(duration, test_instance_id);
        let started_at = Utc::now();
        let handle = RunLauncher::new(self.gateway).start(test_id, &payload).await?;

        if let Some(path) = &request.run_id_file {
            write_run_id(path, handle.run_id);
        }

        let config = MonitorConfig {
            timeslot: duration,
            poll_interval: request.poll_interval,
            post_run_action: request.profile.post_run_action,
            thresholds: request.thresholds,
            max_retries: request.max_retries,
            retry_backoff: request.retry_backoff,
        };
        let report = RunMonitor::new(self.gateway, self.credentials, self.cancel.clone())
            .monitor(handle.run_id, config)
            .await;

        let outcome = RunOutcome::classify(&report);
        let abort_accepted = match &report.exit {
            MonitorExit::Aborted(abort) => Some(abort.remote_accepted),
            _ => None,
        };
        let final_state = report.snapshot.state;
        let failure_reason = report.failure_reason.or_else(|| match outcome {
            RunOutcome::RunFailed => Some(format!("run ended in state '{final_state}'")),
            _ => None,
        });
        tracing::info!(
            run_id = handle.run_id,
            outcome = ?outcome,
            final_state = %final_state,
            "run finished"
        );

        Ok(RunReport {
            run_id: handle.run_id,
            test_id,
            test_instance_id,
            outcome,
            final_state,
            total_errors: report.snapshot.total_errors,
            total_failed_transactions: report.snapshot.total_failed_transactions,
            failure_reason,
            abort_accepted,
            dashboard_url: handle.dashboard_url,
            reports_available: final_state == RunState::Finished,
            started_at,
            finished_at: Utc::now(),
            monitored_secs: report.elapsed.as_secs(),
            status_polls: report.polls,
        })
    }
}

/// The run is already started: a write failure must not stop monitoring.
fn write_run_id(path: &Path, run_id: u64) {
    match std::fs::write(path, run_id.to_string()) {
        Ok(()) => tracing::info!(run_id, path = %path.display(), "run id written"),
        Err(e) => {
            tracing::warn!(run_id, path = %path.display(), error = %e, "failed to write run id")
        }
    }
}

#[cfg(test)]
mod tests {
    use lrerun_core::PostRunAction;

    use super::*;
    use crate::test_support::{Poll, RUN_ID, Script, ScriptedGateway, credentials};

    fn request() -> RunRequest {
        RunRequest {
            test_id: 12,
            timeslot_minutes: 30,
            profile: ResourceProfile::default(),
            poll_interval: Duration::from_secs(30),
            max_retries: 3,
            retry_backoff: Duration::from_secs(5),
            thresholds: ThresholdConfig {
                max_errors: 10,
                max_failed_txns: 5,
            },
            run_id_file: None,
        }
    }

    async fn execute(
        gateway: &ScriptedGateway,
        request: &RunRequest,
    ) -> Result<RunReport, SetupError> {
        let creds = credentials();
        RunOrchestrator::new(gateway, &creds, CancellationToken::new())
            .execute(request)
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn happy_path_runs_every_step_in_order() {
        let gateway = ScriptedGateway::new(Script {
            polls: [
                Poll::State(RunState::Initializing),
                Poll::State(RunState::Running),
                Poll::State(RunState::Finished),
            ]
            .into(),
            ..Script::default()
        });
        let report = execute(&gateway, &request()).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.outcome.exit_code(), 0);
        assert_eq!(report.run_id, RUN_ID);
        assert_eq!(report.test_instance_id, 700);
        assert!(report.reports_available);
        assert!(report.failure_reason.is_none());

        let calls = gateway.calls();
        assert_eq!(calls.first().map(String::as_str), Some("login"));
        assert_eq!(calls.last().map(String::as_str), Some("logout"));
        let order: Vec<&str> = calls
            .iter()
            .map(String::as_str)
            .filter(|c| {
                matches!(
                    *c,
                    "fetch_test_instances" | "calculate_timeslot_availability" | "start_run"
                )
            })
            .collect();
        assert_eq!(
            order,
            ["fetch_test_instances", "calculate_timeslot_availability", "start_run"]
        );
    }

    #[tokio::test]
    async fn setup_failure_still_logs_out() {
        let gateway = ScriptedGateway::new(Script {
            conflicts: vec!["No hosts available".to_string()],
            ..Script::default()
        });
        let err = execute(&gateway, &request()).await.unwrap_err();

        assert!(matches!(err, SetupError::Timeslot(TimeslotError::Unavailable(_))));
        assert_eq!(gateway.count("start_run"), 0);
        assert_eq!(gateway.count("logout"), 1);
    }

    #[tokio::test]
    async fn launch_failure_is_fatal() {
        let gateway = ScriptedGateway::new(Script {
            fail_start: true,
            ..Script::default()
        });
        let err = execute(&gateway, &request()).await.unwrap_err();

        assert!(matches!(err, SetupError::Launch(_)));
        assert_eq!(gateway.count("fetch_run_status"), 0);
        assert_eq!(gateway.count("logout"), 1);
    }

    #[tokio::test]
    async fn rejected_login_skips_everything() {
        let gateway = ScriptedGateway::new(Script {
            login_rejected: true,
            ..Script::default()
        });
        let err = execute(&gateway, &request()).await.unwrap_err();

        assert!(matches!(err, SetupError::Session(SessionError::Rejected { .. })));
        assert_eq!(gateway.calls(), vec!["login"]);
    }

    #[tokio::test]
    async fn invalid_duration_is_a_setup_error() {
        let gateway = ScriptedGateway::default();
        let mut req = request();
        req.timeslot_minutes = 0;
        let err = execute(&gateway, &req).await.unwrap_err();

        assert!(matches!(err, SetupError::Timeslot(TimeslotError::InvalidDuration(_))));
        assert_eq!(gateway.count("calculate_timeslot_availability"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn threshold_abort_is_classified() {
        let gateway = ScriptedGateway::new(Script {
            polls: [Poll::Counters(RunState::Running, 3, 5)].into(),
            ..Script::default()
        });
        let report = execute(&gateway, &request()).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::ThresholdAborted);
        assert_eq!(report.outcome.exit_code(), 2);
        assert_eq!(
            report.failure_reason.as_deref(),
            Some("Failed Txn threshold breached (5/5)")
        );
        assert_eq!(report.abort_accepted, Some(true));
        assert!(!report.reports_available);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_failure_is_classified() {
        let gateway = ScriptedGateway::new(Script {
            polls: [Poll::State(RunState::RunFailure)].into(),
            ..Script::default()
        });
        let report = execute(&gateway, &request()).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::RunFailed);
        assert_eq!(report.outcome.exit_code(), 3);
        assert_eq!(
            report.failure_reason.as_deref(),
            Some("run ended in state 'Run Failure'")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn collate_only_completes_without_reports() {
        let gateway = ScriptedGateway::new(Script {
            polls: [Poll::State(RunState::BeforeCreatingAnalysisData)].into(),
            ..Script::default()
        });
        let mut req = request();
        req.profile.post_run_action = PostRunAction::CollateResults;
        let report = execute(&gateway, &req).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert!(!report.reports_available);
    }

    #[tokio::test(start_paused = true)]
    async fn run_id_is_written_to_file() {
        let path = std::env::temp_dir().join(format!("lrerun-run-id-{}.txt", std::process::id()));
        let gateway = ScriptedGateway::new(Script {
            polls: [Poll::State(RunState::Finished)].into(),
            ..Script::default()
        });
        let mut req = request();
        req.run_id_file = Some(path.clone());
        execute(&gateway, &req).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(written, RUN_ID.to_string());
    }

    async fn execute_with(
        gateway: &ScriptedGateway,
        cancel: CancellationToken,
    ) -> Result<RunReport, SetupError> {
        let creds = credentials();
        RunOrchestrator::new(gateway, &creds, cancel)
            .execute(&request())
            .await
    }

    #[tokio::test]
    async fn cancelled_during_setup_never_starts_the_run() {
        let gateway = ScriptedGateway::new(Script {
            polls: [Poll::State(RunState::Running)].into(),
            ..Script::default()
        });
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = execute_with(&gateway, cancel).await.unwrap_err();

        assert!(matches!(err, SetupError::Cancelled { test_id: 12 }));
        assert_eq!(err.exit_code(), 130);
        assert_eq!(gateway.count("start_run"), 0);
        assert_eq!(gateway.count("fetch_run_status"), 0);
        assert_eq!(gateway.count("abort_run"), 0);
        assert_eq!(gateway.count("logout"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_while_monitoring_leaves_run_alone() {
        let gateway = ScriptedGateway::new(Script {
            polls: [Poll::State(RunState::Running)].into(),
            ..Script::default()
        });
        let cancel = CancellationToken::new();
        let (report, ()) = tokio::join!(execute_with(&gateway, cancel.clone()), async {
            tokio::time::sleep(Duration::from_secs(45)).await;
            cancel.cancel();
        });
        let report = report.unwrap();

        assert_eq!(report.outcome, RunOutcome::Cancelled);
        assert_eq!(report.outcome.exit_code(), 130);
        assert_eq!(report.final_state, RunState::Running);
        assert_eq!(gateway.count("start_run"), 1);
        assert_eq!(gateway.count("abort_run"), 0);
        assert_eq!(gateway.count("logout"), 1);
    }

    #[test]
    fn setup_errors_exit_with_one() {
        let err = SetupError::Session(SessionError::Rejected {
            username: "svc".to_string(),
        });
        assert_eq!(err.exit_code(), 1);
    }
}
