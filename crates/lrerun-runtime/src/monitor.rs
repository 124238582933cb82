//! Run monitor loop: polls a started run until it reaches a terminal state
//! for its post-run action, breaches a threshold, outlives its timeslot or
//! is cancelled.
//!
//! One loop is one sequential task. All mutable state lives in
//! [`MonitorSession`]; the only suspension points are the status fetch, the
//! re-authentication and the sleeps, each raced against the cancellation
//! token. The loop always hands back a snapshot, the synthetic `Undefined`
//! one if nothing was ever observed.

use std::time::Duration;

use lrerun_core::{
    PostRunAction, RunState, RunStatusSnapshot, ThresholdConfig, TimeslotDuration, progress,
};
use lrerun_gateway::{Credentials, RemoteJobGateway};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::guard::{AbortOutcome, ThresholdGuard};
use crate::status_line::format_status_line;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub timeslot: TimeslotDuration,
    pub poll_interval: Duration,
    pub post_run_action: PostRunAction,
    pub thresholds: ThresholdConfig,
    /// Consecutive fetch failures before a forced re-authentication.
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

/// How the loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorExit {
    /// Observed a terminal state of the active post-run action.
    Terminal,
    /// A threshold fired and an abort was issued.
    Aborted(AbortOutcome),
    /// The timeslot elapsed; the remote job may still be running.
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    pub snapshot: RunStatusSnapshot,
    pub exit: MonitorExit,
    pub failure_reason: Option<String>,
    pub elapsed: Duration,
    pub polls: u32,
}

/// Progress log cadence for a timeslot of the given length.
pub fn log_interval(timeslot: Duration) -> Duration {
    const MINUTE: u64 = 60;
    let minutes = match timeslot.as_secs() {
        s if s <= 30 * MINUTE => 1,
        s if s <= 120 * MINUTE => 3,
        _ => 5,
    };
    Duration::from_secs(minutes * MINUTE)
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Mutable per-run poller state.
#[derive(Debug)]
pub struct MonitorSession {
    config: MonitorConfig,
    started: Instant,
    last_logged_at: Option<Instant>,
    last_logged_state: Option<RunState>,
    consecutive_failures: u32,
    latest: RunStatusSnapshot,
    failure_reason: Option<String>,
    polls: u32,
}

impl MonitorSession {
    pub fn new(run_id: u64, config: MonitorConfig) -> Self {
        Self {
            config,
            started: Instant::now(),
            last_logged_at: None,
            last_logged_state: None,
            consecutive_failures: 0,
            latest: RunStatusSnapshot::initial(run_id),
            failure_reason: None,
            polls: 0,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn timeslot(&self) -> Duration {
        self.config.timeslot.as_duration()
    }

    fn timed_out(&self) -> bool {
        self.elapsed() >= self.timeslot()
    }

    fn observe(&mut self, snapshot: RunStatusSnapshot) {
        self.latest = snapshot;
        self.consecutive_failures = 0;
        self.polls += 1;
    }

    /// Every successful poll reports progress before any exit decision.
    fn record(&mut self, snapshot: RunStatusSnapshot) {
        self.observe(snapshot);
        self.log_progress();
    }

    /// Returns the failure count including this one.
    fn record_failure(&mut self) -> u32 {
        self.consecutive_failures += 1;
        self.consecutive_failures
    }

    fn progress_due(&self, now: Instant) -> bool {
        if self.last_logged_state != Some(self.latest.state) {
            return true;
        }
        let interval = log_interval(self.timeslot());
        self.last_logged_at
            .is_none_or(|at| now.duration_since(at) >= interval)
    }

    fn log_progress(&mut self) {
        let now = Instant::now();
        if !self.progress_due(now) {
            return;
        }
        let elapsed = self.elapsed();
        let state = self.latest.state;
        let percent = progress(state, as_millis(elapsed), as_millis(self.timeslot()));
        let line = format_status_line(self.latest.run_id, state, elapsed, self.timeslot(), percent);
        tracing::info!(
            run_id = self.latest.run_id,
            state = %state,
            progress = percent,
            errors = self.latest.total_errors,
            failed_txns = self.latest.total_failed_transactions,
            "{line}"
        );
        self.last_logged_at = Some(now);
        self.last_logged_state = Some(state);
    }

    fn finish(self, exit: MonitorExit) -> MonitorReport {
        MonitorReport {
            elapsed: self.elapsed(),
            snapshot: self.latest,
            exit,
            failure_reason: self.failure_reason,
            polls: self.polls,
        }
    }
}

pub struct RunMonitor<'a, G> {
    gateway: G,
    credentials: &'a Credentials,
    cancel: CancellationToken,
}

impl<'a, G: RemoteJobGateway> RunMonitor<'a, G> {
    pub fn new(gateway: G, credentials: &'a Credentials, cancel: CancellationToken) -> Self {
        Self {
            gateway,
            credentials,
            cancel,
        }
    }

    pub async fn monitor(&self, run_id: u64, config: MonitorConfig) -> MonitorReport {
        let guard = ThresholdGuard::new(&self.gateway, config.thresholds);
        let post_run_action = config.post_run_action;
        let max_retries = config.max_retries.max(1);
        let poll_interval = config.poll_interval;
        let retry_backoff = config.retry_backoff;
        let mut session = MonitorSession::new(run_id, config);

        tracing::info!(
            run_id,
            timeslot = %session.config.timeslot,
            post_run_action = %post_run_action,
            poll_interval_secs = poll_interval.as_secs(),
            "monitoring run"
        );

        loop {
            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Self::cancelled(session),
                result = self.gateway.fetch_run_status(run_id) => result,
            };

            match fetched {
                Ok(snapshot) => {
                    session.record(snapshot);
                    let state = session.latest.state;

                    if post_run_action.is_terminal(state) {
                        tracing::info!(run_id, state = %state, "run reached terminal state");
                        return session.finish(MonitorExit::Terminal);
                    }

                    if let Some(breach) = guard.check(&session.latest) {
                        let outcome = guard.abort(&session.latest, &breach).await;
                        session.failure_reason = Some(outcome.reason.clone());
                        return session.finish(MonitorExit::Aborted(outcome));
                    }

                    if session.timed_out() {
                        return Self::timed_out(session);
                    }

                    if self.sleep_or_cancel(poll_interval).await {
                        return Self::cancelled(session);
                    }
                }
                Err(e) => {
                    let attempt = session.record_failure();
                    tracing::warn!(
                        run_id,
                        attempt,
                        max_retries,
                        error = %e,
                        "failed to fetch run status (attempt {attempt}/{max_retries})"
                    );

                    if attempt >= max_retries {
                        if !self.reauthenticate(run_id).await {
                            return Self::cancelled(session);
                        }
                        session.consecutive_failures = 0;
                    }

                    if session.timed_out() {
                        return Self::timed_out(session);
                    }

                    if self.sleep_or_cancel(retry_backoff).await {
                        return Self::cancelled(session);
                    }
                }
            }
        }
    }

    /// Returns `false` if cancelled while logging in.
    async fn reauthenticate(&self, run_id: u64) -> bool {
        tracing::warn!(run_id, "max retries reached, forcing re-authentication");
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            result = self.gateway.login(self.credentials) => result,
        };
        match result {
            Ok(true) => tracing::info!(run_id, "re-authenticated"),
            Ok(false) => tracing::warn!(run_id, "re-authentication rejected"),
            Err(e) => tracing::warn!(run_id, error = %e, "re-authentication failed"),
        }
        true
    }

    /// Returns `true` if cancelled before the delay elapsed.
    async fn sleep_or_cancel(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }

    fn cancelled(session: MonitorSession) -> MonitorReport {
        tracing::warn!(
            run_id = session.latest.run_id,
            state = %session.latest.state,
            "monitoring cancelled"
        );
        session.finish(MonitorExit::Cancelled)
    }

    fn timed_out(session: MonitorSession) -> MonitorReport {
        tracing::warn!(
            run_id = session.latest.run_id,
            state = %session.latest.state,
            timeslot = %session.config.timeslot,
            "timeslot duration exceeded, stopping monitoring"
        );
        session.finish(MonitorExit::TimedOut)
    }
}
