//! CLI definition using clap derive. Connection settings fall back to
//! `LRE_*` environment variables so CI jobs can keep secrets out of argv.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use lrerun_core::{
    DEFAULT_MAX_ERRORS, DEFAULT_MAX_FAILED_TXNS, InvalidDuration, PostRunAction, ThresholdConfig,
    TimeslotDuration,
};
use lrerun_gateway::{Credentials, DEFAULT_REQUEST_TIMEOUT, RestConfig};

use crate::monitor::{DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL, DEFAULT_RETRY_BACKOFF};
use crate::orchestrator::RunRequest;
use crate::timeslot::ResourceProfile;

#[derive(Parser, Debug)]
#[command(
    name = "lrerun",
    version,
    about = "Start a load test run, monitor it to completion and guard its error budget"
)]
pub struct Cli {
    /// Server root, e.g. https://lre.example.com
    #[arg(long, env = "LRE_SERVER_URL")]
    pub server_url: String,

    #[arg(long, env = "LRE_DOMAIN")]
    pub domain: String,

    #[arg(long, env = "LRE_PROJECT")]
    pub project: String,

    /// User name, or client id with --token-auth
    #[arg(long, env = "LRE_USERNAME")]
    pub username: String,

    /// Password, or client secret with --token-auth
    #[arg(long, env = "LRE_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Authenticate with an API token (client id/secret)
    #[arg(long, env = "LRE_TOKEN_AUTH")]
    pub token_auth: bool,

    #[arg(long, env = "LRE_TEST_ID")]
    pub test_id: u64,

    #[arg(long, default_value_t = 0)]
    pub timeslot_hours: u32,

    #[arg(long, default_value_t = 30)]
    pub timeslot_minutes: u32,

    /// do-not-collate | collate-results | collate-and-analyse
    #[arg(long, default_value = "collate-and-analyse")]
    pub post_run_action: PostRunAction,

    /// Reserve virtual-user-day licenses
    #[arg(long)]
    pub vuds: bool,

    #[arg(long, default_value_t = 0)]
    pub vuds_amount: u32,

    /// Seconds between status polls
    #[arg(
        long,
        default_value_t = DEFAULT_POLL_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval_secs: u64,

    /// Consecutive status failures before re-authenticating
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Seconds to wait after a failed status poll
    #[arg(
        long,
        default_value_t = DEFAULT_RETRY_BACKOFF.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub retry_backoff_secs: u64,

    /// Abort a running test once this many errors were reported
    #[arg(long, default_value_t = DEFAULT_MAX_ERRORS)]
    pub max_errors: u64,

    /// Abort a running test once this many transactions failed
    #[arg(long, default_value_t = DEFAULT_MAX_FAILED_TXNS)]
    pub max_failed_txns: u64,

    /// Write the run id to this file once the run started
    #[arg(long)]
    pub run_id_file: Option<PathBuf>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub request_timeout_secs: u64,

    /// Print the final run report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
            token_auth: self.token_auth,
        }
    }

    pub fn rest_config(&self) -> RestConfig {
        RestConfig {
            server_url: self.server_url.clone(),
            domain: self.domain.clone(),
            project: self.project.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// Validates the hours/minutes split; the total is re-checked when the
    /// timeslot is negotiated.
    pub fn run_request(&self) -> Result<RunRequest, InvalidDuration> {
        let duration = TimeslotDuration::from_parts(self.timeslot_hours, self.timeslot_minutes)?;
        Ok(RunRequest {
            test_id: self.test_id,
            timeslot_minutes: duration.total_minutes(),
            profile: ResourceProfile {
                use_vuds: self.vuds,
                vuds_amount: self.vuds_amount,
                post_run_action: self.post_run_action,
            },
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_retries: self.max_retries,
            retry_backoff: Duration::from_secs(self.retry_backoff_secs),
            thresholds: ThresholdConfig {
                max_errors: self.max_errors,
                max_failed_txns: self.max_failed_txns,
            },
            run_id_file: self.run_id_file.clone(),
        })
    }
}
