//! Request and response bodies exchanged with the remote service.
//!
//! Field names follow the service's PascalCase JSON.

use lrerun_core::{PostRunAction, RunState, RunStatusSnapshot, TimeslotDuration};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name shared by the default test set and its folder.
pub const DEFAULT_TEST_SET_NAME: &str = "AutoTestSet";
pub const DEFAULT_TEST_SET_FOLDER_NAME: &str = "AutoTestSet";
const DEFAULT_TEST_SET_COMMENT: &str = "auto test set";

// ─── Credentials ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Authenticate with an API client id/secret pair instead of basic auth.
    pub token_auth: bool,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("token_auth", &self.token_auth)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TokenAuthRequest<'a> {
    #[serde(rename = "ClientIdKey")]
    pub client_id_key: &'a str,
    #[serde(rename = "ClientSecretKey")]
    pub client_secret_key: &'a str,
}

// ─── Test sets & instances ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestInstance {
    #[serde(rename = "TestID")]
    pub test_id: u64,
    #[serde(rename = "TestSetID")]
    pub test_set_id: u64,
    #[serde(rename = "TestInstanceID")]
    pub test_instance_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestInstanceCreateRequest {
    #[serde(rename = "TestID")]
    pub test_id: u64,
    #[serde(rename = "TestSetID")]
    pub test_set_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSet {
    #[serde(rename = "TestSetName", default)]
    pub name: String,
    #[serde(rename = "TestSetComment", default)]
    pub comment: Option<String>,
    #[serde(rename = "TestSetParentId", default)]
    pub parent_id: u64,
    #[serde(rename = "TestSetID")]
    pub test_set_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSetCreateRequest {
    #[serde(rename = "TestSetName")]
    pub name: String,
    #[serde(rename = "TestSetComment")]
    pub comment: String,
    #[serde(rename = "TestSetParentId")]
    pub parent_id: u64,
}

impl TestSetCreateRequest {
    /// The default test set, placed under `folder_id`.
    pub fn default_in(folder_id: u64) -> Self {
        Self {
            name: DEFAULT_TEST_SET_NAME.to_string(),
            comment: DEFAULT_TEST_SET_COMMENT.to_string(),
            parent_id: folder_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSetFolder {
    #[serde(rename = "TestSetFolderName", default)]
    pub name: String,
    #[serde(rename = "Parent", default)]
    pub parent_id: u64,
    #[serde(rename = "TestSetFolderId")]
    pub test_set_folder_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSetFolderCreateRequest {
    #[serde(rename = "TestSetFolderName")]
    pub name: String,
    #[serde(rename = "Parent")]
    pub parent_id: u64,
}

impl Default for TestSetFolderCreateRequest {
    fn default() -> Self {
        Self {
            name: DEFAULT_TEST_SET_FOLDER_NAME.to_string(),
            parent_id: 0,
        }
    }
}

// ─── Reservation / start-run payload ──────────────────────────────

/// Candidate reservation. The same body is sent to the availability check
/// and to start the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeslotRequest {
    #[serde(rename = "DurationInMinutes")]
    pub duration_in_minutes: u32,
    #[serde(rename = "IsUseVuds")]
    pub use_vuds: bool,
    #[serde(rename = "VudsAmount")]
    pub vuds_amount: u32,
    #[serde(rename = "IsNewReservationMode")]
    pub new_reservation_mode: bool,
    #[serde(rename = "PostRunAction")]
    pub post_run_action: u8,
    #[serde(rename = "TestInstanceId")]
    pub test_instance_id: u64,
    #[serde(rename = "ReservationId")]
    pub reservation_id: i64,
}

impl TimeslotRequest {
    pub fn new(
        duration: TimeslotDuration,
        use_vuds: bool,
        vuds_amount: u32,
        post_run_action: PostRunAction,
        test_instance_id: u64,
    ) -> Self {
        Self {
            duration_in_minutes: duration.total_minutes(),
            use_vuds,
            vuds_amount,
            new_reservation_mode: true,
            post_run_action: post_run_action.numeric_value(),
            test_instance_id,
            reservation_id: -1,
        }
    }
}

// ─── Runs ─────────────────────────────────────────────────────────

/// Identifiers returned once the remote service accepted a start-run request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLaunch {
    /// Run id used by the status and abort endpoints.
    pub run_id: u64,
    /// The service's own internal run id.
    pub internal_run_id: u64,
    pub dashboard_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StartRunResponse {
    #[serde(rename = "RunId", default)]
    pub run_id: u64,
    #[serde(rename = "QcRunId")]
    pub qc_run_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RunStatusResponse {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "Duration", default)]
    pub duration: Option<u64>,
    #[serde(rename = "RunState", default)]
    pub run_state: Option<String>,
    #[serde(rename = "TimeslotID", default)]
    pub timeslot_id: Option<u64>,
    #[serde(rename = "TotalPassedTransactions", default)]
    pub total_passed_transactions: Option<u64>,
    #[serde(rename = "TotalFailedTransactions", default)]
    pub total_failed_transactions: Option<u64>,
    #[serde(rename = "TotalErrors", default)]
    pub total_errors: Option<u64>,
}

impl RunStatusResponse {
    pub fn into_snapshot(self) -> RunStatusSnapshot {
        let raw_state = self.run_state.unwrap_or_default();
        let state = RunState::from_wire(&raw_state);
        if state == RunState::Undefined && !raw_state.trim().is_empty() {
            tracing::warn!(run_id = self.id, raw_state = %raw_state, "unrecognised run state");
        }
        RunStatusSnapshot {
            run_id: self.id,
            state,
            total_errors: self.total_errors.unwrap_or(0),
            total_failed_transactions: self.total_failed_transactions.unwrap_or(0),
            duration_secs: self.duration,
            timeslot_id: self.timeslot_id,
            total_passed_transactions: self.total_passed_transactions,
        }
    }
}
