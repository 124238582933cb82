use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Error ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown run state: {0:?}")]
    RunState(String),
    #[error("unknown post-run action: {0:?}")]
    PostRunAction(String),
}

// ─── RunState ─────────────────────────────────────────────────────

/// Remote execution phase as reported by the run status endpoint.
///
/// Opaque to the client: the remote side may skip or repeat phases, so no
/// ordering is implied by the declaration order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum RunState {
    #[default]
    Undefined,
    Initializing,
    Running,
    Stopping,
    BeforeCollatingResults,
    CollatingResults,
    BeforeCreatingAnalysisData,
    PendingCreatingAnalysisData,
    CreatingAnalysisData,
    Finished,
    FailedCollatingResults,
    FailedCreatingAnalysisData,
    RunFailure,
    Canceled,
}

impl RunState {
    pub const ALL: [Self; 14] = [
        Self::Undefined,
        Self::Initializing,
        Self::Running,
        Self::Stopping,
        Self::BeforeCollatingResults,
        Self::CollatingResults,
        Self::BeforeCreatingAnalysisData,
        Self::PendingCreatingAnalysisData,
        Self::CreatingAnalysisData,
        Self::Finished,
        Self::FailedCollatingResults,
        Self::FailedCreatingAnalysisData,
        Self::RunFailure,
        Self::Canceled,
    ];

    /// Wire name used by the remote service.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "",
            Self::Initializing => "Initializing",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::BeforeCollatingResults => "Before Collating Results",
            Self::CollatingResults => "Collating Results",
            Self::BeforeCreatingAnalysisData => "Before Creating Analysis Data",
            Self::PendingCreatingAnalysisData => "Pending Creating Analysis Data",
            Self::CreatingAnalysisData => "Creating Analysis Data",
            Self::Finished => "Finished",
            Self::FailedCollatingResults => "Failed Collating Results",
            Self::FailedCreatingAnalysisData => "Failed Creating Analysis Data",
            Self::RunFailure => "Run Failure",
            Self::Canceled => "Canceled",
        }
    }

    /// Parse a wire name, mapping anything unrecognised to `Undefined`.
    pub fn from_wire(value: &str) -> Self {
        value.parse().unwrap_or(Self::Undefined)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for RunState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseError::RunState(s.to_string()))
    }
}

impl From<RunState> for String {
    fn from(state: RunState) -> Self {
        state.as_str().to_string()
    }
}

impl From<String> for RunState {
    fn from(value: String) -> Self {
        Self::from_wire(&value)
    }
}

// ─── PostRunAction ────────────────────────────────────────────────

/// What the remote service does once the load phase ends. Decides which
/// states end monitoring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostRunAction {
    DoNotCollate,
    CollateResults,
    #[default]
    CollateAndAnalyse,
}

const DO_NOT_COLLATE_TERMINAL: &[RunState] = &[
    RunState::BeforeCollatingResults,
    RunState::RunFailure,
    RunState::Canceled,
];

const COLLATE_TERMINAL: &[RunState] = &[
    RunState::BeforeCreatingAnalysisData,
    RunState::RunFailure,
    RunState::Canceled,
];

const COLLATE_AND_ANALYSE_TERMINAL: &[RunState] =
    &[RunState::Finished, RunState::RunFailure, RunState::Canceled];

impl PostRunAction {
    pub const ALL: [Self; 3] = [
        Self::DoNotCollate,
        Self::CollateResults,
        Self::CollateAndAnalyse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DoNotCollate => "Do Not Collate",
            Self::CollateResults => "Collate Results",
            Self::CollateAndAnalyse => "Collate and Analyse",
        }
    }

    /// Numeric code expected in reservation and start-run payloads.
    pub fn numeric_value(self) -> u8 {
        match self {
            Self::DoNotCollate => 0,
            Self::CollateResults => 1,
            Self::CollateAndAnalyse => 2,
        }
    }

    pub fn terminal_states(self) -> &'static [RunState] {
        match self {
            Self::DoNotCollate => DO_NOT_COLLATE_TERMINAL,
            Self::CollateResults => COLLATE_TERMINAL,
            Self::CollateAndAnalyse => COLLATE_AND_ANALYSE_TERMINAL,
        }
    }

    pub fn is_terminal(self, state: RunState) -> bool {
        self.terminal_states().contains(&state)
    }
}

impl fmt::Display for PostRunAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostRunAction {
    type Err = ParseError;

    /// Accepts the display name ("Collate and Analyse") as well as the
    /// kebab/snake spellings used on the command line.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == '-' || c == '_' { ' ' } else { c })
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "do not collate" | "do nothing" => Ok(Self::DoNotCollate),
            "collate results" | "collate" => Ok(Self::CollateResults),
            "collate and analyse" | "collate and analyze" => Ok(Self::CollateAndAnalyse),
            _ => Err(ParseError::PostRunAction(s.to_string())),
        }
    }
}

// ─── RunStatusSnapshot ────────────────────────────────────────────

/// One observation of a remote run. Each poll produces a fresh value that
/// supersedes the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatusSnapshot {
    pub run_id: u64,
    pub state: RunState,
    pub total_errors: u64,
    pub total_failed_transactions: u64,
    /// Remote-reported duration in seconds, when known.
    pub duration_secs: Option<u64>,
    pub timeslot_id: Option<u64>,
    pub total_passed_transactions: Option<u64>,
}

impl RunStatusSnapshot {
    /// Synthetic snapshot standing in for "nothing observed yet".
    pub fn initial(run_id: u64) -> Self {
        Self {
            run_id,
            state: RunState::Undefined,
            total_errors: 0,
            total_failed_transactions: 0,
            duration_secs: None,
            timeslot_id: None,
            total_passed_transactions: None,
        }
    }

    pub fn new(run_id: u64, state: RunState) -> Self {
        Self {
            state,
            ..Self::initial(run_id)
        }
    }

    #[must_use]
    pub fn with_counters(mut self, errors: u64, failed_transactions: u64) -> Self {
        self.total_errors = errors;
        self.total_failed_transactions = failed_transactions;
        self
    }
}
