//! Single-line run status rendering for the monitor's periodic log.

use std::time::Duration;

use lrerun_core::{RunState, progress_bar};

/// `HH:MM:SS`; hours are not wrapped at 24.
pub(crate) fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub(crate) fn format_status_line(
    run_id: u64,
    state: RunState,
    elapsed: Duration,
    timeslot: Duration,
    percent: u8,
) -> String {
    let remaining = timeslot.saturating_sub(elapsed);
    format!(
        "| {:<10} | {:<40} | {:<25} | {:<14} | {:<14} | {:<20} |",
        format!("RunId: {run_id}"),
        format!("State: {state}"),
        format!("Elapsed: {}", format_hms(elapsed)),
        format!("Timeslot: {}", format_hms(timeslot)),
        format!("Time remaining: {}", format_hms(remaining)),
        format!("{percent:>3}% {}", progress_bar(percent)),
    )
}
