//! Completion estimate for a remote run, for display only.
//!
//! Each phase owns a progress band and a planning fraction of the total
//! timeslot it is expected to consume. The fractions are calibration
//! constants, not measurements; they only keep the progress bar moving
//! smoothly between phases. Termination never depends on this module.

use crate::types::RunState;

/// Width of the rendered progress bar in cells.
pub const PROGRESS_BAR_WIDTH: usize = 20;

const RUNNING_START: u64 = 10;
const RUNNING_END: u64 = 85;

/// Planning fractions are expressed in per-mille of the total timeslot.
const PER_MILLE: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Band {
    start: u64,
    end: u64,
    fraction_per_mille: u64,
}

const INITIALIZING: Band = Band {
    start: 0,
    end: 10,
    fraction_per_mille: 50,
};
const BEFORE_COLLATING: Band = Band {
    start: 85,
    end: 87,
    fraction_per_mille: 20,
};
const COLLATING: Band = Band {
    start: 87,
    end: 92,
    fraction_per_mille: 40,
};
const BEFORE_ANALYSIS: Band = Band {
    start: 92,
    end: 94,
    fraction_per_mille: 20,
};
const ANALYSIS: Band = Band {
    start: 94,
    end: 98,
    fraction_per_mille: 20,
};

/// Running takes whatever the other phases leave over.
const RUNNING_FRACTION: u64 = PER_MILLE
    - INITIALIZING.fraction_per_mille
    - BEFORE_COLLATING.fraction_per_mille
    - COLLATING.fraction_per_mille
    - BEFORE_ANALYSIS.fraction_per_mille
    - ANALYSIS.fraction_per_mille;

/// Fixed calibration order used to estimate when a phase starts. This is not
/// the order in which states are observed.
const CALIBRATION_ORDER: [(RunState, u64); 6] = [
    (RunState::Initializing, INITIALIZING.fraction_per_mille),
    (RunState::Running, RUNNING_FRACTION),
    (RunState::BeforeCollatingResults, BEFORE_COLLATING.fraction_per_mille),
    (RunState::CollatingResults, COLLATING.fraction_per_mille),
    (RunState::BeforeCreatingAnalysisData, BEFORE_ANALYSIS.fraction_per_mille),
    (RunState::CreatingAnalysisData, ANALYSIS.fraction_per_mille),
];

fn band(state: RunState) -> Option<Band> {
    match state {
        RunState::Initializing => Some(INITIALIZING),
        RunState::BeforeCollatingResults => Some(BEFORE_COLLATING),
        RunState::CollatingResults => Some(COLLATING),
        RunState::BeforeCreatingAnalysisData => Some(BEFORE_ANALYSIS),
        RunState::CreatingAnalysisData => Some(ANALYSIS),
        _ => None,
    }
}

/// Pre-assigned start percentage, for states that have one.
fn start_percent(state: RunState) -> Option<u64> {
    match state {
        RunState::Running => Some(RUNNING_START),
        RunState::Stopping => Some(RUNNING_END),
        RunState::PendingCreatingAnalysisData => Some(ANALYSIS.start),
        RunState::Finished => Some(100),
        other => band(other).map(|b| b.start),
    }
}

fn scale(total_ms: u64, per_mille: u64) -> u64 {
    (u128::from(total_ms) * u128::from(per_mille) / u128::from(PER_MILLE)) as u64
}

/// Linear interpolation of `done / window` into `[start, end]`, clamped.
fn interpolate(start: u64, end: u64, done: u64, window: u64) -> u64 {
    if window == 0 {
        return start;
    }
    let range = u128::from(end - start);
    let step = range * u128::from(done) / u128::from(window);
    start + (step.min(range) as u64)
}

fn estimated_start_ms(state: RunState, total_ms: u64) -> u64 {
    let preceding: u64 = CALIBRATION_ORDER
        .iter()
        .take_while(|(s, _)| *s != state)
        .map(|(_, fraction)| fraction)
        .sum();
    scale(total_ms, preceding)
}

/// Completion percentage (0..=100) for `state` after `elapsed_ms` of a
/// timeslot lasting `total_ms`.
///
/// `Finished` is always 100. `Running` never exceeds 85, even past the end of
/// the timeslot.
pub fn progress(state: RunState, elapsed_ms: u64, total_ms: u64) -> u8 {
    if state == RunState::Finished {
        return 100;
    }
    if total_ms == 0 {
        return start_percent(state).unwrap_or(0) as u8;
    }

    let percent = if state == RunState::Running {
        interpolate(RUNNING_START, RUNNING_END, elapsed_ms, total_ms)
    } else if let Some(b) = band(state) {
        let since_start = elapsed_ms.saturating_sub(estimated_start_ms(state, total_ms));
        let window = scale(total_ms, b.fraction_per_mille);
        interpolate(b.start, b.end, since_start, window)
    } else {
        start_percent(state).unwrap_or(0)
    };

    percent.min(100) as u8
}

/// Render `percent` as a fixed-width bar of filled and empty cells.
pub fn progress_bar(percent: u8) -> String {
    let percent = usize::from(percent.min(100));
    let filled = percent * PROGRESS_BAR_WIDTH / 100;
    "█".repeat(filled) + &"░".repeat(PROGRESS_BAR_WIDTH - filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MIN: u64 = 60_000;

    #[test]
    fn finished_is_always_complete() {
        assert_eq!(progress(RunState::Finished, 0, 30 * MIN), 100);
        assert_eq!(progress(RunState::Finished, 0, 0), 100);
        assert_eq!(progress(RunState::Finished, 999 * MIN, MIN), 100);
    }

    #[test]
    fn running_starts_at_band_floor() {
        assert_eq!(progress(RunState::Running, 0, 60 * MIN), 10);
    }

    #[test]
    fn running_halfway_is_midpoint_of_band() {
        // 10 + 75 * 0.5 = 47.5, truncated
        assert_eq!(progress(RunState::Running, 30 * MIN, 60 * MIN), 47);
    }

    #[test]
    fn running_is_capped_past_timeslot() {
        assert_eq!(progress(RunState::Running, 60 * MIN, 60 * MIN), 85);
        assert_eq!(progress(RunState::Running, 600 * MIN, 60 * MIN), 85);
    }

    #[test]
    fn initializing_advances_within_its_window() {
        let total = 100 * MIN;
        // Initializing owns the first 5% of the timeslot.
        assert_eq!(progress(RunState::Initializing, 0, total), 0);
        assert_eq!(progress(RunState::Initializing, 2 * MIN + 30_000, total), 5);
        assert_eq!(progress(RunState::Initializing, 5 * MIN, total), 10);
        assert_eq!(progress(RunState::Initializing, 50 * MIN, total), 10);
    }

    #[test]
    fn collating_uses_estimated_start_from_calibration_order() {
        let total = 100 * MIN;
        // Preceding fractions: 5% + 85% + 2% = 92% → estimated start at 92 min.
        assert_eq!(progress(RunState::CollatingResults, 10 * MIN, total), 87);
        assert_eq!(progress(RunState::CollatingResults, 92 * MIN, total), 87);
        assert_eq!(progress(RunState::CollatingResults, 94 * MIN, total), 89);
        assert_eq!(progress(RunState::CollatingResults, 96 * MIN, total), 92);
        assert_eq!(progress(RunState::CollatingResults, 500 * MIN, total), 92);
    }

    #[test]
    fn analysis_band_is_bounded() {
        let total = 100 * MIN;
        assert_eq!(progress(RunState::CreatingAnalysisData, 0, total), 94);
        assert_eq!(progress(RunState::CreatingAnalysisData, 1000 * MIN, total), 98);
    }

    #[test]
    fn unbanded_states_use_start_percentage_or_zero() {
        let total = 60 * MIN;
        assert_eq!(progress(RunState::Stopping, 10 * MIN, total), 85);
        assert_eq!(progress(RunState::PendingCreatingAnalysisData, 0, total), 94);
        assert_eq!(progress(RunState::Undefined, 10 * MIN, total), 0);
        assert_eq!(progress(RunState::RunFailure, 10 * MIN, total), 0);
        assert_eq!(progress(RunState::Canceled, 10 * MIN, total), 0);
    }

    #[test]
    fn zero_total_falls_back_to_start_percentage() {
        assert_eq!(progress(RunState::Running, 5 * MIN, 0), 10);
        assert_eq!(progress(RunState::CollatingResults, 5 * MIN, 0), 87);
    }

    #[test]
    fn running_fraction_is_the_remainder() {
        assert_eq!(RUNNING_FRACTION, 850);
    }

    #[test]
    fn progress_bar_rendering() {
        assert_eq!(progress_bar(0), "░".repeat(20));
        assert_eq!(progress_bar(100), "█".repeat(20));
        assert_eq!(progress_bar(50), "█".repeat(10) + &"░".repeat(10));
        assert_eq!(progress_bar(200).chars().count(), PROGRESS_BAR_WIDTH);
    }

    proptest! {
        #[test]
        fn running_is_monotonic_and_capped(
            total in 1u64..=28_800 * MIN,
            a in 0u64..=60_000 * MIN,
            b in 0u64..=60_000 * MIN,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let p_lo = progress(RunState::Running, lo, total);
            let p_hi = progress(RunState::Running, hi, total);
            prop_assert!(p_lo <= p_hi);
            prop_assert!(p_hi <= 85);
            prop_assert!(p_lo >= 10);
        }

        #[test]
        fn every_state_stays_in_range(
            idx in 0usize..RunState::ALL.len(),
            elapsed in 0u64..=60_000 * MIN,
            total in 0u64..=28_800 * MIN,
        ) {
            let state = RunState::ALL[idx];
            prop_assert!(progress(state, elapsed, total) <= 100);
        }
    }
}
