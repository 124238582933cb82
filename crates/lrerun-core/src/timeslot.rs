//! Timeslot duration validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Longest reservation the remote service accepts (20 days).
pub const MAX_HOURS: u32 = 480;

pub const MINUTES_PER_HOUR: u32 = 60;

pub const MAX_TOTAL_MINUTES: u32 = MAX_HOURS * MINUTES_PER_HOUR;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidDuration {
    #[error("timeslot hours must be within 0..=480, got {0}")]
    Hours(u32),
    #[error("timeslot minutes must be within 0..=59, got {0}")]
    Minutes(u32),
    #[error("timeslot duration must be greater than zero")]
    Zero,
    #[error("timeslot duration of {0} minutes exceeds the maximum of 480 hours")]
    TooLong(u32),
}

/// A validated reservation length: strictly positive, at most 480 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TimeslotDuration(u32);

impl TimeslotDuration {
    /// Build from the hours/minutes components used in run configuration.
    pub fn from_parts(hours: u32, minutes: u32) -> Result<Self, InvalidDuration> {
        if hours > MAX_HOURS {
            return Err(InvalidDuration::Hours(hours));
        }
        if minutes >= MINUTES_PER_HOUR {
            return Err(InvalidDuration::Minutes(minutes));
        }
        Self::from_minutes(hours * MINUTES_PER_HOUR + minutes)
    }

    pub fn from_minutes(total: u32) -> Result<Self, InvalidDuration> {
        match total {
            0 => Err(InvalidDuration::Zero),
            t if t > MAX_TOTAL_MINUTES => Err(InvalidDuration::TooLong(t)),
            t => Ok(Self(t)),
        }
    }

    pub fn total_minutes(self) -> u32 {
        self.0
    }

    pub fn hours(self) -> u32 {
        self.0 / MINUTES_PER_HOUR
    }

    pub fn minutes(self) -> u32 {
        self.0 % MINUTES_PER_HOUR
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(u64::from(self.0) * 60)
    }
}

impl TryFrom<u32> for TimeslotDuration {
    type Error = InvalidDuration;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_minutes(value)
    }
}

impl From<TimeslotDuration> for u32 {
    fn from(value: TimeslotDuration) -> Self {
        value.0
    }
}

impl fmt::Display for TimeslotDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02} (hh:mm)", self.hours(), self.minutes())
    }
}
