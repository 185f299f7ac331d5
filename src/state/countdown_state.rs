//! Countdown state and urgency classification

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const MS_PER_SECOND: u64 = 1_000;
pub const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
pub const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
pub const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Default lower threshold: danger below five minutes
pub const DEFAULT_DANGER_MS: u64 = 5 * MS_PER_MINUTE;
/// Default upper threshold: warning below fifteen minutes
pub const DEFAULT_WARNING_MS: u64 = 15 * MS_PER_MINUTE;

/// Urgency of a reservation countdown, ordered from calm to urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Normal,
    Warning,
    Danger,
}

impl WarningLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

/// Millisecond thresholds for [`WarningLevel`] classification.
///
/// `remaining < danger_ms` is danger, `remaining < warning_ms` is warning,
/// everything else is normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningThresholds {
    danger_ms: u64,
    warning_ms: u64,
}

impl WarningThresholds {
    pub fn new(danger_ms: u64, warning_ms: u64) -> Result<Self, CoreError> {
        if danger_ms > warning_ms {
            return Err(CoreError::InvalidThresholds {
                danger_ms,
                warning_ms,
            });
        }
        Ok(Self {
            danger_ms,
            warning_ms,
        })
    }

    pub fn danger_ms(&self) -> u64 {
        self.danger_ms
    }

    pub fn warning_ms(&self) -> u64 {
        self.warning_ms
    }

    pub fn classify(&self, remaining_ms: u64) -> WarningLevel {
        if remaining_ms < self.danger_ms {
            WarningLevel::Danger
        } else if remaining_ms < self.warning_ms {
            WarningLevel::Warning
        } else {
            WarningLevel::Normal
        }
    }
}

impl Default for WarningThresholds {
    fn default() -> Self {
        Self {
            danger_ms: DEFAULT_DANGER_MS,
            warning_ms: DEFAULT_WARNING_MS,
        }
    }
}

/// Remaining time as seen by a countdown consumer on one tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownState {
    pub remaining_ms: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub is_expired: bool,
    /// Reservation countdowns only
    pub warning_level: Option<WarningLevel>,
    /// Reservation countdowns only, `HH:MM:SS`
    pub formatted: Option<String>,
}

impl CountdownState {
    /// Break `remaining_ms` into days, hours, minutes and seconds.
    ///
    /// Zero means expired.
    pub fn decompose(remaining_ms: u64) -> Self {
        Self {
            remaining_ms,
            days: remaining_ms / MS_PER_DAY,
            hours: (remaining_ms % MS_PER_DAY) / MS_PER_HOUR,
            minutes: (remaining_ms % MS_PER_HOUR) / MS_PER_MINUTE,
            seconds: (remaining_ms % MS_PER_MINUTE) / MS_PER_SECOND,
            is_expired: remaining_ms == 0,
            warning_level: None,
            formatted: None,
        }
    }

    /// The terminal state: every field zero
    pub fn expired() -> Self {
        Self::decompose(0)
    }

    /// Attach the reservation-only fields
    pub fn with_reservation(mut self, thresholds: &WarningThresholds) -> Self {
        self.warning_level = Some(thresholds.classify(self.remaining_ms));
        self.formatted = Some(self.format_hms());
        self
    }

    /// Milliseconds below the seconds field
    pub fn sub_second_ms(&self) -> u64 {
        self.remaining_ms % MS_PER_SECOND
    }

    /// Zero-padded `HH:MM:SS`, with whole days folded into the hours
    pub fn format_hms(&self) -> String {
        format!(
            "{:02}:{:02}:{:02}",
            self.days * 24 + self.hours,
            self.minutes,
            self.seconds
        )
    }
}

impl Default for CountdownState {
    fn default() -> Self {
        Self::expired()
    }
}
