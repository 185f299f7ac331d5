//! Error taxonomy for the countdown and shortlist subsystems
//!
//! None of these cross the public operations of the store or the countdown
//! engine. They are absorbed into well-defined state and handed to the
//! [`Diagnostics`](crate::utils::Diagnostics) hook instead.

use thiserror::Error;

/// Errors observed inside the core
#[derive(Debug, Error)]
pub enum CoreError {
    /// The countdown target could not be parsed; the countdown is treated as expired
    #[error("invalid target time {input:?}: {reason}")]
    InvalidTargetTime { input: String, reason: String },

    /// Shortlist persistence failed; the store continues in memory only
    #[error("shortlist storage unavailable during {operation}: {reason}")]
    StorageUnavailable {
        operation: &'static str,
        reason: String,
    },

    /// The server offset pushes the effective clock outside the representable range
    #[error("server offset of {offset_ms}ms is out of range")]
    InvalidServerOffset { offset_ms: i64 },

    /// Warning thresholds are out of order
    #[error("danger threshold ({danger_ms}ms) must not exceed warning threshold ({warning_ms}ms)")]
    InvalidThresholds { danger_ms: u64, warning_ms: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Short stable name used in log fields and diagnostics assertions
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTargetTime { .. } => "invalid_target_time",
            Self::StorageUnavailable { .. } => "storage_unavailable",
            Self::InvalidServerOffset { .. } => "invalid_server_offset",
            Self::InvalidThresholds { .. } => "invalid_thresholds",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    pub(crate) fn storage(operation: &'static str, reason: impl ToString) -> Self {
        Self::StorageUnavailable {
            operation,
            reason: reason.to_string(),
        }
    }
}
