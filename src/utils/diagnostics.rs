//! Debug hook for absorbed errors

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::CoreError;

/// A single absorbed error as seen by the diagnostics hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub kind: &'static str,
    pub message: String,
    pub reported_at: DateTime<Utc>,
}

/// Shared sink for errors the core recovers from locally.
///
/// Every report is logged. Reports are also kept so hosts and tests can
/// observe degraded capabilities after the fact.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    reports: Arc<Mutex<Vec<DiagnosticReport>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an absorbed error
    pub fn report(&self, error: CoreError) {
        warn!(kind = error.kind(), "{}", error);
        let report = DiagnosticReport {
            kind: error.kind(),
            message: error.to_string(),
            reported_at: Utc::now(),
        };
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
    }

    /// All reports so far, oldest first
    pub fn reports(&self) -> Vec<DiagnosticReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of reports of the given kind
    pub fn count(&self, kind: &str) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|report| report.kind == kind)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}
