//! Countdown scheduled task
//!
//! A [`CountdownTask`] owns everything one countdown needs and moves through a
//! one-way state machine:
//!
//! ```text
//! Active --(remaining reaches zero)--> Expired
//! ```
//!
//! The expiration callback is consumed on that transition, so it cannot run
//! twice. The task never reads a timer itself: [`tick`](CountdownTask::tick)
//! is driven by the runner in [`super::countdown_timer`] or by tests.

use std::{fmt, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::{
    error::CoreError,
    services::Clock,
    state::{CountdownState, WarningThresholds},
    utils::Diagnostics,
};

/// The instant a countdown resolves toward
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownTarget {
    At(DateTime<Utc>),
    /// Unparseable input; behaves as already expired
    Invalid { input: String, reason: String },
}

impl CountdownTarget {
    /// Parse an RFC 3339 timestamp or integer epoch milliseconds
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if let Ok(millis) = trimmed.parse::<i64>() {
            return match DateTime::from_timestamp_millis(millis) {
                Some(instant) => Self::At(instant),
                None => Self::Invalid {
                    input: input.to_string(),
                    reason: "epoch milliseconds out of range".to_string(),
                },
            };
        }

        match DateTime::parse_from_rfc3339(trimmed) {
            Ok(instant) => Self::At(instant.with_timezone(&Utc)),
            Err(e) => Self::Invalid {
                input: input.to_string(),
                reason: e.to_string(),
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::At(_))
    }
}

impl From<DateTime<Utc>> for CountdownTarget {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::At(instant)
    }
}

/// Which flavour of countdown a surface shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownVariant {
    /// Days, hours and minutes for an offer deadline
    Offer,
    /// Full breakdown, `HH:MM:SS` text and urgency levels
    Reservation(WarningThresholds),
}

/// Inputs a surface supplies to start a countdown
#[derive(Debug, Clone)]
pub struct CountdownConfig {
    pub target: CountdownTarget,
    /// Added to the local clock to approximate server time
    pub server_offset_ms: i64,
    pub variant: CountdownVariant,
}

impl CountdownConfig {
    pub fn offer(target: impl Into<CountdownTarget>) -> Self {
        Self {
            target: target.into(),
            server_offset_ms: 0,
            variant: CountdownVariant::Offer,
        }
    }

    pub fn reservation(target: impl Into<CountdownTarget>, thresholds: WarningThresholds) -> Self {
        Self {
            target: target.into(),
            server_offset_ms: 0,
            variant: CountdownVariant::Reservation(thresholds),
        }
    }

    pub fn with_server_offset_ms(mut self, server_offset_ms: i64) -> Self {
        self.server_offset_ms = server_offset_ms;
        self
    }
}

/// Zero-argument callback run when a countdown expires
pub type ExpireCallback = Box<dyn FnOnce() + Send + 'static>;

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Time remains; keep ticking
    Running,
    /// This tick reached zero; the timer should stop
    Expired,
    /// Already expired on an earlier tick; nothing happened
    Finished,
}

enum Phase {
    Active { on_expire: Option<ExpireCallback> },
    Expired,
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active { on_expire } => f
                .debug_struct("Active")
                .field("has_callback", &on_expire.is_some())
                .finish(),
            Self::Expired => f.write_str("Expired"),
        }
    }
}

/// One countdown instance, exclusively owned by the surface that created it
#[derive(Debug)]
pub struct CountdownTask {
    config: CountdownConfig,
    clock: Arc<dyn Clock>,
    state: CountdownState,
    phase: Phase,
}

impl CountdownTask {
    /// Create the task and compute its initial state.
    ///
    /// An invalid target or an out-of-range server offset is reported to
    /// `diagnostics` and yields an expired state; the callback still runs
    /// once, on the first tick.
    pub fn new(
        config: CountdownConfig,
        clock: Arc<dyn Clock>,
        on_expire: Option<ExpireCallback>,
        diagnostics: &Diagnostics,
    ) -> Self {
        if let CountdownTarget::Invalid { input, reason } = &config.target {
            diagnostics.report(CoreError::InvalidTargetTime {
                input: input.clone(),
                reason: reason.clone(),
            });
        }

        let mut task = Self {
            config,
            clock,
            state: CountdownState::expired(),
            phase: Phase::Active { on_expire },
        };
        if task.effective_now().is_none() {
            diagnostics.report(CoreError::InvalidServerOffset {
                offset_ms: task.config.server_offset_ms,
            });
        }
        task.state = task.render(task.remaining_ms());
        debug!(
            "Countdown created: remaining_ms={}, variant={:?}",
            task.state.remaining_ms, task.config.variant
        );
        task
    }

    /// Latest computed state
    pub fn state(&self) -> &CountdownState {
        &self.state
    }

    pub fn config(&self) -> &CountdownConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active { .. })
    }

    /// `local now + server offset`, or `None` when that is out of range
    pub fn effective_now(&self) -> Option<DateTime<Utc>> {
        Duration::try_milliseconds(self.config.server_offset_ms)
            .and_then(|offset| self.clock.now().checked_add_signed(offset))
    }

    /// Milliseconds until the target, never negative.
    ///
    /// An out-of-range effective clock counts as expired.
    pub fn remaining_ms(&self) -> u64 {
        let CountdownTarget::At(target) = &self.config.target else {
            return 0;
        };
        let Some(now) = self.effective_now() else {
            return 0;
        };
        target
            .signed_duration_since(now)
            .num_milliseconds()
            .try_into()
            .unwrap_or(0)
    }

    /// Recompute the state. Reaching zero moves the task to `Expired` and
    /// runs the callback; later ticks are no-ops.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_active() {
            return TickOutcome::Finished;
        }

        let remaining = self.remaining_ms();
        if remaining > 0 {
            self.state = self.render(remaining);
            return TickOutcome::Running;
        }

        self.state = self.render(0);
        if let Phase::Active { on_expire } = std::mem::replace(&mut self.phase, Phase::Expired) {
            info!("Countdown expired");
            if let Some(callback) = on_expire {
                callback();
            }
        }
        TickOutcome::Expired
    }

    fn render(&self, remaining_ms: u64) -> CountdownState {
        let state = CountdownState::decompose(remaining_ms);
        match &self.config.variant {
            CountdownVariant::Offer => state,
            CountdownVariant::Reservation(thresholds) => state.with_reservation(thresholds),
        }
    }
}
