//! Application context handed to UI surfaces

use std::sync::Arc;

use tracing::info;

use super::{ShortlistStore, WarningThresholds, DEFAULT_SHARE_BASE_URL};
use crate::{
    services::{Clock, SystemClock},
    tasks::{spawn_countdown, CountdownConfig, CountdownHandle, CountdownTarget, CountdownTask, ExpireCallback},
    utils::Diagnostics,
};

/// Everything a surface needs, constructed once by the host and passed down
/// explicitly instead of living in process-wide globals.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The one shortlist every surface observes
    pub shortlist: Arc<ShortlistStore>,
    pub clock: Arc<dyn Clock>,
    /// Correction applied to every countdown created through this context
    pub server_offset_ms: i64,
    pub thresholds: WarningThresholds,
    pub share_base_url: String,
    pub diagnostics: Diagnostics,
}

impl AppState {
    /// Create a context over an existing store, using the system clock
    pub fn new(shortlist: Arc<ShortlistStore>, diagnostics: Diagnostics) -> Self {
        Self {
            shortlist,
            clock: Arc::new(SystemClock),
            server_offset_ms: 0,
            thresholds: WarningThresholds::default(),
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
            diagnostics,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_server_offset_ms(mut self, server_offset_ms: i64) -> Self {
        self.server_offset_ms = server_offset_ms;
        self
    }

    pub fn with_thresholds(mut self, thresholds: WarningThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_share_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.share_base_url = base_url.into();
        self
    }

    /// Share link for the current shortlist under the configured base
    pub fn share_link(&self) -> String {
        self.shortlist.generate_share_link(Some(&self.share_base_url))
    }

    /// Build an unstarted countdown task with this context's clock and offset
    pub fn countdown_task(&self, config: CountdownConfig, on_expire: Option<ExpireCallback>) -> CountdownTask {
        CountdownTask::new(
            config.with_server_offset_ms(self.server_offset_ms),
            Arc::clone(&self.clock),
            on_expire,
            &self.diagnostics,
        )
    }

    /// Start an offer countdown (days/hours/minutes)
    pub fn offer_countdown(&self, target: impl Into<CountdownTarget>) -> CountdownHandle {
        info!("Starting offer countdown");
        spawn_countdown(self.countdown_task(CountdownConfig::offer(target), None))
    }

    /// Start a reservation countdown with urgency levels and a one-shot expiry callback
    pub fn reservation_countdown(
        &self,
        target: impl Into<CountdownTarget>,
        on_expire: Option<ExpireCallback>,
    ) -> CountdownHandle {
        info!("Starting reservation countdown");
        let config = CountdownConfig::reservation(target, self.thresholds);
        spawn_countdown(self.countdown_task(config, on_expire))
    }
}
