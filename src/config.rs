//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

use crate::{
    error::CoreError,
    state::{
        countdown_state::{DEFAULT_DANGER_MS, DEFAULT_WARNING_MS},
        WarningThresholds, DEFAULT_SHARE_BASE_URL,
    },
};

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "presale-reserve")]
#[command(about = "Drive pre-sale reservation countdowns and the unit shortlist")]
#[command(version)]
pub struct Config {
    /// Directory holding the persisted shortlist (memory-only when omitted)
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// JSON file with an array of unit records used to resolve shortlisted IDs
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Base URL for generated share links
    #[arg(long, default_value = DEFAULT_SHARE_BASE_URL)]
    pub base_url: String,

    /// Unit IDs to add to the shortlist
    #[arg(long = "add", value_name = "ID")]
    pub add: Vec<String>,

    /// Unit IDs to remove from the shortlist
    #[arg(long = "remove", value_name = "ID")]
    pub remove: Vec<String>,

    /// Unit IDs to toggle in the shortlist
    #[arg(long = "toggle", value_name = "ID")]
    pub toggle: Vec<String>,

    /// Empty the shortlist before applying other changes
    #[arg(long)]
    pub clear: bool,

    /// Add every unit named in a share link
    #[arg(long, value_name = "URL")]
    pub from_link: Option<String>,

    /// Offer deadline (RFC 3339 or epoch milliseconds)
    #[arg(long, value_name = "INSTANT")]
    pub offer_until: Option<String>,

    /// Reservation expiry (RFC 3339 or epoch milliseconds)
    #[arg(long, value_name = "INSTANT")]
    pub reserve_until: Option<String>,

    /// Milliseconds to add to the local clock to match server time
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub server_offset_ms: i64,

    /// Reservation countdowns turn "danger" below this many milliseconds
    #[arg(long, default_value_t = DEFAULT_DANGER_MS)]
    pub danger_ms: u64,

    /// Reservation countdowns turn "warning" below this many milliseconds
    #[arg(long, default_value_t = DEFAULT_WARNING_MS)]
    pub warning_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Validated warning thresholds
    pub fn thresholds(&self) -> Result<WarningThresholds, CoreError> {
        WarningThresholds::new(self.danger_ms, self.warning_ms)
    }

    /// Whether any countdown was requested
    pub fn has_countdowns(&self) -> bool {
        self.offer_until.is_some() || self.reserve_until.is_some()
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}
