//! Presale Reserve - time-bounded reservations and a shared unit shortlist
//!
//! This library provides the stateful core of a pre-sale site: countdowns
//! toward a server-anchored expiration instant that degrade through urgency
//! levels, and a subscribable shortlist of selected units that any number of
//! UI surfaces can observe.

pub mod config;
pub mod error;
pub mod state;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::CoreError;
pub use state::{AppState, CountdownState, ShortlistState, ShortlistStore, WarningLevel, WarningThresholds};
pub use tasks::{spawn_countdown, CountdownHandle, CountdownTarget, CountdownTask};
pub use utils::Diagnostics;
