//! State management module
//! 
//! Countdown and shortlist state, the shared shortlist store, and the
//! application context that carries them to UI surfaces.

pub mod app_state;
pub mod countdown_state;
pub mod shortlist_state;
pub mod shortlist_store;

// Re-export main types
pub use app_state::AppState;
pub use countdown_state::{CountdownState, WarningLevel, WarningThresholds};
pub use shortlist_state::{ShortlistState, UnitRecord};
pub use shortlist_store::{ShortlistStore, Subscription, DEFAULT_SHARE_BASE_URL};
