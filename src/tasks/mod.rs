//! Background tasks module
//! 
//! The countdown scheduled task and the tokio timer that drives it.

pub mod countdown_task;
pub mod countdown_timer;

// Re-export main types
pub use countdown_task::{
    CountdownConfig, CountdownTarget, CountdownTask, CountdownVariant, ExpireCallback, TickOutcome,
};
pub use countdown_timer::{spawn_countdown, CountdownHandle, TICK_INTERVAL};
