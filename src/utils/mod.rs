//! Utility functions module
//! 
//! Share-link encoding, the diagnostics hook, and signal handling.

pub mod diagnostics;
pub mod share_link;
pub mod signals;

// Re-export main functions
pub use diagnostics::{DiagnosticReport, Diagnostics};
pub use share_link::{encode_share_link, parse_share_link};
pub use signals::shutdown_signal;
