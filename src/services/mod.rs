//! External collaborators module
//! 
//! Clocks, shortlist persistence backends and the unit catalog. The core
//! talks to each of these through a trait so hosts and tests can swap them.

pub mod catalog;
pub mod clock;
pub mod persistence;

// Re-export main types
pub use catalog::{StaticCatalog, UnitCatalog};
pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use persistence::{
    JsonFileStorage, KeyValuePersistence, KeyValueStorage, MemoryStorage, PersistedShortlist,
    ShortlistPersistence, STORAGE_KEY,
};
