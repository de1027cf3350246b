//! Long-term memory for MoMo.
//!
//! Facts the model asks to remember are kept with an importance score that
//! halves every week unless the model reinforces them. The highest-ranked
//! facts are shown to the model at the start of each session.

pub mod file_backend;
pub mod item;
pub mod store;

pub use item::{DecayCurve, MemoryItem};
pub use store::{MemorySnapshot, MemoryStore, SnapshotEntry};

/// Default store capacity.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default number of memories shown to the model.
pub const DEFAULT_TOP_K: usize = 32;

/// Default importance added by one reinforcement.
pub const DEFAULT_REINFORCE_BOOST: f64 = 0.5;
