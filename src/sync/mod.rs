//! Synchronization primitives for asynchronous operations.
//!
//! - [`LockRegistry`]: per-key serialization ("synchronized")

mod keyed;

pub use keyed::{LockRegistry, Predecessor};
