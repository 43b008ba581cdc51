//! Core types shared by the runtime and the combinators.
//!
//! - [`id`]: Identifier and timestamp types (`TaskId`, `Time`)
//! - [`state`]: Externally observable settlement state of a deferred value

pub mod id;
pub mod state;

pub use id::{TaskId, Time};
pub use state::SettlementState;
