//! Time: clock sources, sleeping, and delayed settlement.
//!
//! - [`sleep`] / [`sleep_until`]: futures backed by the runtime's timer heap
//! - [`delayed_resolve`] / [`delayed_reject`] / [`delay`]: deferred values
//!   that settle after a fixed delay
//! - [`VirtualClock`] / [`WallClock`]: the two [`TimeSource`]s

mod delay;
mod driver;
mod sleep;

pub use delay::{delay, delayed_reject, delayed_resolve};
pub use driver::{TimeSource, VirtualClock, WallClock};
pub use sleep::{Sleep, sleep, sleep_until};
