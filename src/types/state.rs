//! Settlement state of a deferred value.
//!
//! A deferred value starts `Pending` and settles exactly once, either to
//! `Fulfilled` or to `Rejected`. There are no further transitions.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Externally observable status of a [`Deferred`](crate::deferred::Deferred).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementState {
    /// Not settled yet.
    Pending,
    /// Settled with a success value.
    Fulfilled,
    /// Settled with a failure value.
    Rejected,
}

impl SettlementState {
    /// Returns the terminal state corresponding to an outcome.
    #[must_use]
    pub const fn of<T, E>(outcome: &Result<T, E>) -> Self {
        match outcome {
            Ok(_) => Self::Fulfilled,
            Err(_) => Self::Rejected,
        }
    }

    /// Returns true while the value is still outstanding.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true once the value has settled either way.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !self.is_pending()
    }

    /// Returns the state name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SettlementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true when `from -> to` is a legal settlement transition.
///
/// Staying in the same state is always legal; the only moves are out of
/// `Pending`.
#[must_use]
pub const fn is_valid_transition(from: SettlementState, to: SettlementState) -> bool {
    matches!(
        (from, to),
        (SettlementState::Pending, _)
            | (SettlementState::Fulfilled, SettlementState::Fulfilled)
            | (SettlementState::Rejected, SettlementState::Rejected)
    )
}
