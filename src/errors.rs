//! Error types for the wagering engines.
//!
//! Every state-changing operation validates its preconditions before any
//! mutation; on failure the whole operation is rejected with one of these
//! variants and nothing is written. Timing failures are distinguishable
//! from permanent rejections by variant alone so integrators can decide
//! what to retry.

use crate::round::RoundState;
use crate::{Address, RequestId, RoundId};

/// Convenience alias used throughout the crate.
pub type FortunaResult<T> = Result<T, FortunaError>;

#[derive(Debug, thiserror::Error)]
pub enum FortunaError {
    #[error("caller {caller} is not allowed to perform this operation")]
    Unauthorized { caller: Address },

    #[error("round {round} is {actual}, expected {expected}")]
    InvalidState {
        round: RoundId,
        expected: RoundState,
        actual: RoundState,
    },

    #[error("round {round} is still active, settle or refund it first")]
    AlreadyActive { round: RoundId },

    #[error("randomness request {request} was never issued")]
    UnknownRequest { request: RequestId },

    #[error("randomness request {request} was already fulfilled")]
    AlreadyFulfilled { request: RequestId },

    #[error("randomness request {request} was not fulfilled yet")]
    RandomnessPending { request: RequestId },

    #[error("stake must be greater than zero")]
    ZeroStake,

    #[error("lobby {round} is full")]
    LobbyFull { round: RoundId },

    #[error("round {round} cannot be closed yet")]
    TimeoutNotReached { round: RoundId },

    #[error("supplied participant list does not match the ledger for round {round}")]
    ParticipantMismatch { round: RoundId },

    #[error("transfer failed: {reason}")]
    TransferFailed { reason: String },

    #[error("round {round} does not exist")]
    UnknownRound { round: RoundId },

    #[error("pool arithmetic overflow")]
    Overflow,

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl FortunaError {
    /// Whether retrying the identical call later can succeed. Timing
    /// failures clear on their own; authorization and argument failures
    /// never do.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FortunaError::InvalidState { .. }
                | FortunaError::RandomnessPending { .. }
                | FortunaError::TimeoutNotReached { .. }
                | FortunaError::TransferFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let pending = FortunaError::RandomnessPending { request: 7 };
        assert!(pending.is_retryable());

        let unauthorized = FortunaError::Unauthorized {
            caller: "mallory".to_string(),
        };
        assert!(!unauthorized.is_retryable());

        assert!(!FortunaError::ZeroStake.is_retryable());
        assert!(FortunaError::TransferFailed {
            reason: "insufficient funds".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = FortunaError::InvalidState {
            round: 3,
            expected: RoundState::Closed,
            actual: RoundState::Open,
        };
        assert_eq!(err.to_string(), "round 3 is open, expected closed");

        let err = FortunaError::AlreadyFulfilled { request: 12 };
        assert!(err.to_string().contains("12"));
    }
}
