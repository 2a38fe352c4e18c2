//! Round lifecycle primitives shared by every game variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ledger::{PoolLedger, Side};
use crate::payout::WinningSelector;
use crate::{RequestId, RoundId};

/// Lifecycle of a single betting round.
///
/// `Open -> Closed -> AwaitingRandomness -> Settled`, with `Refunded` as
/// the early-exit terminal for rounds that never filled. `Closed` is
/// derived from the close rule rather than stored; see
/// [`Round::effective_state`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundState {
    Open,
    Closed,
    AwaitingRandomness,
    Settled,
    Refunded,
}

impl RoundState {
    /// Settled and Refunded rounds are immutable history.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundState::Settled | RoundState::Refunded)
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundState::Open => write!(f, "open"),
            RoundState::Closed => write!(f, "closed"),
            RoundState::AwaitingRandomness => write!(f, "awaitingrandomness"),
            RoundState::Settled => write!(f, "settled"),
            RoundState::Refunded => write!(f, "refunded"),
        }
    }
}

/// When an open round stops accepting entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CloseRule {
    /// The entry window elapses a fixed number of seconds after `opened_at`.
    AfterWindow { secs: u64 },
    /// A fixed number of entries fills the round (duel lobbies).
    Capacity { entries: usize },
}

/// One betting cycle from opening to settlement, sequentially numbered
/// within its game instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "S: Side"))]
pub struct Round<S: Side> {
    pub id: RoundId,
    state: RoundState,
    pub opened_at: u64,
    pub ledger: PoolLedger<S>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<WinningSelector<S>>,
}

impl<S: Side> Round<S> {
    pub(crate) fn new(id: RoundId, opened_at: u64) -> Self {
        Self {
            id,
            state: RoundState::Open,
            opened_at,
            ledger: PoolLedger::new(),
            request_id: None,
            winner: None,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: RoundState) {
        self.state = state;
    }

    /// State as the close rule sees it at `now`: a stored `Open` becomes
    /// `Closed` once the rule holds. All guards go through this so no
    /// explicit transition is needed when a window simply runs out.
    pub fn effective_state(&self, rule: CloseRule, now: u64) -> RoundState {
        match self.state {
            RoundState::Open => {
                let closed = match rule {
                    CloseRule::AfterWindow { secs } => now.saturating_sub(self.opened_at) >= secs,
                    CloseRule::Capacity { entries } => self.ledger.entries().len() >= entries,
                };
                if closed {
                    RoundState::Closed
                } else {
                    RoundState::Open
                }
            }
            other => other,
        }
    }
}

/// Time source seam so round lifecycles can be driven deterministically
/// in tests.
pub trait Clock: Send + Sync {
    /// Seconds since the unix epoch.
    fn now(&self) -> u64;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Manually advanced clock for tests and simulations.
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::RouletteColor;

    #[test]
    fn test_terminal_states() {
        assert!(RoundState::Settled.is_terminal());
        assert!(RoundState::Refunded.is_terminal());
        assert!(!RoundState::Open.is_terminal());
        assert!(!RoundState::AwaitingRandomness.is_terminal());
    }

    #[test]
    fn test_window_close_rule() {
        let round: Round<RouletteColor> = Round::new(0, 1_000);
        let rule = CloseRule::AfterWindow { secs: 60 };

        assert_eq!(round.effective_state(rule, 1_000), RoundState::Open);
        assert_eq!(round.effective_state(rule, 1_059), RoundState::Open);
        assert_eq!(round.effective_state(rule, 1_060), RoundState::Closed);
        assert_eq!(round.effective_state(rule, 2_000), RoundState::Closed);
    }

    #[test]
    fn test_capacity_close_rule() {
        let mut round: Round<RouletteColor> = Round::new(0, 1_000);
        let rule = CloseRule::Capacity { entries: 2 };

        assert_eq!(round.effective_state(rule, 9_999), RoundState::Open);
        round
            .ledger
            .deposit(RouletteColor::Black, "alice", 5)
            .expect("deposit");
        round
            .ledger
            .deposit(RouletteColor::Red, "bob", 5)
            .expect("deposit");
        assert_eq!(round.effective_state(rule, 1_000), RoundState::Closed);
    }

    #[test]
    fn test_stored_state_wins_over_rule() {
        let mut round: Round<RouletteColor> = Round::new(0, 1_000);
        round.set_state(RoundState::AwaitingRandomness);
        let rule = CloseRule::AfterWindow { secs: 60 };
        assert_eq!(
            round.effective_state(rule, 1_000),
            RoundState::AwaitingRandomness
        );
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        clock.advance(61);
        assert_eq!(clock.now(), 161);
    }
}
