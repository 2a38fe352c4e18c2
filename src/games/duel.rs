//! Head-to-head duel lobbies.
//!
//! Two players stake on opposite sides; the oracle word's parity picks
//! the winner. A lobby that never fills can be force-closed after the
//! timeout, refunding its sole occupant without touching the oracle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::engine::RoundEngine;
use crate::bank::Bank;
use crate::config::EngineConfig;
use crate::errors::{FortunaError, FortunaResult};
use crate::ledger::Side;
use crate::oracle::RandomnessGateway;
use crate::payout::{PayoutPlan, WinningSelector};
use crate::round::{Clock, CloseRule, Round, RoundState};
use crate::stats::HouseStats;
use crate::{Address, Amount, RequestId, RoundId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuelSide {
    Blue,
    Red,
}

impl DuelSide {
    pub fn opponent(&self) -> DuelSide {
        match self {
            DuelSide::Blue => DuelSide::Red,
            DuelSide::Red => DuelSide::Blue,
        }
    }
}

impl fmt::Display for DuelSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuelSide::Blue => write!(f, "blue"),
            DuelSide::Red => write!(f, "red"),
        }
    }
}

impl Side for DuelSide {
    const ALL: &'static [DuelSide] = &[DuelSide::Blue, DuelSide::Red];
}

pub struct DuelGame {
    engine: RoundEngine<DuelSide>,
    timeout_secs: u64,
}

impl DuelGame {
    pub fn new(
        config: &EngineConfig,
        vault: impl Into<Address>,
        gateway: Arc<RandomnessGateway>,
        bank: Arc<dyn Bank>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine: RoundEngine::new(
                "duel",
                vault.into(),
                config.commission_rate,
                CloseRule::Capacity { entries: 2 },
                gateway,
                bank,
                clock,
            ),
            timeout_secs: config.duel_timeout_secs,
        }
    }

    pub fn vault(&self) -> &str {
        self.engine.vault()
    }

    /// Open a lobby with the creator staked on `side`.
    pub async fn create_lobby(
        &self,
        player: &str,
        side: DuelSide,
        stake: Amount,
    ) -> FortunaResult<RoundId> {
        self.engine.create_round_with_entry(side, player, stake).await
    }

    /// Join the free side of an open lobby. Filling the lobby closes it
    /// and immediately requests its random number, so the instance must
    /// already be approved on the gateway.
    pub async fn enter_lobby(&self, id: RoundId, player: &str, stake: Amount) -> FortunaResult<RequestId> {
        let round = self.engine.round(id).await?;
        let state = self.engine.effective_state(id).await?;
        if state != RoundState::Open {
            if round.ledger.entries().len() >= 2 {
                return Err(FortunaError::LobbyFull { round: id });
            }
            return Err(FortunaError::InvalidState {
                round: id,
                expected: RoundState::Open,
                actual: state,
            });
        }
        if !self.engine.is_approved() {
            return Err(FortunaError::Unauthorized {
                caller: self.engine.vault().to_string(),
            });
        }

        let side = round
            .ledger
            .entries()
            .first()
            .map(|e| e.side.opponent())
            .unwrap_or(DuelSide::Blue);
        self.engine.deposit(id, side, player, stake).await?;
        self.engine.request_randomness(id).await
    }

    /// Refund path for a lobby that never filled.
    pub async fn close_lobby_after_time(&self, id: RoundId) -> FortunaResult<()> {
        self.engine.refund_after_timeout(id, self.timeout_secs).await
    }

    /// Re-request hook in case the automatic request at fill time was
    /// rejected by the oracle transport.
    pub async fn send_request_for_number(&self, id: RoundId) -> FortunaResult<RequestId> {
        self.engine.request_randomness(id).await
    }

    /// Settle a full lobby once its number is available: even values
    /// pick the first entrant, odd values the second.
    pub async fn start_lobby(&self, id: RoundId) -> FortunaResult<PayoutPlan> {
        self.engine
            .settle(id, None, |value, ledger| {
                let index = if value % 2 == 0 { 0 } else { 1 };
                match ledger.entries().get(index) {
                    Some(entry) => WinningSelector::Player(entry.player.clone()),
                    None => WinningSelector::Nobody,
                }
            })
            .await
    }

    /// Winner of a settled lobby.
    pub async fn lobby_winner(&self, id: RoundId) -> FortunaResult<Address> {
        let round = self.engine.round(id).await?;
        match round.winner {
            Some(WinningSelector::Player(player)) => Ok(player),
            _ => Err(FortunaError::InvalidState {
                round: id,
                expected: RoundState::Settled,
                actual: round.state(),
            }),
        }
    }

    pub async fn lobby(&self, id: RoundId) -> FortunaResult<Round<DuelSide>> {
        self.engine.round(id).await
    }

    pub async fn stats(&self) -> HouseStats {
        self.engine.stats().await
    }
}
