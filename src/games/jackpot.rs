//! Pooled jackpot: everyone stakes into a single pot and one ticket
//! takes it all, minus commission, with win probability proportional to
//! stake.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::engine::RoundEngine;
use crate::bank::Bank;
use crate::config::EngineConfig;
use crate::errors::FortunaResult;
use crate::ledger::Side;
use crate::oracle::RandomnessGateway;
use crate::payout::{PayoutPlan, WinningSelector};
use crate::round::{Clock, CloseRule, Round};
use crate::stats::HouseStats;
use crate::{Address, Amount, RequestId, RoundId};

/// The jackpot's single sub-pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PotSide {
    Pot,
}

impl fmt::Display for PotSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pot")
    }
}

impl Side for PotSide {
    const ALL: &'static [PotSide] = &[PotSide::Pot];
}

pub struct JackpotGame {
    engine: RoundEngine<PotSide>,
}

impl JackpotGame {
    pub fn new(
        config: &EngineConfig,
        vault: impl Into<Address>,
        gateway: Arc<RandomnessGateway>,
        bank: Arc<dyn Bank>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine: RoundEngine::new(
                "jackpot",
                vault.into(),
                config.commission_rate,
                CloseRule::AfterWindow {
                    secs: config.entry_window_secs,
                },
                gateway,
                bank,
                clock,
            ),
        }
    }

    pub fn vault(&self) -> &str {
        self.engine.vault()
    }

    pub async fn create_round(&self) -> FortunaResult<RoundId> {
        self.engine.create_round().await
    }

    /// Stake into the open pot. Repeat entries by one bettor are
    /// recorded as separate tickets.
    pub async fn enter(&self, player: &str, stake: Amount) -> FortunaResult<()> {
        let id = self.engine.current_round_id().await?;
        self.engine.deposit(id, PotSide::Pot, player, stake).await
    }

    pub async fn send_request_for_number(&self) -> FortunaResult<RequestId> {
        let id = self.engine.current_round_id().await?;
        self.engine.request_randomness(id).await
    }

    /// Settle the current round: `value % pool` lands on one cumulative
    /// stake bucket and that ticket's owner takes the pot minus
    /// commission. An empty round settles with no winner.
    pub async fn close_round(&self) -> FortunaResult<PayoutPlan> {
        let id = self.engine.current_round_id().await?;
        self.engine
            .settle(id, None, |value, ledger| match ledger.pick_entry(value) {
                Some(entry) => WinningSelector::Player(entry.player.clone()),
                None => WinningSelector::Nobody,
            })
            .await
    }

    /// Winner of a settled round, if anyone entered it.
    pub async fn round_winner(&self, id: RoundId) -> FortunaResult<Option<Address>> {
        let round = self.engine.round(id).await?;
        Ok(match round.winner {
            Some(WinningSelector::Player(player)) => Some(player),
            _ => None,
        })
    }

    pub async fn round(&self, id: RoundId) -> FortunaResult<Round<PotSide>> {
        self.engine.round(id).await
    }

    pub async fn stats(&self) -> HouseStats {
        self.engine.stats().await
    }
}
