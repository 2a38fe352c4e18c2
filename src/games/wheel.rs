//! Weighted wheel: the winning color's odds are proportional to its
//! pool share, with sub-pools laid end to end as wheel segments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::engine::RoundEngine;
use crate::bank::Bank;
use crate::config::EngineConfig;
use crate::errors::{FortunaError, FortunaResult};
use crate::ledger::{Entry, Side};
use crate::oracle::RandomnessGateway;
use crate::payout::{PayoutPlan, WinningSelector};
use crate::round::{Clock, CloseRule, Round, RoundState};
use crate::stats::HouseStats;
use crate::{Address, Amount, RequestId, RoundId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WheelColor {
    Bronze,
    Silver,
    Gold,
}

impl fmt::Display for WheelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WheelColor::Bronze => write!(f, "bronze"),
            WheelColor::Silver => write!(f, "silver"),
            WheelColor::Gold => write!(f, "gold"),
        }
    }
}

impl Side for WheelColor {
    const ALL: &'static [WheelColor] = &[WheelColor::Bronze, WheelColor::Silver, WheelColor::Gold];
}

pub struct WheelGame {
    engine: RoundEngine<WheelColor>,
}

impl WheelGame {
    pub fn new(
        config: &EngineConfig,
        vault: impl Into<Address>,
        gateway: Arc<RandomnessGateway>,
        bank: Arc<dyn Bank>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine: RoundEngine::new(
                "wheel",
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

    /// Stake on a wheel segment in the open round.
    pub async fn enter_round(
        &self,
        player: &str,
        color: WheelColor,
        stake: Amount,
    ) -> FortunaResult<()> {
        let id = self.engine.current_round_id().await?;
        self.engine.deposit(id, color, player, stake).await
    }

    pub async fn send_request_for_number(&self) -> FortunaResult<RequestId> {
        let id = self.engine.current_round_id().await?;
        self.engine.request_randomness(id).await
    }

    /// Sub-pool sizes of one round, in segment order.
    pub async fn pools(&self, id: RoundId) -> FortunaResult<Vec<(WheelColor, Amount)>> {
        let round = self.engine.round(id).await?;
        Ok(WheelColor::ALL
            .iter()
            .map(|color| (*color, round.ledger.pool(*color)))
            .collect())
    }

    /// Preview the winning segment of the current round once its number
    /// is fulfilled, without settling. `None` for an empty round.
    pub async fn winning_color(&self) -> FortunaResult<Option<WheelColor>> {
        let id = self.engine.current_round_id().await?;
        let round = self.engine.round(id).await?;
        let request = match (round.state(), round.request_id) {
            (RoundState::AwaitingRandomness, Some(request)) => request,
            (state, _) => {
                return Err(FortunaError::InvalidState {
                    round: id,
                    expected: RoundState::AwaitingRandomness,
                    actual: state,
                })
            }
        };
        let (fulfilled, value) = self.engine.request_status(request);
        if !fulfilled {
            return Err(FortunaError::RandomnessPending { request });
        }
        Ok(round.ledger.pick_side(value))
    }

    /// Settle the current round: the ticket `value % pool` lands in one
    /// segment and that segment's bettors split the prize by stake.
    pub async fn close_round(&self) -> FortunaResult<PayoutPlan> {
        let id = self.engine.current_round_id().await?;
        self.engine
            .settle(id, None, |value, ledger| match ledger.pick_side(value) {
                Some(color) => WinningSelector::Side(color),
                None => WinningSelector::Nobody,
            })
            .await
    }

    /// Settle with a caller-supplied participant list as a verified
    /// hint; see [`RouletteGame::close_round_with_hint`].
    ///
    /// [`RouletteGame::close_round_with_hint`]: crate::games::RouletteGame::close_round_with_hint
    pub async fn close_round_with_hint(
        &self,
        hint: &[Entry<WheelColor>],
    ) -> FortunaResult<PayoutPlan> {
        let id = self.engine.current_round_id().await?;
        self.engine
            .settle(id, Some(hint), |value, ledger| match ledger.pick_side(value) {
                Some(color) => WinningSelector::Side(color),
                None => WinningSelector::Nobody,
            })
            .await
    }

    /// Winning segment of a settled round.
    pub async fn round_winning_color(&self, id: RoundId) -> FortunaResult<Option<WheelColor>> {
        let round = self.engine.round(id).await?;
        Ok(match round.winner {
            Some(WinningSelector::Side(color)) => Some(color),
            _ => None,
        })
    }

    pub async fn round(&self, id: RoundId) -> FortunaResult<Round<WheelColor>> {
        self.engine.round(id).await
    }

    pub async fn stats(&self) -> HouseStats {
        self.engine.stats().await
    }
}
