//! The four game variants and the house that wires them together.
//!
//! Each variant composes the shared [`engine::RoundEngine`] with its own
//! entry, closing and winner-selection rules.

pub mod duel;
pub mod jackpot;
pub mod roulette;
pub mod wheel;

mod engine;

pub use duel::{DuelGame, DuelSide};
pub use jackpot::{JackpotGame, PotSide};
pub use roulette::{RouletteColor, RouletteGame};
pub use wheel::{WheelColor, WheelGame};

use std::sync::Arc;

use crate::bank::Bank;
use crate::config::EngineConfig;
use crate::oracle::RandomnessGateway;
use crate::round::Clock;

/// One deployment of all four games sharing a gateway, bank and clock.
///
/// Construction only wires capabilities: the gateway owner still has to
/// approve each instance's vault before that game can request numbers.
pub struct House {
    pub duel: DuelGame,
    pub jackpot: JackpotGame,
    pub roulette: RouletteGame,
    pub wheel: WheelGame,
}

impl House {
    pub fn new(
        config: &EngineConfig,
        gateway: Arc<RandomnessGateway>,
        bank: Arc<dyn Bank>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            duel: DuelGame::new(
                config,
                "duel-vault",
                gateway.clone(),
                bank.clone(),
                clock.clone(),
            ),
            jackpot: JackpotGame::new(
                config,
                "jackpot-vault",
                gateway.clone(),
                bank.clone(),
                clock.clone(),
            ),
            roulette: RouletteGame::new(
                config,
                "roulette-vault",
                gateway.clone(),
                bank.clone(),
                clock.clone(),
            ),
            wheel: WheelGame::new(config, "wheel-vault", gateway, bank, clock),
        }
    }

    /// Vault addresses the gateway owner needs to approve.
    pub fn vaults(&self) -> [&str; 4] {
        [
            self.duel.vault(),
            self.jackpot.vault(),
            self.roulette.vault(),
            self.wheel.vault(),
        ]
    }
}
