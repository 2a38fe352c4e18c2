//! Fortuna - Provably Fair Wagering Engines
//!
//! Round-based games of chance (head-to-head duels, pooled jackpots,
//! three-color roulette, weighted wheel) built on a shared round
//! lifecycle, an access-controlled randomness gateway and exact
//! pari-mutuel settlement arithmetic.

pub mod bank;
pub mod config;
pub mod errors;
pub mod games;
pub mod ledger;
pub mod oracle;
pub mod payout;
pub mod round;
pub mod stats;

pub use bank::{Bank, InMemoryBank};
pub use config::{ConfigLoader, EngineConfig};
pub use errors::{FortunaError, FortunaResult};
pub use games::{
    DuelGame, DuelSide, House, JackpotGame, PotSide, RouletteColor, RouletteGame, WheelColor,
    WheelGame,
};
pub use ledger::{Entry, PoolLedger, Side};
pub use oracle::{LocalCoordinator, OracleClient, RandomnessGateway, RandomnessRequest};
pub use payout::{PayoutPlan, WinningSelector};
pub use round::{Clock, ManualClock, Round, RoundState, SystemClock};
pub use stats::HouseStats;

/// Stake amount in the asset's smallest unit.
pub type Amount = u64;

/// Sequential round identifier within one game instance; never reused.
pub type RoundId = u64;

/// Sequential randomness request identifier; 0 is never issued.
pub type RequestId = u64;

/// Participant identity (wallet address or session ID).
pub type Address = String;
