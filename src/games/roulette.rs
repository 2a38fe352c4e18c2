//! Three-color roulette: every color wins with flat one-third odds and
//! the pool is distributed pari-mutuel inside the winning color.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::engine::RoundEngine;
use crate::bank::Bank;
use crate::config::EngineConfig;
use crate::errors::FortunaResult;
use crate::ledger::{Entry, Side};
use crate::oracle::RandomnessGateway;
use crate::payout::{PayoutPlan, WinningSelector};
use crate::round::{Clock, CloseRule, Round};
use crate::stats::HouseStats;
use crate::{Address, Amount, RequestId, RoundId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouletteColor {
    Black,
    Red,
    Green,
}

impl fmt::Display for RouletteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouletteColor::Black => write!(f, "black"),
            RouletteColor::Red => write!(f, "red"),
            RouletteColor::Green => write!(f, "green"),
        }
    }
}

impl Side for RouletteColor {
    const ALL: &'static [RouletteColor] = &[
        RouletteColor::Black,
        RouletteColor::Red,
        RouletteColor::Green,
    ];
}

/// Color odds are a flat one third each; only the payout inside the
/// winning color is stake-weighted.
fn winning_color(value: u128) -> RouletteColor {
    RouletteColor::ALL[(value % RouletteColor::ALL.len() as u128) as usize]
}

pub struct RouletteGame {
    engine: RoundEngine<RouletteColor>,
}

impl RouletteGame {
    pub fn new(
        config: &EngineConfig,
        vault: impl Into<Address>,
        gateway: Arc<RandomnessGateway>,
        bank: Arc<dyn Bank>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine: RoundEngine::new(
                "roulette",
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

    /// Stake on a color in the open round.
    pub async fn enter_round(
        &self,
        player: &str,
        color: RouletteColor,
        stake: Amount,
    ) -> FortunaResult<()> {
        let id = self.engine.current_round_id().await?;
        self.engine.deposit(id, color, player, stake).await
    }

    pub async fn send_request_for_number(&self) -> FortunaResult<RequestId> {
        let id = self.engine.current_round_id().await?;
        self.engine.request_randomness(id).await
    }

    /// Settle the current round from the engine's own ledger.
    pub async fn close_round(&self) -> FortunaResult<PayoutPlan> {
        let id = self.engine.current_round_id().await?;
        self.engine
            .settle(id, None, |value, _ledger| {
                WinningSelector::Side(winning_color(value))
            })
            .await
    }

    /// Settle with a caller-supplied participant list as a verified
    /// hint: the list must match the recorded entries exactly, in
    /// arrival order, or nothing is paid.
    pub async fn close_round_with_hint(
        &self,
        hint: &[Entry<RouletteColor>],
    ) -> FortunaResult<PayoutPlan> {
        let id = self.engine.current_round_id().await?;
        self.engine
            .settle(id, Some(hint), |value, _ledger| {
                WinningSelector::Side(winning_color(value))
            })
            .await
    }

    /// Winning color of a settled round.
    pub async fn round_winning_color(&self, id: RoundId) -> FortunaResult<Option<RouletteColor>> {
        let round = self.engine.round(id).await?;
        Ok(match round.winner {
            Some(WinningSelector::Side(color)) => Some(color),
            _ => None,
        })
    }

    pub async fn round(&self, id: RoundId) -> FortunaResult<Round<RouletteColor>> {
        self.engine.round(id).await
    }

    pub async fn round_count(&self) -> usize {
        self.engine.round_count().await
    }

    pub async fn stats(&self) -> HouseStats {
        self.engine.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::InMemoryBank;
    use crate::errors::FortunaError;
    use crate::oracle::LocalCoordinator;
    use crate::round::{ManualClock, RoundState};

    const UNIT: Amount = 1_000_000_000_000_000_000;

    struct Fixture {
        coordinator: Arc<LocalCoordinator>,
        gateway: Arc<RandomnessGateway>,
        bank: Arc<InMemoryBank>,
        clock: Arc<ManualClock>,
        roulette: RouletteGame,
    }

    fn fixture() -> Fixture {
        let coordinator = Arc::new(LocalCoordinator::new("vrf-coordinator", [5u8; 32]));
        let gateway = Arc::new(RandomnessGateway::new(
            "owner",
            "vrf-coordinator",
            coordinator.clone(),
        ));
        let bank = Arc::new(InMemoryBank::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let roulette = RouletteGame::new(
            &EngineConfig::default(),
            "roulette-vault",
            gateway.clone(),
            bank.clone(),
            clock.clone(),
        );
        gateway
            .approve("owner", "roulette-vault", true)
            .expect("approve");
        for player in ["p1", "p2", "p3", "p4", "p5", "p6", "p7"] {
            bank.mint(player, 10 * UNIT);
        }
        Fixture {
            coordinator,
            gateway,
            bank,
            clock,
            roulette,
        }
    }

    #[test]
    fn test_color_mapping() {
        assert_eq!(winning_color(0), RouletteColor::Black);
        assert_eq!(winning_color(1), RouletteColor::Red);
        assert_eq!(winning_color(2), RouletteColor::Green);
        assert_eq!(winning_color(3), RouletteColor::Black);
    }

    #[tokio::test]
    async fn test_single_round_at_a_time() {
        let f = fixture();

        let id = f.roulette.create_round().await.expect("create");
        let round = f.roulette.round(id).await.expect("round");
        assert_eq!(round.opened_at, 1_000);

        let err = f
            .roulette
            .create_round()
            .await
            .expect_err("current round is not closed");
        assert!(matches!(err, FortunaError::AlreadyActive { .. }));
    }

    #[tokio::test]
    async fn test_enter_only_while_open() {
        let f = fixture();
        let id = f.roulette.create_round().await.expect("create");

        f.roulette
            .enter_round("p1", RouletteColor::Black, UNIT)
            .await
            .expect("enter");
        f.roulette
            .enter_round("p2", RouletteColor::Red, UNIT)
            .await
            .expect("enter");
        f.roulette
            .enter_round("p3", RouletteColor::Green, UNIT)
            .await
            .expect("enter");

        let round = f.roulette.round(id).await.expect("round");
        assert_eq!(round.ledger.pool(RouletteColor::Black), UNIT);
        assert_eq!(round.ledger.pool(RouletteColor::Red), UNIT);
        assert_eq!(round.ledger.pool(RouletteColor::Green), UNIT);

        f.clock.advance(61);
        let err = f
            .roulette
            .enter_round("p1", RouletteColor::Black, UNIT)
            .await
            .expect_err("round is closed");
        assert!(matches!(err, FortunaError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_request_only_when_closed() {
        let f = fixture();
        f.roulette.create_round().await.expect("create");

        let err = f
            .roulette
            .send_request_for_number()
            .await
            .expect_err("round is not closed");
        assert!(matches!(err, FortunaError::InvalidState { .. }));

        f.clock.advance(61);
        let request = f
            .roulette
            .send_request_for_number()
            .await
            .expect("request");
        assert_ne!(request, 0);

        let err = f
            .roulette
            .send_request_for_number()
            .await
            .expect_err("no re-request once pending");
        assert!(matches!(err, FortunaError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_close_only_when_number_generated() {
        let f = fixture();
        let id = f.roulette.create_round().await.expect("create");
        f.roulette
            .enter_round("p1", RouletteColor::Black, UNIT)
            .await
            .expect("enter");

        f.clock.advance(61);
        let request = f
            .roulette
            .send_request_for_number()
            .await
            .expect("request");

        let err = f
            .roulette
            .close_round()
            .await
            .expect_err("the request was not fulfilled");
        assert!(matches!(err, FortunaError::RandomnessPending { .. }));

        f.coordinator.fulfill(&f.gateway, request).expect("fulfill");
        f.roulette.close_round().await.expect("close");

        let round = f.roulette.round(id).await.expect("round");
        assert_eq!(round.state(), RoundState::Settled);
        assert!(f
            .roulette
            .round_winning_color(id)
            .await
            .expect("round")
            .is_some());

        // The instance accepts a new round afterwards.
        f.roulette.create_round().await.expect("next round");
        assert_eq!(f.roulette.round_count().await, 2);
    }

    #[tokio::test]
    async fn test_full_pool_to_single_color_winner() {
        let f = fixture();
        let id = f.roulette.create_round().await.expect("create");

        f.roulette
            .enter_round("p1", RouletteColor::Black, UNIT)
            .await
            .expect("enter");
        f.roulette
            .enter_round("p2", RouletteColor::Red, UNIT)
            .await
            .expect("enter");
        f.roulette
            .enter_round("p3", RouletteColor::Green, UNIT)
            .await
            .expect("enter");

        f.clock.advance(61);
        let request = f
            .roulette
            .send_request_for_number()
            .await
            .expect("request");
        // 5 % 3 == 2: green wins and p3 alone takes the net pool.
        f.coordinator
            .fulfill_with(&f.gateway, request, 5)
            .expect("fulfill");
        let plan = f.roulette.close_round().await.expect("close");

        let total = 3 * UNIT;
        let commission = total / 10;
        assert_eq!(
            plan.payouts,
            vec![("p3".to_string(), total - commission)]
        );
        assert_eq!(
            f.roulette.round_winning_color(id).await.expect("round"),
            Some(RouletteColor::Green)
        );
        assert_eq!(f.bank.balance("p3").await, 9 * UNIT + total - commission);
        assert!(plan.is_exact());
    }

    #[tokio::test]
    async fn test_house_keeps_commission() {
        let f = fixture();
        f.roulette.create_round().await.expect("create");

        f.roulette
            .enter_round("p1", RouletteColor::Black, UNIT)
            .await
            .expect("enter");
        f.roulette
            .enter_round("p1", RouletteColor::Red, UNIT)
            .await
            .expect("enter");

        f.clock.advance(61);
        let request = f
            .roulette
            .send_request_for_number()
            .await
            .expect("request");
        // Black wins; p1 holds the whole winning pool.
        f.coordinator
            .fulfill_with(&f.gateway, request, 0)
            .expect("fulfill");
        f.roulette.close_round().await.expect("close");

        assert_eq!(f.bank.balance("roulette-vault").await, 2 * UNIT / 10);
        assert_eq!(f.bank.balance("p1").await, 10 * UNIT - 2 * UNIT / 10);
    }

    #[tokio::test]
    async fn test_distribution_proportional_to_stake() {
        let f = fixture();
        let id = f.roulette.create_round().await.expect("create");

        for player in ["p1", "p2", "p3", "p4"] {
            f.roulette
                .enter_round(player, RouletteColor::Black, UNIT)
                .await
                .expect("enter");
        }
        for player in ["p5", "p6", "p7", "p1", "p2"] {
            f.roulette
                .enter_round(player, RouletteColor::Red, UNIT)
                .await
                .expect("enter");
        }

        f.clock.advance(61);
        let request = f
            .roulette
            .send_request_for_number()
            .await
            .expect("request");
        // 7 % 3 == 1: red wins.
        f.coordinator
            .fulfill_with(&f.gateway, request, 7)
            .expect("fulfill");
        let plan = f.roulette.close_round().await.expect("close");

        let total = 9 * UNIT;
        let commission = total * 10 / 100;
        let winning_pool = 5 * UNIT;
        let profit = total - commission - winning_pool;
        let per_person = profit / 5 + UNIT;

        assert_eq!(
            f.roulette.round_winning_color(id).await.expect("round"),
            Some(RouletteColor::Red)
        );
        assert_eq!(plan.payouts.len(), 5);
        for (_, amount) in &plan.payouts {
            assert_eq!(*amount, per_person);
        }
        assert!(plan.is_exact());

        // Pure red bettors gained per_person on top of their stake.
        assert_eq!(f.bank.balance("p5").await, 9 * UNIT + per_person);
        // Double entrants paid two stakes, their red ticket won once.
        assert_eq!(f.bank.balance("p1").await, 8 * UNIT + per_person);
        assert_eq!(f.bank.balance("roulette-vault").await, commission);
    }

    #[tokio::test]
    async fn test_hint_must_match_ledger() {
        let f = fixture();
        let id = f.roulette.create_round().await.expect("create");
        f.roulette
            .enter_round("p1", RouletteColor::Black, UNIT)
            .await
            .expect("enter");
        f.roulette
            .enter_round("p2", RouletteColor::Red, UNIT)
            .await
            .expect("enter");

        f.clock.advance(61);
        let request = f
            .roulette
            .send_request_for_number()
            .await
            .expect("request");
        f.coordinator.fulfill(&f.gateway, request).expect("fulfill");

        // Wrong list: missing a participant.
        let wrong = vec![Entry {
            player: "p1".to_string(),
            side: RouletteColor::Black,
            stake: UNIT,
        }];
        let err = f
            .roulette
            .close_round_with_hint(&wrong)
            .await
            .expect_err("hint must match ledger");
        assert!(matches!(err, FortunaError::ParticipantMismatch { .. }));

        // Nothing was paid and the round is still retryable.
        assert_eq!(f.bank.balance("roulette-vault").await, 2 * UNIT);

        let recorded = f.roulette.round(id).await.expect("round");
        f.roulette
            .close_round_with_hint(recorded.ledger.entries())
            .await
            .expect("close with exact list");
    }
}
