//! Shared round-lifecycle engine composed by every game variant.
//!
//! Owns the sequential round table of one game instance, enforces the
//! single-active-round invariant, escrows stakes in the instance vault
//! and runs fail-atomic settlement. Variants supply the close rule and
//! the winner-selection rule; everything else lives here.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::bank::Bank;
use crate::errors::{FortunaError, FortunaResult};
use crate::ledger::{Entry, PoolLedger, Side};
use crate::oracle::RandomnessGateway;
use crate::payout::{PayoutPlan, WinningSelector};
use crate::round::{Clock, CloseRule, Round, RoundState};
use crate::stats::HouseStats;
use crate::{Address, Amount, RequestId, RoundId};

pub(crate) struct RoundEngine<S: Side> {
    label: &'static str,
    vault: Address,
    commission_rate: u8,
    close_rule: CloseRule,
    gateway: Arc<RandomnessGateway>,
    bank: Arc<dyn Bank>,
    clock: Arc<dyn Clock>,
    inner: RwLock<EngineState<S>>,
}

struct EngineState<S: Side> {
    rounds: Vec<Round<S>>,
    stats: HouseStats,
}

impl<S: Side> RoundEngine<S> {
    pub(crate) fn new(
        label: &'static str,
        vault: Address,
        commission_rate: u8,
        close_rule: CloseRule,
        gateway: Arc<RandomnessGateway>,
        bank: Arc<dyn Bank>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            label,
            vault,
            commission_rate,
            close_rule,
            gateway,
            bank,
            clock,
            inner: RwLock::new(EngineState {
                rounds: Vec::new(),
                stats: HouseStats::default(),
            }),
        }
    }

    pub(crate) fn vault(&self) -> &str {
        &self.vault
    }

    pub(crate) fn is_approved(&self) -> bool {
        self.gateway.is_approved(&self.vault)
    }

    pub(crate) fn request_status(&self, request: RequestId) -> (bool, u128) {
        self.gateway.request_status(request)
    }

    fn round_ref(rounds: &[Round<S>], id: RoundId) -> FortunaResult<&Round<S>> {
        rounds
            .get(id as usize)
            .ok_or(FortunaError::UnknownRound { round: id })
    }

    fn round_mut(rounds: &mut [Round<S>], id: RoundId) -> FortunaResult<&mut Round<S>> {
        rounds
            .get_mut(id as usize)
            .ok_or(FortunaError::UnknownRound { round: id })
    }

    fn ensure_no_active_round(rounds: &[Round<S>]) -> FortunaResult<()> {
        if let Some(last) = rounds.last() {
            if !last.state().is_terminal() {
                return Err(FortunaError::AlreadyActive { round: last.id });
            }
        }
        Ok(())
    }

    /// Open a new round; rejects while the previous one is non-terminal.
    pub(crate) async fn create_round(&self) -> FortunaResult<RoundId> {
        let mut inner = self.inner.write().await;
        Self::ensure_no_active_round(&inner.rounds)?;
        let id = inner.rounds.len() as RoundId;
        let opened_at = self.clock.now();
        inner.rounds.push(Round::new(id, opened_at));
        tracing::info!(game = self.label, round = id, opened_at, "round opened");
        Ok(id)
    }

    /// Open a new round with the creator's stake already escrowed, as
    /// one atomic step. Used by duel lobbies, which are never empty.
    pub(crate) async fn create_round_with_entry(
        &self,
        side: S,
        player: &str,
        stake: Amount,
    ) -> FortunaResult<RoundId> {
        let mut inner = self.inner.write().await;
        Self::ensure_no_active_round(&inner.rounds)?;
        if stake == 0 {
            return Err(FortunaError::ZeroStake);
        }
        self.bank.transfer(player, &self.vault, stake).await?;

        let EngineState { rounds, stats } = &mut *inner;
        let id = rounds.len() as RoundId;
        let mut round = Round::new(id, self.clock.now());
        round.ledger.deposit(side, player, stake)?;
        stats.record_stake(stake);
        rounds.push(round);
        tracing::info!(
            game = self.label,
            round = id,
            player,
            side = %side,
            stake,
            "round opened with creator stake"
        );
        Ok(id)
    }

    /// Escrow a stake and record it. Validates state and amount before
    /// any funds move; the ledger write happens only after the transfer
    /// succeeds, so an entry is either fully recorded or not at all.
    pub(crate) async fn deposit(
        &self,
        id: RoundId,
        side: S,
        player: &str,
        stake: Amount,
    ) -> FortunaResult<()> {
        let mut inner = self.inner.write().await;
        let now = self.clock.now();
        let EngineState { rounds, stats } = &mut *inner;
        let round = Self::round_mut(rounds, id)?;

        let state = round.effective_state(self.close_rule, now);
        if state != RoundState::Open {
            return Err(FortunaError::InvalidState {
                round: id,
                expected: RoundState::Open,
                actual: state,
            });
        }
        if stake == 0 {
            return Err(FortunaError::ZeroStake);
        }
        if round.ledger.total_pool().checked_add(stake).is_none() {
            return Err(FortunaError::Overflow);
        }

        self.bank.transfer(player, &self.vault, stake).await?;
        round.ledger.deposit(side, player, stake)?;
        stats.record_stake(stake);
        debug_assert!(round.ledger.is_balanced());

        tracing::debug!(
            game = self.label,
            round = id,
            player,
            side = %side,
            stake,
            "stake recorded"
        );
        Ok(())
    }

    /// Ask the gateway for a number once the round is closed. The round
    /// parks in `AwaitingRandomness` until the oracle delivers; entries,
    /// re-requests and early settlement all fail fast in the meantime.
    pub(crate) async fn request_randomness(&self, id: RoundId) -> FortunaResult<RequestId> {
        let mut inner = self.inner.write().await;
        let now = self.clock.now();
        let round = Self::round_mut(&mut inner.rounds, id)?;

        let state = round.effective_state(self.close_rule, now);
        if state != RoundState::Closed {
            return Err(FortunaError::InvalidState {
                round: id,
                expected: RoundState::Closed,
                actual: state,
            });
        }

        let request = self.gateway.request_random_number(&self.vault).await?;
        round.request_id = Some(request);
        round.set_state(RoundState::AwaitingRandomness);
        tracing::info!(game = self.label, round = id, request, "randomness requested");
        Ok(request)
    }

    /// Settle with a winner derived from the fulfilled random value and
    /// the ledger frozen at close time. Fail-atomic: if the payout batch
    /// is rejected, the round stays in `AwaitingRandomness` and the
    /// identical call can be retried.
    pub(crate) async fn settle(
        &self,
        id: RoundId,
        hint: Option<&[Entry<S>]>,
        choose: impl FnOnce(u128, &PoolLedger<S>) -> WinningSelector<S>,
    ) -> FortunaResult<PayoutPlan> {
        let mut inner = self.inner.write().await;
        let EngineState { rounds, stats } = &mut *inner;
        let round = Self::round_mut(rounds, id)?;

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
        let (fulfilled, value) = self.gateway.request_status(request);
        if !fulfilled {
            return Err(FortunaError::RandomnessPending { request });
        }
        if let Some(hint) = hint {
            if hint != round.ledger.entries() {
                return Err(FortunaError::ParticipantMismatch { round: id });
            }
        }

        let winner = choose(value, &round.ledger);
        let plan = PayoutPlan::build(&round.ledger, self.commission_rate, &winner)?;
        self.bank.transfer_batch(&self.vault, &plan.payouts).await?;

        round.winner = Some(winner);
        round.set_state(RoundState::Settled);
        stats.record_settlement(&plan);
        tracing::info!(
            game = self.label,
            round = id,
            winners = plan.payouts.len(),
            commission = plan.commission,
            residue = plan.residue,
            "round settled"
        );
        Ok(plan)
    }

    /// Timeout refund for a round that never filled: every recorded
    /// stake is returned and the round terminates without randomness.
    pub(crate) async fn refund_after_timeout(
        &self,
        id: RoundId,
        timeout_secs: u64,
    ) -> FortunaResult<()> {
        let mut inner = self.inner.write().await;
        let now = self.clock.now();
        let EngineState { rounds, stats } = &mut *inner;
        let round = Self::round_mut(rounds, id)?;

        let state = round.effective_state(self.close_rule, now);
        if state != RoundState::Open {
            return Err(FortunaError::InvalidState {
                round: id,
                expected: RoundState::Open,
                actual: state,
            });
        }
        if now.saturating_sub(round.opened_at) < timeout_secs {
            return Err(FortunaError::TimeoutNotReached { round: id });
        }

        let refunds: Vec<(Address, Amount)> = round
            .ledger
            .entries()
            .iter()
            .map(|e| (e.player.clone(), e.stake))
            .collect();
        self.bank.transfer_batch(&self.vault, &refunds).await?;

        let refunded: Amount = refunds.iter().map(|(_, amount)| *amount).sum();
        round.set_state(RoundState::Refunded);
        stats.record_refund(refunded);
        tracing::info!(game = self.label, round = id, refunded, "round refunded after timeout");
        Ok(())
    }

    /// State as the close rule sees it right now.
    pub(crate) async fn effective_state(&self, id: RoundId) -> FortunaResult<RoundState> {
        let inner = self.inner.read().await;
        let round = Self::round_ref(&inner.rounds, id)?;
        Ok(round.effective_state(self.close_rule, self.clock.now()))
    }

    /// Snapshot of one round.
    pub(crate) async fn round(&self, id: RoundId) -> FortunaResult<Round<S>> {
        let inner = self.inner.read().await;
        Self::round_ref(&inner.rounds, id).cloned()
    }

    /// Id of the most recently opened round.
    pub(crate) async fn current_round_id(&self) -> FortunaResult<RoundId> {
        let inner = self.inner.read().await;
        inner
            .rounds
            .last()
            .map(|r| r.id)
            .ok_or(FortunaError::UnknownRound { round: 0 })
    }

    pub(crate) async fn round_count(&self) -> usize {
        self.inner.read().await.rounds.len()
    }

    pub(crate) async fn stats(&self) -> HouseStats {
        self.inner.read().await.stats.clone()
    }
}
