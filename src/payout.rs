//! Pari-mutuel settlement arithmetic.
//!
//! Integer-only: the commission truncates toward zero in favor of the
//! house, and per-winner truncation residue accumulates to the house as
//! well. The identity `sum(payouts) + commission + residue == total`
//! holds exactly for every plan.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{FortunaError, FortunaResult};
use crate::ledger::{Entry, PoolLedger, Side};
use crate::{Address, Amount};

/// Winning selector derived from the fulfilled random value and the
/// ledger state frozen at close time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinningSelector<S> {
    /// A winning side or color; every entry on it shares the prize.
    Side(S),
    /// A single winning participant (jackpot); all their entries win.
    Player(Address),
    /// No winner selectable (empty round); the house keeps the pool.
    Nobody,
}

/// A computed settlement: who gets paid what, and what the house keeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutPlan {
    pub batch_id: String,
    pub total_pool: Amount,
    pub commission: Amount,
    pub winning_pool: Amount,
    pub payouts: Vec<(Address, Amount)>,
    pub residue: Amount,
}

impl PayoutPlan {
    /// Compute the settlement for a closed ledger and winning selector.
    ///
    /// `commission = total * rate / 100`, truncating. Each winner
    /// receives a proportional share of the net profit plus their stake
    /// back: `payout = profit * stake / winning_pool + stake`, where
    /// `profit = total - commission - winning_pool`. If the winning pool
    /// is empty, nobody is paid and the house retains the whole
    /// after-commission pool. If the winning side holds more than the
    /// after-commission pool (the profit term would go negative),
    /// payouts fall back to a plain proration of `total - commission` so
    /// the plan never overdraws the pool.
    pub fn build<S: Side>(
        ledger: &PoolLedger<S>,
        rate: u8,
        winner: &WinningSelector<S>,
    ) -> FortunaResult<PayoutPlan> {
        let total = ledger.total_pool();
        let commission = (total as u128 * rate as u128 / 100) as Amount;
        let prize = total
            .checked_sub(commission)
            .ok_or(FortunaError::Overflow)?;

        let is_winner = |e: &Entry<S>| match winner {
            WinningSelector::Side(s) => e.side == *s,
            WinningSelector::Player(p) => e.player == *p,
            WinningSelector::Nobody => false,
        };
        let winning_pool: Amount = ledger
            .entries()
            .iter()
            .filter(|e| is_winner(e))
            .map(|e| e.stake)
            .sum();

        let mut payouts = Vec::new();
        let mut paid: Amount = 0;
        if winning_pool > 0 {
            for entry in ledger.entries().iter().filter(|e| is_winner(e)) {
                let payout = if prize >= winning_pool {
                    let profit = prize - winning_pool;
                    (profit as u128 * entry.stake as u128 / winning_pool as u128) as Amount
                        + entry.stake
                } else {
                    (prize as u128 * entry.stake as u128 / winning_pool as u128) as Amount
                };
                paid += payout;
                payouts.push((entry.player.clone(), payout));
            }
        }
        let residue = prize - paid;

        Ok(PayoutPlan {
            batch_id: Uuid::new_v4().to_string(),
            total_pool: total,
            commission,
            winning_pool,
            payouts,
            residue,
        })
    }

    /// Commission plus truncation residue: what the house retains from
    /// this round.
    pub fn house_take(&self) -> Amount {
        self.commission + self.residue
    }

    fn paid_out(&self) -> Amount {
        self.payouts.iter().map(|(_, amount)| *amount).sum()
    }

    /// The conservation identity every plan must satisfy.
    pub fn is_exact(&self) -> bool {
        self.paid_out() as u128 + self.commission as u128 + self.residue as u128
            == self.total_pool as u128
    }
}
