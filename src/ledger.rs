//! Per-round stake bookkeeping: named sub-pools plus the ordered
//! participant entries needed for proportional payout.
//!
//! Sub-pool separation is what makes the pari-mutuel math per-side;
//! raw (participant, stake) pairs are kept because payout is
//! proportional to each individual stake within the winning side, not a
//! flat split.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::errors::{FortunaError, FortunaResult};
use crate::{Address, Amount};

/// A named sub-pool selector: duel side, roulette/wheel color, or the
/// single jackpot pot. `ALL` fixes the bucket order used when sub-pools
/// are laid end to end for weighted selection.
pub trait Side:
    Copy
    + Eq
    + Hash
    + fmt::Debug
    + fmt::Display
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const ALL: &'static [Self];
}

/// A recorded stake: who bet what on which side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry<S> {
    pub player: Address,
    pub side: S,
    pub stake: Amount,
}

/// Append-only stake ledger for one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "S: Side"))]
pub struct PoolLedger<S: Side> {
    pools: HashMap<S, Amount>,
    entries: Vec<Entry<S>>,
    total: Amount,
}

impl<S: Side> PoolLedger<S> {
    pub fn new() -> Self {
        Self {
            pools: HashMap::new(),
            entries: Vec::new(),
            total: 0,
        }
    }

    /// Record a stake. Rejects zero amounts; round-state guards live at
    /// the engine layer.
    pub fn deposit(&mut self, side: S, player: &str, stake: Amount) -> FortunaResult<()> {
        if stake == 0 {
            return Err(FortunaError::ZeroStake);
        }
        self.total = self.total.checked_add(stake).ok_or(FortunaError::Overflow)?;
        *self.pools.entry(side).or_insert(0) += stake;
        self.entries.push(Entry {
            player: player.to_string(),
            side,
            stake,
        });
        Ok(())
    }

    pub fn pool(&self, side: S) -> Amount {
        self.pools.get(&side).copied().unwrap_or(0)
    }

    /// Sum across all named sub-pools; the settlement base.
    pub fn total_pool(&self) -> Amount {
        self.total
    }

    /// All recorded entries, in arrival order.
    pub fn entries(&self) -> &[Entry<S>] {
        &self.entries
    }

    /// Entries on one side, in arrival order.
    pub fn entries_on(&self, side: S) -> impl Iterator<Item = &Entry<S>> {
        self.entries.iter().filter(move |e| e.side == side)
    }

    /// Total recorded stake of one participant across all entries.
    pub fn stake_of(&self, player: &str) -> Amount {
        self.entries
            .iter()
            .filter(|e| e.player == player)
            .map(|e| e.stake)
            .sum()
    }

    /// Conservation check: sub-pool sums must equal recorded stakes.
    pub fn is_balanced(&self) -> bool {
        let from_entries: u128 = self.entries.iter().map(|e| e.stake as u128).sum();
        let from_pools: u128 = S::ALL.iter().map(|s| self.pool(*s) as u128).sum();
        from_entries == self.total as u128 && from_pools == from_entries
    }

    /// Weighted lottery scan: map `value % total` onto the cumulative
    /// stake sequence and return the selected entry (jackpot rule).
    /// `None` for an empty ledger.
    pub fn pick_entry(&self, value: u128) -> Option<&Entry<S>> {
        if self.total == 0 {
            return None;
        }
        let ticket = (value % self.total as u128) as Amount;
        let mut cursor: Amount = 0;
        self.entries.iter().find(|e| {
            cursor += e.stake;
            ticket < cursor
        })
    }

    /// Weighted bucket scan over sub-pools laid end to end in `ALL`
    /// order (wheel rule). `None` for an empty ledger.
    pub fn pick_side(&self, value: u128) -> Option<S> {
        if self.total == 0 {
            return None;
        }
        let ticket = (value % self.total as u128) as Amount;
        let mut cursor: Amount = 0;
        S::ALL.iter().copied().find(|s| {
            cursor += self.pool(*s);
            ticket < cursor
        })
    }
}

impl<S: Side> Default for PoolLedger<S> {
    fn default() -> Self {
        Self::new()
    }
}
