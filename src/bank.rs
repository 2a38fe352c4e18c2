//! Value transfer seam.
//!
//! Games never move funds directly: each instance escrows stakes in its
//! vault address and goes through a [`Bank`] capability. Settlement and
//! refund batches are fail-atomic: either every payout applies or none
//! does, so a rejected transfer leaves the round retryable.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::{FortunaError, FortunaResult};
use crate::{Address, Amount};

#[async_trait]
pub trait Bank: Send + Sync {
    /// Move `amount` from `from` to `to`.
    async fn transfer(&self, from: &str, to: &str, amount: Amount) -> FortunaResult<()>;

    /// Apply a whole payout batch from one account, all or nothing.
    async fn transfer_batch(&self, from: &str, payouts: &[(Address, Amount)])
        -> FortunaResult<()>;

    async fn balance(&self, who: &str) -> Amount;
}

/// In-process ledger bank for tests, simulations and single-node use.
pub struct InMemoryBank {
    balances: RwLock<HashMap<Address, Amount>>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
        }
    }

    /// Credit an account out of thin air (faucet for tests and demos).
    pub fn mint(&self, who: &str, amount: Amount) {
        let mut balances = self.balances.write().unwrap();
        *balances.entry(who.to_string()).or_insert(0) += amount;
    }
}

impl Default for InMemoryBank {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bank for InMemoryBank {
    async fn transfer(&self, from: &str, to: &str, amount: Amount) -> FortunaResult<()> {
        let mut balances = self.balances.write().unwrap();
        let have = balances.get(from).copied().unwrap_or(0);
        if have < amount {
            return Err(FortunaError::TransferFailed {
                reason: format!("insufficient funds in {}: {} < {}", from, have, amount),
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or_else(|| FortunaError::TransferFailed {
                reason: format!("balance overflow in {}", to),
            })?;
        balances.insert(from.to_string(), have - amount);
        balances.insert(to.to_string(), credited);
        Ok(())
    }

    async fn transfer_batch(
        &self,
        from: &str,
        payouts: &[(Address, Amount)],
    ) -> FortunaResult<()> {
        let mut balances = self.balances.write().unwrap();
        let needed: u128 = payouts.iter().map(|(_, amount)| *amount as u128).sum();
        let have = balances.get(from).copied().unwrap_or(0);
        if (have as u128) < needed {
            return Err(FortunaError::TransferFailed {
                reason: format!(
                    "insufficient funds in {} for batch of {}: {} < {}",
                    from,
                    payouts.len(),
                    have,
                    needed
                ),
            });
        }
        // Validate every credit before touching anything.
        for (to, amount) in payouts {
            if balances
                .get(to)
                .copied()
                .unwrap_or(0)
                .checked_add(*amount)
                .is_none()
            {
                return Err(FortunaError::TransferFailed {
                    reason: format!("balance overflow in {}", to),
                });
            }
        }
        balances.insert(from.to_string(), have - needed as Amount);
        for (to, amount) in payouts {
            *balances.entry(to.clone()).or_insert(0) += amount;
        }
        Ok(())
    }

    async fn balance(&self, who: &str) -> Amount {
        self.balances.read().unwrap().get(who).copied().unwrap_or(0)
    }
}
