//! Per-instance house accounting, updated as rounds settle.

use serde::{Deserialize, Serialize};

use crate::payout::PayoutPlan;
use crate::Amount;

/// Running totals for one game instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HouseStats {
    pub total_staked: Amount,
    pub total_paid_out: Amount,
    pub total_refunded: Amount,
    pub commission_retained: Amount,
    pub residue_retained: Amount,
    pub rounds_settled: u64,
    pub rounds_refunded: u64,
}

impl HouseStats {
    pub(crate) fn record_stake(&mut self, amount: Amount) {
        self.total_staked += amount;
    }

    pub(crate) fn record_settlement(&mut self, plan: &PayoutPlan) {
        self.total_paid_out += plan.payouts.iter().map(|(_, amount)| *amount).sum::<Amount>();
        self.commission_retained += plan.commission;
        self.residue_retained += plan.residue;
        self.rounds_settled += 1;
    }

    pub(crate) fn record_refund(&mut self, amount: Amount) {
        self.total_refunded += amount;
        self.rounds_refunded += 1;
    }

    /// Commission plus truncation residue the instance has retained.
    pub fn house_take(&self) -> Amount {
        self.commission_retained + self.residue_retained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulation() {
        let mut stats = HouseStats::default();
        stats.record_stake(100);
        stats.record_stake(20);

        let plan = PayoutPlan {
            batch_id: "batch".to_string(),
            total_pool: 120,
            commission: 12,
            winning_pool: 40,
            payouts: vec![("a".to_string(), 107)],
            residue: 1,
        };
        stats.record_settlement(&plan);

        assert_eq!(stats.total_staked, 120);
        assert_eq!(stats.total_paid_out, 107);
        assert_eq!(stats.house_take(), 13);
        assert_eq!(stats.rounds_settled, 1);

        stats.record_refund(50);
        assert_eq!(stats.total_refunded, 50);
        assert_eq!(stats.rounds_refunded, 1);
    }
}
