// 📊 Profit Schedule - per-plan view of the profit table
//
// Profits are credited up to the plan's monthly deduction (50,000 / 25,000 /
// 5,000); anything above it is carried into the next month's profit. A month
// that does not reach the deduction is credited in full and carries nothing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{ChitPlan, Profit};
use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRow {
    #[serde(flatten)]
    pub profit: Profit,

    /// Amount credited for the month after capping
    pub calculated_amount: Decimal,

    /// Excess handed to the next month
    pub carry_forward: Decimal,
}

/// Build the schedule for `tier`; profits of other plans are skipped
pub fn profit_schedule(tier: ChitPlan, profits: &[Profit]) -> Result<Vec<ScheduleRow>> {
    let deduction = tier.profit_deduction();

    let mut sorted: Vec<&Profit> = profits.iter().filter(|p| p.tier == tier).collect();
    sorted.sort_by_key(|p| p.month);

    let mut carry_forward = Decimal::ZERO;
    let mut rows = Vec::with_capacity(sorted.len());

    for profit in sorted {
        let running = profit.amount.checked_add(carry_forward).ok_or_else(|| {
            LedgerError::InvalidRecord(format!(
                "profit schedule for {} exceeds the supported range at {}",
                tier, profit.month
            ))
        })?;

        let (credited, carry) = if running > deduction {
            (deduction, running - deduction)
        } else {
            (running, Decimal::ZERO)
        };
        carry_forward = carry;

        rows.push(ScheduleRow {
            profit: profit.clone(),
            calculated_amount: credited,
            carry_forward: carry,
        });
    }

    Ok(rows)
}
