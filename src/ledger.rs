// ⚖️ Carry-Forward Ledger - monthly statements for one customer
//
// Per calendar month, in order:
//   total  = chits of the month + carry forward + month's profit
//   result = total - deduction
// and `result` becomes the next month's carry forward (no clamping).
//
// The first month never includes a profit line, even if a profit entry
// exists for it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LedgerConfig;
use crate::entities::{ChitPlan, Chit, Profit, TransactionKind};
use crate::error::{LedgerError, Result};
use crate::temporal::YearMonth;

pub const CARRY_FORWARD_LABEL: &str = "Last Month's Forwarded Amount";
pub const PROFIT_LABEL: &str = "Month's Profit";
pub const TOTAL_LABEL: &str = "Total";
pub const DEDUCTION_LABEL: &str = "Deduction";
pub const BALANCE_LABEL: &str = "Balance";

// ============================================================================
// STATEMENT LINES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LineKind {
    /// Previous month's result brought forward
    CarryForward,

    /// Profit allocated to the plan for this month
    Profit,

    /// One chit entry
    Entry {
        date: NaiveDate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<TransactionKind>,
    },

    Total,
    Deduction,
    Balance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub label: String,
    pub amount: Decimal,
    pub kind: LineKind,
}

impl StatementLine {
    fn new(label: &str, amount: Decimal, kind: LineKind) -> Self {
        StatementLine {
            label: label.to_string(),
            amount,
            kind,
        }
    }

    pub fn is_carry_forward(&self) -> bool {
        self.kind == LineKind::CarryForward
    }

    pub fn is_profit(&self) -> bool {
        self.kind == LineKind::Profit
    }

    pub fn is_entry(&self) -> bool {
        matches!(self.kind, LineKind::Entry { .. })
    }

    /// Total, deduction and balance rows
    pub fn is_summary(&self) -> bool {
        matches!(self.kind, LineKind::Total | LineKind::Deduction | LineKind::Balance)
    }
}

// ============================================================================
// MONTHLY STATEMENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStatement {
    pub month: YearMonth,

    /// "January 2025"
    pub label: String,

    pub lines: Vec<StatementLine>,

    /// Carry forward received from the previous month
    pub opening_carry_forward: Decimal,

    /// Profit included in the total (zero when no profit line)
    pub profit: Decimal,

    pub total: Decimal,

    pub deduction: Decimal,

    /// total - deduction, handed to the next month
    pub ending_carry_forward: Decimal,
}

impl MonthlyStatement {
    pub fn entries(&self) -> impl Iterator<Item = &StatementLine> {
        self.lines.iter().filter(|l| l.is_entry())
    }

    pub fn entries_total(&self) -> Decimal {
        self.entries().map(|l| l.amount).sum()
    }
}

// ============================================================================
// LEDGER CALCULATOR
// ============================================================================

#[derive(Debug, Clone)]
pub struct LedgerCalculator {
    /// Fixed amount subtracted from every month (default: 50,000)
    pub deduction: Decimal,
}

impl LedgerCalculator {
    pub fn new() -> Self {
        Self::from_config(&LedgerConfig::default())
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        LedgerCalculator {
            deduction: config.statement_deduction,
        }
    }

    pub fn with_deduction(deduction: Decimal) -> Self {
        LedgerCalculator { deduction }
    }

    /// Compute one statement per calendar month present in `chits`.
    ///
    /// `chits` are the entries of a single customer; `profits` may span
    /// several plans and months, only entries for `tier` are used.
    ///
    /// Example:
    /// ```
    /// use chit_ledger::{ChitPlan, LedgerCalculator};
    ///
    /// let statements = LedgerCalculator::new()
    ///     .compute(ChitPlan::TenLakh, &[], &[])
    ///     .unwrap();
    /// assert!(statements.is_empty());
    /// ```
    pub fn compute(&self, tier: ChitPlan, chits: &[Chit], profits: &[Profit]) -> Result<Vec<MonthlyStatement>> {
        // Any corrupt amount aborts the whole computation
        let mut entries = chits
            .iter()
            .map(|chit| Ok((chit, chit.amount_value()?)))
            .collect::<Result<Vec<(&Chit, Decimal)>>>()?;

        // Stable: same-day entries keep their input order
        entries.sort_by_key(|(chit, _)| chit.date);

        let mut months: Vec<(YearMonth, Vec<(&Chit, Decimal)>)> = Vec::new();
        for entry in entries {
            let month = YearMonth::from_date(entry.0.date);
            match months.last_mut() {
                Some((current, items)) if *current == month => items.push(entry),
                _ => months.push((month, vec![entry])),
            }
        }

        let mut statements = Vec::with_capacity(months.len());
        let mut carry_forward = Decimal::ZERO;

        for (index, (month, items)) in months.into_iter().enumerate() {
            let first = index == 0;
            let opening = carry_forward;
            let mut lines = Vec::with_capacity(items.len() + 5);

            if !first && opening > Decimal::ZERO {
                lines.push(StatementLine::new(CARRY_FORWARD_LABEL, opening, LineKind::CarryForward));
            }

            let stored_profit = if first {
                Decimal::ZERO
            } else {
                self.profit_for(tier, month, profits)
            };
            let profit = if !first && stored_profit > Decimal::ZERO {
                lines.push(StatementLine::new(PROFIT_LABEL, stored_profit, LineKind::Profit));
                stored_profit
            } else {
                Decimal::ZERO
            };

            let mut chit_sum = Decimal::ZERO;
            for (chit, amount) in &items {
                chit_sum = in_range(chit_sum.checked_add(*amount), month)?;
                lines.push(StatementLine::new(
                    chit.account_details.trim(),
                    *amount,
                    LineKind::Entry {
                        date: chit.date,
                        kind: chit.kind,
                    },
                ));
            }

            let total = in_range(
                chit_sum.checked_add(opening).and_then(|t| t.checked_add(profit)),
                month,
            )?;
            let after_deduction = in_range(total.checked_sub(self.deduction), month)?;

            lines.push(StatementLine::new(TOTAL_LABEL, total, LineKind::Total));
            lines.push(StatementLine::new(DEDUCTION_LABEL, self.deduction, LineKind::Deduction));
            lines.push(StatementLine::new(BALANCE_LABEL, after_deduction, LineKind::Balance));

            debug!(
                month = %month,
                entries = items.len(),
                %chit_sum,
                carry_forward = %opening,
                %profit,
                %total,
                %after_deduction,
                "Statement month computed"
            );

            carry_forward = after_deduction;

            statements.push(MonthlyStatement {
                month,
                label: month.label(),
                lines,
                opening_carry_forward: opening,
                profit,
                total,
                deduction: self.deduction,
                ending_carry_forward: after_deduction,
            });
        }

        Ok(statements)
    }

    /// First stored profit for (tier, month), zero when none exists
    fn profit_for(&self, tier: ChitPlan, month: YearMonth, profits: &[Profit]) -> Decimal {
        profits
            .iter()
            .find(|p| p.tier == tier && p.month == month)
            .map(|p| p.amount)
            .unwrap_or(Decimal::ZERO)
    }
}

// ============================================================================
// SIGNED BALANCE
// ============================================================================

/// Net of a customer's chits as shown in the chit list: debit entries add,
/// credit and untyped entries subtract. Statements never sign amounts.
pub fn signed_balance(chits: &[Chit]) -> Result<Decimal> {
    chits.iter().try_fold(Decimal::ZERO, |balance, chit| {
        let amount = chit.amount_value()?;
        let next = match chit.kind {
            Some(TransactionKind::Debit) => balance.checked_add(amount),
            _ => balance.checked_sub(amount),
        };
        next.ok_or_else(|| {
            LedgerError::InvalidRecord(format!("balance for customer {} exceeds the supported range", chit.customer_id))
        })
    })
}

/// Stored amounts whose sums leave the decimal range are corrupt data
fn in_range(value: Option<Decimal>, month: YearMonth) -> Result<Decimal> {
    value.ok_or_else(|| {
        LedgerError::InvalidRecord(format!("amounts for {} exceed the supported range", month))
    })
}

impl Default for LedgerCalculator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn create_test_chit(id: &str, amount: &str, date: &str, details: &str) -> Chit {
        Chit {
            id: id.to_string(),
            customer_id: "cust-1".to_string(),
            amount: amount.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            account_details: details.to_string(),
            tier: ChitPlan::TenLakh,
            kind: None,
            fingerprint: String::new(),
            created_at: Utc::now(),
        }
    }

    fn create_test_profit(tier: ChitPlan, month: &str, amount: i64) -> Profit {
        Profit {
            id: format!("profit-{}", month),
            tier,
            month: month.parse().unwrap(),
            amount: dec(amount),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_chits_yield_no_statements() {
        let calc = LedgerCalculator::new();
        let profits = vec![create_test_profit(ChitPlan::TenLakh, "2025-01", 5000)];

        let statements = calc.compute(ChitPlan::TenLakh, &[], &profits).unwrap();
        assert!(statements.is_empty());
    }

    #[test]
    fn test_carry_forward_across_two_months() {
        let calc = LedgerCalculator::new();
        let chits = vec![
            create_test_chit("a", "20000", "2025-01-10", "SBI"),
            create_test_chit("b", "40000", "2025-02-10", "SBI"),
        ];

        let statements = calc.compute(ChitPlan::TenLakh, &chits, &[]).unwrap();
        assert_eq!(statements.len(), 2);

        let jan = &statements[0];
        assert_eq!(jan.label, "January 2025");
        assert_eq!(jan.total, dec(20_000));
        assert_eq!(jan.deduction, dec(50_000));
        assert_eq!(jan.ending_carry_forward, dec(-30_000));

        let feb = &statements[1];
        assert_eq!(feb.opening_carry_forward, dec(-30_000));
        assert_eq!(feb.total, dec(10_000));
        assert_eq!(feb.ending_carry_forward, dec(-40_000));
        // Negative carry forward is not shown as a line
        assert!(!feb.lines.iter().any(|l| l.is_carry_forward()));
    }

    #[test]
    fn test_positive_carry_forward_line() {
        let calc = LedgerCalculator::new();
        let chits = vec![
            create_test_chit("a", "80000", "2025-01-10", "SBI"),
            create_test_chit("b", "10000", "2025-02-03", "SBI"),
        ];

        let statements = calc.compute(ChitPlan::TenLakh, &chits, &[]).unwrap();
        let feb = &statements[1];

        assert!(feb.lines[0].is_carry_forward());
        assert_eq!(feb.lines[0].label, CARRY_FORWARD_LABEL);
        assert_eq!(feb.lines[0].amount, dec(30_000));
        assert_eq!(feb.total, dec(40_000));
        assert_eq!(feb.ending_carry_forward, dec(-10_000));
    }

    #[test]
    fn test_first_month_profit_suppressed() {
        let calc = LedgerCalculator::new();
        let chits = vec![
            create_test_chit("a", "20000", "2025-01-10", "SBI"),
            create_test_chit("b", "60000", "2025-02-10", "SBI"),
        ];
        let profits = vec![
            create_test_profit(ChitPlan::TenLakh, "2025-01", 5000),
            create_test_profit(ChitPlan::TenLakh, "2025-02", 7000),
        ];

        let statements = calc.compute(ChitPlan::TenLakh, &chits, &profits).unwrap();

        let jan = &statements[0];
        assert_eq!(jan.total, dec(20_000));
        assert_eq!(jan.profit, Decimal::ZERO);
        assert!(!jan.lines.iter().any(|l| l.is_profit()));

        let feb = &statements[1];
        let profit_line = feb.lines.iter().find(|l| l.is_profit()).unwrap();
        assert_eq!(profit_line.amount, dec(7_000));
        // 60,000 - 30,000 + 7,000
        assert_eq!(feb.total, dec(37_000));
    }

    #[test]
    fn test_profit_of_other_tier_ignored() {
        let calc = LedgerCalculator::new();
        let chits = vec![
            create_test_chit("a", "50000", "2025-01-10", "SBI"),
            create_test_chit("b", "50000", "2025-02-10", "SBI"),
        ];
        let profits = vec![create_test_profit(ChitPlan::FiveLakh, "2025-02", 9000)];

        let statements = calc.compute(ChitPlan::TenLakh, &chits, &profits).unwrap();
        assert_eq!(statements[1].profit, Decimal::ZERO);
        assert_eq!(statements[1].total, dec(50_000));
    }

    #[test]
    fn test_non_positive_profit_not_counted() {
        let calc = LedgerCalculator::new();
        let chits = vec![
            create_test_chit("a", "50000", "2025-01-10", "SBI"),
            create_test_chit("b", "50000", "2025-02-10", "SBI"),
        ];
        let profits = vec![create_test_profit(ChitPlan::TenLakh, "2025-02", -2000)];

        let statements = calc.compute(ChitPlan::TenLakh, &chits, &profits).unwrap();
        assert!(!statements[1].lines.iter().any(|l| l.is_profit()));
        assert_eq!(statements[1].total, dec(50_000));
    }

    #[test]
    fn test_entries_grouped_and_ordered() {
        let calc = LedgerCalculator::new();
        // Out of order input; two entries on the same day keep input order
        let chits = vec![
            create_test_chit("c", "3000", "2025-02-01", "february"),
            create_test_chit("a", "1000", "2025-01-15", "first"),
            create_test_chit("b", "2000", "2025-01-15", "second"),
            create_test_chit("d", "500", "2025-01-02", "earliest"),
        ];

        let statements = calc.compute(ChitPlan::TenLakh, &chits, &[]).unwrap();
        assert_eq!(statements.len(), 2);

        let labels: Vec<&str> = statements[0].entries().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["earliest", "first", "second"]);
        assert_eq!(statements[0].entries_total(), dec(3_500));
        assert_eq!(statements[1].month, "2025-02".parse().unwrap());
    }

    #[test]
    fn test_summary_lines_match_totals() {
        let calc = LedgerCalculator::new();
        let chits = vec![create_test_chit("a", "12500.50", "2025-03-01", "SBI")];

        let statements = calc.compute(ChitPlan::TenLakh, &chits, &[]).unwrap();
        let s = &statements[0];
        let summary: Vec<&StatementLine> = s.lines.iter().filter(|l| l.is_summary()).collect();

        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].kind, LineKind::Total);
        assert_eq!(summary[0].amount, s.total);
        assert_eq!(summary[1].amount, s.deduction);
        assert_eq!(summary[2].amount, s.ending_carry_forward);
        assert_eq!(summary[0].amount - summary[1].amount, summary[2].amount);
    }

    #[test]
    fn test_invalid_amount_aborts() {
        let calc = LedgerCalculator::new();
        let chits = vec![
            create_test_chit("a", "20000", "2025-01-10", "SBI"),
            create_test_chit("b", "twenty", "2025-02-10", "SBI"),
        ];

        let err = calc.compute(ChitPlan::TenLakh, &chits, &[]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRecord(_)));

        let negative = vec![create_test_chit("c", "-100", "2025-01-10", "SBI")];
        assert!(matches!(
            calc.compute(ChitPlan::TenLakh, &negative, &[]),
            Err(LedgerError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_overflowing_stored_amounts_abort() {
        let calc = LedgerCalculator::new();
        let max = Decimal::MAX.to_string();
        let chits = vec![
            create_test_chit("a", &max, "2025-01-10", "SBI"),
            create_test_chit("b", &max, "2025-01-11", "SBI"),
        ];

        let err = calc.compute(ChitPlan::TenLakh, &chits, &[]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRecord(_)));

        // A single huge entry still fits once, but the carry into the next month does not
        let chits = vec![
            create_test_chit("a", &max, "2025-01-10", "SBI"),
            create_test_chit("b", &max, "2025-02-10", "SBI"),
        ];
        assert!(matches!(
            calc.compute(ChitPlan::TenLakh, &chits, &[]),
            Err(LedgerError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_signed_balance() {
        let mut debit = create_test_chit("a", "70000", "2025-01-10", "SBI");
        debit.kind = Some(TransactionKind::Debit);
        let mut credit = create_test_chit("b", "20000", "2025-01-11", "SBI");
        credit.kind = Some(TransactionKind::Credit);
        let untyped = create_test_chit("c", "5000", "2025-02-01", "Cash");

        assert_eq!(signed_balance(&[debit, credit, untyped]).unwrap(), dec(45_000));
        assert_eq!(signed_balance(&[]).unwrap(), Decimal::ZERO);

        let corrupt = create_test_chit("d", "n/a", "2025-02-01", "Cash");
        assert!(matches!(signed_balance(&[corrupt]), Err(LedgerError::InvalidRecord(_))));
    }

    #[test]
    fn test_compute_is_idempotent() {
        let calc = LedgerCalculator::new();
        let chits = vec![
            create_test_chit("a", "20000", "2025-01-10", "SBI"),
            create_test_chit("b", "70000", "2025-02-10", "SBI"),
            create_test_chit("c", "15000", "2025-04-10", "SBI"),
        ];
        let profits = vec![create_test_profit(ChitPlan::TenLakh, "2025-04", 4000)];

        let first = calc.compute(ChitPlan::TenLakh, &chits, &profits).unwrap();
        let second = calc.compute(ChitPlan::TenLakh, &chits, &profits).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_deduction() {
        let calc = LedgerCalculator::with_deduction(dec(5_000));
        let chits = vec![create_test_chit("a", "20000", "2025-01-10", "SBI")];

        let statements = calc.compute(ChitPlan::OneLakh, &chits, &[]).unwrap();
        assert_eq!(statements[0].ending_carry_forward, dec(15_000));
    }
}
