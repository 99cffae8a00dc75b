// 🖨️ Statement Export - text and CSV renderings of monthly statements
//
// Amounts use Indian digit grouping with a "Rs." prefix:
//   100000    → Rs. 1,00,000.00
//   -30000    → Rs. -30,000.00

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write as _;
use std::io;

use crate::entities::{Customer, PaataEntry};
use crate::error::Result;
use crate::ledger::{LineKind, MonthlyStatement, StatementLine};
use crate::temporal::YearMonth;

pub const PAATA_LABEL: &str = "Paata";

// ============================================================================
// AMOUNT FORMATTING
// ============================================================================

/// Format an amount as Indian rupees with two decimals
pub fn format_inr(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = format!("{:.2}", rounded.abs());
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    format!(
        "Rs. {}{}.{}",
        if negative { "-" } else { "" },
        group_indian(integer),
        fraction
    )
}

/// Last three digits, then groups of two: 1234567 → 12,34,567
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (front, pair) = rest.split_at(rest.len() - 2);
        groups.push(pair);
        rest = front;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

// ============================================================================
// STATEMENT REPORT
// ============================================================================

/// Everything printed for one customer: header, monthly statements and the
/// plan's paata entries (shown under the statement of their month)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementReport {
    pub customer: Customer,
    pub statements: Vec<MonthlyStatement>,
    pub paata: Vec<PaataEntry>,
}

impl StatementReport {
    pub fn render(&self) -> String {
        render_statements(&self.customer, &self.statements, &self.paata)
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        write_statements_csv(&self.statements, &self.paata, writer)
    }
}

fn paata_for_month<'a>(paata: &'a [PaataEntry], month: YearMonth) -> impl Iterator<Item = &'a PaataEntry> {
    paata.iter().filter(move |p| p.month == month)
}

// ============================================================================
// TEXT RENDERING
// ============================================================================

fn line_date(line: &StatementLine) -> String {
    match &line.kind {
        LineKind::Entry { date, .. } => date.format("%d/%m/%Y").to_string(),
        _ => "-".to_string(),
    }
}

/// Name, phone and (when present) address, then a rule
pub fn render_customer_header(customer: &Customer) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", customer.name);
    let _ = writeln!(out, "Phone: {}", customer.phone);
    if let Some(address) = &customer.address {
        let _ = writeln!(out, "Address: {}", address);
    }
    let _ = writeln!(out, "{}", "-".repeat(74));

    out
}

/// Render one statement as a fixed-width table, followed by the month's
/// paata entries when there are any
pub fn render_statement(statement: &MonthlyStatement, paata: &[PaataEntry]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", statement.label);
    let _ = writeln!(out, "{:<6}{:<12}{:<36}{:>20}", "S.No", "Date", "Account Details", "Amount");

    let mut serial = 1;
    for line in statement.lines.iter().filter(|l| !l.is_summary()) {
        let _ = writeln!(
            out,
            "{:<6}{:<12}{:<36}{:>20}",
            serial,
            line_date(line),
            line.label,
            format_inr(line.amount)
        );
        serial += 1;
    }

    let _ = writeln!(out, "{:>74}", format!("Total = {}", format_inr(statement.total)));
    let _ = writeln!(out, "{:>74}", format!("= - {}", format_inr(statement.deduction)));
    let _ = writeln!(out, "{:>74}", format!("= {}", format_inr(statement.ending_carry_forward)));

    let mut month_paata = paata_for_month(paata, statement.month).peekable();
    if month_paata.peek().is_some() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<8}{:>20}", "PAATA", "Amount");
        for entry in month_paata {
            let _ = writeln!(
                out,
                "{:<8}{:>20}",
                entry.month.first_day().format("%b").to_string(),
                format_inr(entry.amount)
            );
        }
    }

    out
}

/// Customer header, then every statement separated by a blank line
pub fn render_statements(customer: &Customer, statements: &[MonthlyStatement], paata: &[PaataEntry]) -> String {
    let body = statements
        .iter()
        .map(|statement| render_statement(statement, paata))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}{}", render_customer_header(customer), body)
}

// ============================================================================
// CSV EXPORT
// ============================================================================

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    month: String,
    serial: Option<usize>,
    line: &'static str,
    date: Option<String>,
    label: &'a str,
    amount: String,
}

fn line_name(kind: &LineKind) -> &'static str {
    match kind {
        LineKind::CarryForward => "carry_forward",
        LineKind::Profit => "profit",
        LineKind::Entry { .. } => "entry",
        LineKind::Total => "total",
        LineKind::Deduction => "deduction",
        LineKind::Balance => "balance",
    }
}

/// Write all statement lines as CSV, one row per line, with the month's
/// paata entries as trailing `paata` rows
pub fn write_statements_csv<W: io::Write>(
    statements: &[MonthlyStatement],
    paata: &[PaataEntry],
    writer: W,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for statement in statements {
        let month = statement.month.to_string();

        let mut serial = 0;
        for line in &statement.lines {
            let numbered = if line.is_summary() {
                None
            } else {
                serial += 1;
                Some(serial)
            };

            wtr.serialize(CsvRow {
                month: month.clone(),
                serial: numbered,
                line: line_name(&line.kind),
                date: match &line.kind {
                    LineKind::Entry { date, .. } => Some(date.format("%Y-%m-%d").to_string()),
                    _ => None,
                },
                label: &line.label,
                amount: line.amount.round_dp(2).to_string(),
            })?;
        }

        for entry in paata_for_month(paata, statement.month) {
            wtr.serialize(CsvRow {
                month: month.clone(),
                serial: None,
                line: "paata",
                date: None,
                label: PAATA_LABEL,
                amount: entry.amount.round_dp(2).to_string(),
            })?;
        }
    }

    wtr.flush()?;
    Ok(())
}
