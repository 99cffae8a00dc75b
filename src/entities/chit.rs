// 🧾 Chit Entity - one contribution by one customer
//
// The amount is persisted exactly as entered. It is parsed into a Decimal
// when it is admitted and again whenever a statement is computed, so a
// corrupt stored amount surfaces as an error instead of a silent zero.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use super::plan::ChitPlan;
use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chit {
    pub id: String,

    pub customer_id: String,

    /// Amount text as stored
    pub amount: String,

    pub date: NaiveDate,

    pub account_details: String,

    #[serde(rename = "chitAmount")]
    pub tier: ChitPlan,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionKind>,

    #[serde(rename = "hash")]
    pub fingerprint: String,

    pub created_at: DateTime<Utc>,
}

impl Chit {
    /// Parsed amount; a stored value that is not a non-negative decimal is corrupt
    pub fn amount_value(&self) -> Result<Decimal> {
        parse_amount(&self.amount).ok_or_else(|| {
            LedgerError::InvalidRecord(format!(
                "chit {} has invalid amount '{}'",
                self.id, self.amount
            ))
        })
    }
}

/// Parse a non-negative decimal amount ("20000", " 1500.50 ")
pub fn parse_amount(text: &str) -> Option<Decimal> {
    Decimal::from_str(text.trim())
        .ok()
        .filter(|amount| !amount.is_sign_negative() || amount.is_zero())
}

/// Largest amount accepted on input (10^15 rupees); keeps statement sums far from overflow
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

pub fn within_amount_limit(amount: Decimal) -> bool {
    amount.abs() <= Decimal::from(MAX_AMOUNT)
}

/// Chit as submitted, before validation and duplicate checks
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChit {
    #[serde(default)]
    pub customer_id: String,

    #[serde(default, deserialize_with = "amount_text")]
    pub amount: String,

    #[serde(default)]
    pub date: Option<NaiveDate>,

    #[serde(default)]
    pub account_details: String,

    #[serde(rename = "chitAmount", default)]
    pub tier: Option<ChitPlan>,

    #[serde(rename = "type", default)]
    pub kind: Option<TransactionKind>,
}

impl NewChit {
    pub fn new(customer_id: &str, amount: &str, date: NaiveDate, account_details: &str) -> Self {
        NewChit {
            customer_id: customer_id.to_string(),
            amount: amount.to_string(),
            date: Some(date),
            account_details: account_details.to_string(),
            tier: None,
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Accepts the amount either as a JSON string or a JSON number
fn amount_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AmountInput {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match AmountInput::deserialize(deserializer)? {
        AmountInput::Text(text) => text,
        AmountInput::Number(number) => number.to_string(),
    })
}

/// Filter for chit listings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChitFilter {
    #[serde(rename = "chitAmount", default)]
    pub tier: Option<ChitPlan>,

    #[serde(rename = "customerId", default)]
    pub customer_id: Option<String>,
}

impl ChitFilter {
    pub fn for_customer(customer_id: &str) -> Self {
        ChitFilter {
            tier: None,
            customer_id: Some(customer_id.to_string()),
        }
    }

    pub fn for_tier(tier: ChitPlan) -> Self {
        ChitFilter {
            tier: Some(tier),
            customer_id: None,
        }
    }
}
