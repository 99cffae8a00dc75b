// 📒 Paata Entry - supplementary per-plan monthly ledger
//
// Independent of customers and chits; only listed alongside them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::plan::ChitPlan;
use crate::temporal::YearMonth;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaataEntry {
    pub id: String,

    #[serde(rename = "chitAmount")]
    pub tier: ChitPlan,

    pub month: YearMonth,

    pub amount: Decimal,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPaata {
    #[serde(rename = "chitAmount")]
    pub tier: ChitPlan,

    #[serde(default)]
    pub month: Option<YearMonth>,

    pub amount: Decimal,
}

impl NewPaata {
    pub fn new(tier: ChitPlan, month: YearMonth, amount: Decimal) -> Self {
        NewPaata {
            tier,
            month: Some(month),
            amount,
        }
    }
}
