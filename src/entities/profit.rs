// 📈 Profit Entity - monthly profit allocation for one chit plan

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::plan::ChitPlan;
use crate::temporal::YearMonth;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profit {
    pub id: String,

    #[serde(rename = "chitAmount")]
    pub tier: ChitPlan,

    pub month: YearMonth,

    pub amount: Decimal,

    pub created_at: DateTime<Utc>,
}

/// Profit as submitted; a missing month means the current month
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfit {
    #[serde(rename = "chitAmount")]
    pub tier: ChitPlan,

    #[serde(default)]
    pub month: Option<YearMonth>,

    pub amount: Decimal,
}

impl NewProfit {
    pub fn new(tier: ChitPlan, month: YearMonth, amount: Decimal) -> Self {
        NewProfit {
            tier,
            month: Some(month),
            amount,
        }
    }
}
