// 🪙 Chit Plan - the tier every customer, chit, profit and paata belongs to
//
// Wire codes follow the values the front end has always sent:
// "10L" (10 lakh plan), "5L" (5 lakh plan), "1L" (1 lakh plan).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChitPlan {
    /// 10 lakh plan
    #[serde(rename = "10L")]
    TenLakh,

    /// 5 lakh plan
    #[serde(rename = "5L")]
    FiveLakh,

    /// 1 lakh plan
    #[serde(rename = "1L")]
    OneLakh,
}

impl ChitPlan {
    pub const ALL: [ChitPlan; 3] = [ChitPlan::TenLakh, ChitPlan::FiveLakh, ChitPlan::OneLakh];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChitPlan::TenLakh => "10L",
            ChitPlan::FiveLakh => "5L",
            ChitPlan::OneLakh => "1L",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChitPlan::TenLakh => "10 Lakhs",
            ChitPlan::FiveLakh => "5 Lakhs",
            ChitPlan::OneLakh => "1 Lakh",
        }
    }

    /// Monthly deduction used by the profit schedule view
    pub fn profit_deduction(&self) -> Decimal {
        match self {
            ChitPlan::TenLakh => Decimal::from(50_000),
            ChitPlan::FiveLakh => Decimal::from(25_000),
            ChitPlan::OneLakh => Decimal::from(5_000),
        }
    }
}

impl fmt::Display for ChitPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ChitPlan {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "10L" => Ok(ChitPlan::TenLakh),
            "5L" => Ok(ChitPlan::FiveLakh),
            "1L" => Ok(ChitPlan::OneLakh),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown chit plan '{}' (expected 10L, 5L or 1L)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_codes_round_trip() {
        for plan in ChitPlan::ALL {
            assert_eq!(plan.as_str().parse::<ChitPlan>().unwrap(), plan);
        }
        assert_eq!("10l".parse::<ChitPlan>().unwrap(), ChitPlan::TenLakh);
        assert!("2L".parse::<ChitPlan>().is_err());
    }

    #[test]
    fn test_plan_serializes_as_code() {
        assert_eq!(serde_json::to_string(&ChitPlan::FiveLakh).unwrap(), "\"5L\"");
        let plan: ChitPlan = serde_json::from_str("\"1L\"").unwrap();
        assert_eq!(plan, ChitPlan::OneLakh);
    }

    #[test]
    fn test_profit_deductions_by_tier() {
        assert_eq!(ChitPlan::TenLakh.profit_deduction(), Decimal::from(50_000));
        assert_eq!(ChitPlan::FiveLakh.profit_deduction(), Decimal::from(25_000));
        assert_eq!(ChitPlan::OneLakh.profit_deduction(), Decimal::from(5_000));
    }
}
