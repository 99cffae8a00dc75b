// 👤 Customer Entity
//
// A participant in one chit plan. The (name, phone, plan) triple identifies
// a customer for duplicate detection; the UUID identifies the record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plan::ChitPlan;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,

    pub name: String,

    pub phone: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(rename = "chitAmount")]
    pub tier: ChitPlan,

    /// Content fingerprint computed when the record was admitted
    #[serde(rename = "hash")]
    pub fingerprint: String,

    pub created_at: DateTime<Utc>,
}

/// Customer as submitted, before validation and duplicate checks
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(rename = "chitAmount")]
    pub tier: Option<ChitPlan>,
}

impl NewCustomer {
    pub fn new(name: &str, phone: &str, tier: ChitPlan) -> Self {
        NewCustomer {
            name: name.to_string(),
            phone: phone.to_string(),
            address: None,
            tier: Some(tier),
        }
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }
}
