// 🔍 Duplicate Guard - Reject resubmitted customers and chits
// Two independent strategies: Fingerprint Match, Recent Submission
//
// The guard is a pure decision: callers hand it the candidate, the existing
// records and "now". Nothing here touches the store or keeps timers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::config::{GuardConfig, DEFAULT_RECENCY_SECS};
use crate::entities::{
    parse_amount, within_amount_limit, ChitPlan, Chit, Customer, NewChit, NewCustomer, TransactionKind, MAX_AMOUNT,
};
use crate::error::{LedgerError, Result};

/// Length of the fingerprint token kept on each record
pub const FINGERPRINT_LEN: usize = 16;

// ============================================================================
// MATCH STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Same content fingerprint as an existing record
    Fingerprint,

    /// Same normalized identity as a record created inside the recency window
    RecentSubmission,
}

// ============================================================================
// DUPLICATE MATCH RESULT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateMatch {
    /// Identity of the record the candidate collides with
    pub existing_id: String,

    /// Which strategy detected this match
    pub strategy: MatchStrategy,

    /// Fingerprint of the candidate
    pub fingerprint: String,
}

impl DuplicateMatch {
    fn into_error(self, entity: &str) -> LedgerError {
        let message = match self.strategy {
            MatchStrategy::Fingerprint => format!("{} with this identity already exists", entity),
            MatchStrategy::RecentSubmission => format!("recent duplicate {} submission detected", entity),
        };
        LedgerError::DuplicateRecord(message)
    }
}

// ============================================================================
// VALIDATED CANDIDATES
// ============================================================================

/// Customer candidate with required fields checked and trimmed
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCustomer {
    pub name: String,
    pub phone: String,
    pub address: Option<String>,
    pub tier: ChitPlan,
    pub fingerprint: String,
}

/// Chit candidate with required fields checked and trimmed
#[derive(Debug, Clone, PartialEq)]
pub struct ValidChit {
    pub customer_id: String,
    pub amount_text: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub account_details: String,
    pub tier: Option<ChitPlan>,
    pub kind: Option<TransactionKind>,
    pub fingerprint: String,
}

// ============================================================================
// FINGERPRINTS
// ============================================================================

/// Short deterministic token for an identity string (SHA-256, hex, truncated)
pub fn fingerprint(identity: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(FINGERPRINT_LEN);
    hex
}

pub fn customer_fingerprint(name: &str, phone: &str, tier: ChitPlan) -> String {
    fingerprint(&format!(
        "{}_{}_{}",
        name.trim().to_lowercase(),
        phone.trim(),
        tier.as_str()
    ))
}

pub fn chit_fingerprint(customer_id: &str, amount: &str, date: NaiveDate, account_details: &str) -> String {
    fingerprint(&format!(
        "{}_{}_{}_{}",
        customer_id,
        amount.trim(),
        date.format("%Y-%m-%d"),
        account_details.trim()
    ))
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| !c.is_whitespace()).collect()
}

fn required(value: &str, field: &str, entity: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidInput(format!("{} {} is required", entity, field)));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// DUPLICATE GUARD
// ============================================================================

#[derive(Debug, Clone)]
pub struct DuplicateGuard {
    /// Submissions newer than this are compared on normalized identity (default: 30s)
    pub recency_window: chrono::Duration,
}

impl DuplicateGuard {
    /// Create guard with the default 30 second window
    pub fn new() -> Self {
        DuplicateGuard {
            recency_window: chrono::Duration::seconds(DEFAULT_RECENCY_SECS as i64),
        }
    }

    /// Windows outside 0..=MAX_RECENCY_SECS are a configuration error
    pub fn from_config(config: &GuardConfig) -> Result<Self> {
        config.validate().map_err(LedgerError::Config)?;

        let recency_window = chrono::Duration::from_std(config.recency_window)
            .map_err(|e| LedgerError::Config(format!("recency window: {}", e)))?;

        Ok(DuplicateGuard { recency_window })
    }

    fn is_recent(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(created_at) < self.recency_window
    }

    // ------------------------------------------------------------------------
    // Customers
    // ------------------------------------------------------------------------

    /// Required fields: name, phone and plan, non-blank after trimming
    pub fn validate_customer(&self, candidate: &NewCustomer) -> Result<ValidCustomer> {
        let name = required(&candidate.name, "name", "customer")?;
        let phone = required(&candidate.phone, "phone", "customer")?;
        let tier = candidate
            .tier
            .ok_or_else(|| LedgerError::InvalidInput("customer chit plan is required".to_string()))?;
        let address = candidate
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        let fingerprint = customer_fingerprint(&name, &phone, tier);

        Ok(ValidCustomer {
            name,
            phone,
            address,
            tier,
            fingerprint,
        })
    }

    /// Find an existing customer the candidate duplicates
    pub fn find_customer_duplicate(
        &self,
        candidate: &ValidCustomer,
        existing: &[Customer],
        now: DateTime<Utc>,
    ) -> Option<DuplicateMatch> {
        // Strategy 1: fingerprint recomputed from the stored fields
        if let Some(c) = existing
            .iter()
            .find(|c| customer_fingerprint(&c.name, &c.phone, c.tier) == candidate.fingerprint)
        {
            return Some(DuplicateMatch {
                existing_id: c.id.clone(),
                strategy: MatchStrategy::Fingerprint,
                fingerprint: candidate.fingerprint.clone(),
            });
        }

        // Strategy 2: normalized identity inside the recency window
        let name = normalize_name(&candidate.name);
        let phone = normalize_phone(&candidate.phone);

        existing
            .iter()
            .find(|c| {
                c.tier == candidate.tier
                    && normalize_name(&c.name) == name
                    && normalize_phone(&c.phone) == phone
                    && self.is_recent(c.created_at, now)
            })
            .map(|c| DuplicateMatch {
                existing_id: c.id.clone(),
                strategy: MatchStrategy::RecentSubmission,
                fingerprint: candidate.fingerprint.clone(),
            })
    }

    /// Accept or reject a validated customer
    pub fn check_customer(&self, candidate: &ValidCustomer, existing: &[Customer], now: DateTime<Utc>) -> Result<()> {
        match self.find_customer_duplicate(candidate, existing, now) {
            Some(m) => {
                warn!(
                    fingerprint = %m.fingerprint,
                    existing_id = %m.existing_id,
                    strategy = ?m.strategy,
                    "Duplicate customer blocked"
                );
                Err(m.into_error("customer"))
            }
            None => Ok(()),
        }
    }

    /// Validate then check a customer in one call
    pub fn admit_customer(&self, candidate: &NewCustomer, existing: &[Customer], now: DateTime<Utc>) -> Result<ValidCustomer> {
        let valid = self.validate_customer(candidate)?;
        self.check_customer(&valid, existing, now)?;
        Ok(valid)
    }

    // ------------------------------------------------------------------------
    // Chits
    // ------------------------------------------------------------------------

    /// Required fields: customer, amount, date and account details
    pub fn validate_chit(&self, candidate: &NewChit) -> Result<ValidChit> {
        let customer_id = required(&candidate.customer_id, "customer", "chit")?;
        let amount_text = required(&candidate.amount, "amount", "chit")?;
        let date = candidate
            .date
            .ok_or_else(|| LedgerError::InvalidInput("chit date is required".to_string()))?;
        let account_details = required(&candidate.account_details, "account details", "chit")?;

        let amount = parse_amount(&amount_text).ok_or_else(|| {
            LedgerError::InvalidInput(format!(
                "chit amount '{}' is not a non-negative number",
                amount_text
            ))
        })?;
        if !within_amount_limit(amount) {
            return Err(LedgerError::InvalidInput(format!(
                "chit amount '{}' exceeds the maximum of {}",
                amount_text, MAX_AMOUNT
            )));
        }

        let fingerprint = chit_fingerprint(&customer_id, &amount_text, date, &account_details);

        Ok(ValidChit {
            customer_id,
            amount_text,
            amount,
            date,
            account_details,
            tier: candidate.tier,
            kind: candidate.kind,
            fingerprint,
        })
    }

    /// Find an existing chit the candidate duplicates
    pub fn find_chit_duplicate(
        &self,
        candidate: &ValidChit,
        existing: &[Chit],
        now: DateTime<Utc>,
    ) -> Option<DuplicateMatch> {
        // Strategy 1: fingerprint recomputed from the stored fields
        if let Some(c) = existing.iter().find(|c| {
            chit_fingerprint(&c.customer_id, &c.amount, c.date, &c.account_details) == candidate.fingerprint
        }) {
            return Some(DuplicateMatch {
                existing_id: c.id.clone(),
                strategy: MatchStrategy::Fingerprint,
                fingerprint: candidate.fingerprint.clone(),
            });
        }

        // Strategy 2: numerically equal amount, same day and details, inside the window
        existing
            .iter()
            .find(|c| {
                c.customer_id == candidate.customer_id
                    && c.date == candidate.date
                    && c.account_details.trim() == candidate.account_details
                    && parse_amount(&c.amount) == Some(candidate.amount)
                    && self.is_recent(c.created_at, now)
            })
            .map(|c| DuplicateMatch {
                existing_id: c.id.clone(),
                strategy: MatchStrategy::RecentSubmission,
                fingerprint: candidate.fingerprint.clone(),
            })
    }

    /// Accept or reject a validated chit
    pub fn check_chit(&self, candidate: &ValidChit, existing: &[Chit], now: DateTime<Utc>) -> Result<()> {
        match self.find_chit_duplicate(candidate, existing, now) {
            Some(m) => {
                warn!(
                    fingerprint = %m.fingerprint,
                    existing_id = %m.existing_id,
                    strategy = ?m.strategy,
                    "Duplicate chit blocked"
                );
                Err(m.into_error("chit"))
            }
            None => Ok(()),
        }
    }

    /// Validate then check a chit in one call
    pub fn admit_chit(&self, candidate: &NewChit, existing: &[Chit], now: DateTime<Utc>) -> Result<ValidChit> {
        let valid = self.validate_chit(candidate)?;
        self.check_chit(&valid, existing, now)?;
        Ok(valid)
    }
}

impl Default for DuplicateGuard {
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
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap()
    }

    fn create_test_customer(name: &str, phone: &str, tier: ChitPlan, created_at: DateTime<Utc>) -> Customer {
        Customer {
            id: format!("cust-{}", name.trim().to_lowercase().replace(' ', "-")),
            name: name.to_string(),
            phone: phone.to_string(),
            address: None,
            tier,
            fingerprint: customer_fingerprint(name, phone, tier),
            created_at,
        }
    }

    fn create_test_chit(amount: &str, date: &str, details: &str, created_at: DateTime<Utc>) -> Chit {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Chit {
            id: format!("chit-{}-{}", date, amount),
            customer_id: "cust-1".to_string(),
            amount: amount.to_string(),
            date,
            account_details: details.to_string(),
            tier: ChitPlan::TenLakh,
            kind: None,
            fingerprint: chit_fingerprint("cust-1", amount, date, details),
            created_at,
        }
    }

    fn new_chit(amount: &str, date: &str, details: &str) -> NewChit {
        NewChit::new(
            "cust-1",
            amount,
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            details,
        )
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = customer_fingerprint("Ravi Kumar", "9876543210", ChitPlan::TenLakh);
        let b = customer_fingerprint("  ravi kumar ", " 9876543210", ChitPlan::TenLakh);
        let c = customer_fingerprint("Ravi Kumar", "9876543210", ChitPlan::FiveLakh);

        assert_eq!(a.len(), FINGERPRINT_LEN);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_customer_same_identity_rejected() {
        let guard = DuplicateGuard::new();
        let existing = vec![create_test_customer(
            "Ravi Kumar",
            "9876543210",
            ChitPlan::TenLakh,
            t0() - chrono::Duration::days(3),
        )];

        let candidate = NewCustomer::new("  RAVI KUMAR ", "9876543210 ", ChitPlan::TenLakh);
        let err = guard.admit_customer(&candidate, &existing, t0()).unwrap_err();

        assert!(err.is_duplicate());
        let valid = guard.validate_customer(&candidate).unwrap();
        let m = guard.find_customer_duplicate(&valid, &existing, t0()).unwrap();
        assert_eq!(m.strategy, MatchStrategy::Fingerprint);
    }

    #[test]
    fn test_customer_other_tier_accepted() {
        let guard = DuplicateGuard::new();
        let existing = vec![create_test_customer("Ravi Kumar", "9876543210", ChitPlan::TenLakh, t0())];

        let candidate = NewCustomer::new("Ravi Kumar", "9876543210", ChitPlan::OneLakh);
        assert!(guard.admit_customer(&candidate, &existing, t0()).is_ok());
    }

    #[test]
    fn test_customer_recent_submission_window() {
        let guard = DuplicateGuard::new();
        let existing = vec![create_test_customer("Ravi Kumar", "98765 43210", ChitPlan::TenLakh, t0())];

        // Inner whitespace differs, so the fingerprint does not catch it
        let candidate = NewCustomer::new("Ravi  Kumar", "9876543210", ChitPlan::TenLakh);
        let valid = guard.validate_customer(&candidate).unwrap();
        assert_ne!(valid.fingerprint, existing[0].fingerprint);

        let err = guard
            .check_customer(&valid, &existing, t0() + chrono::Duration::seconds(10))
            .unwrap_err();
        assert!(err.is_duplicate());

        let m = guard
            .find_customer_duplicate(&valid, &existing, t0() + chrono::Duration::seconds(29))
            .unwrap();
        assert_eq!(m.strategy, MatchStrategy::RecentSubmission);

        assert!(guard
            .check_customer(&valid, &existing, t0() + chrono::Duration::seconds(31))
            .is_ok());
    }

    #[test]
    fn test_customer_blank_fields_invalid() {
        let guard = DuplicateGuard::new();

        let err = guard
            .admit_customer(&NewCustomer::new("   ", "9876543210", ChitPlan::TenLakh), &[], t0())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = guard
            .admit_customer(&NewCustomer::new("Ravi", "", ChitPlan::TenLakh), &[], t0())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let mut no_tier = NewCustomer::new("Ravi", "123", ChitPlan::TenLakh);
        no_tier.tier = None;
        assert!(matches!(
            guard.admit_customer(&no_tier, &[], t0()),
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_customer_blank_address_dropped() {
        let guard = DuplicateGuard::new();
        let valid = guard
            .validate_customer(&NewCustomer::new(" Ravi ", "123", ChitPlan::TenLakh).with_address("  "))
            .unwrap();

        assert_eq!(valid.name, "Ravi");
        assert_eq!(valid.address, None);
    }

    #[test]
    fn test_chit_same_identity_rejected() {
        let guard = DuplicateGuard::new();
        let existing = vec![create_test_chit("20000", "2025-01-05", "SBI 1234", t0() - chrono::Duration::days(1))];

        let err = guard
            .admit_chit(&new_chit("20000", "2025-01-05", "  SBI 1234 "), &existing, t0())
            .unwrap_err();
        assert!(err.is_duplicate());
    }

    #[test]
    fn test_chit_account_details_casing_distinguishes() {
        let guard = DuplicateGuard::new();
        let existing = vec![create_test_chit("20000", "2025-01-05", "SBI 1234", t0())];

        // Inside the recency window, but the details differ
        assert!(guard
            .admit_chit(&new_chit("20000", "2025-01-05", "sbi 1234"), &existing, t0())
            .is_ok());
        assert!(guard
            .admit_chit(&new_chit("20000", "2025-01-05", "HDFC 9999"), &existing, t0())
            .is_ok());
    }

    #[test]
    fn test_chit_recent_equal_amount_rejected() {
        let guard = DuplicateGuard::new();
        let existing = vec![create_test_chit("20000", "2025-01-05", "SBI 1234", t0())];
        let candidate = guard.validate_chit(&new_chit("20000.00", "2025-01-05", "SBI 1234")).unwrap();

        let m = guard
            .find_chit_duplicate(&candidate, &existing, t0() + chrono::Duration::seconds(5))
            .unwrap();
        assert_eq!(m.strategy, MatchStrategy::RecentSubmission);

        assert!(guard
            .check_chit(&candidate, &existing, t0() + chrono::Duration::seconds(45))
            .is_ok());
    }

    #[test]
    fn test_chit_required_fields() {
        let guard = DuplicateGuard::new();

        let mut candidate = new_chit("20000", "2025-01-05", "SBI");
        candidate.date = None;
        assert!(matches!(guard.validate_chit(&candidate), Err(LedgerError::InvalidInput(_))));

        assert!(matches!(
            guard.validate_chit(&new_chit(" ", "2025-01-05", "SBI")),
            Err(LedgerError::InvalidInput(_))
        ));
        assert!(matches!(
            guard.validate_chit(&new_chit("20000", "2025-01-05", "")),
            Err(LedgerError::InvalidInput(_))
        ));
        assert!(matches!(
            guard.validate_chit(&new_chit("-5", "2025-01-05", "SBI")),
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_chit_amount_above_limit_invalid() {
        let guard = DuplicateGuard::new();

        let max = Decimal::MAX.to_string();
        assert!(matches!(
            guard.validate_chit(&new_chit(&max, "2025-01-05", "SBI")),
            Err(LedgerError::InvalidInput(_))
        ));

        let limit = MAX_AMOUNT.to_string();
        assert!(guard.validate_chit(&new_chit(&limit, "2025-01-05", "SBI")).is_ok());
    }

    #[test]
    fn test_window_from_config() {
        let config = GuardConfig {
            recency_window: std::time::Duration::from_secs(90),
        };
        let guard = DuplicateGuard::from_config(&config).unwrap();
        assert_eq!(guard.recency_window, chrono::Duration::seconds(90));
    }

    #[test]
    fn test_oversized_window_rejected_without_panic() {
        for secs in [100_000_000_000_000_000u64, u64::MAX] {
            let config = GuardConfig {
                recency_window: std::time::Duration::from_secs(secs),
            };
            assert!(matches!(
                DuplicateGuard::from_config(&config),
                Err(LedgerError::Config(_))
            ));
        }
    }
}
