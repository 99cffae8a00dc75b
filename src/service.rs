// 📚 ChitBook - the record keeper
//
// Every write goes through the same steps:
//   1. validate and check the candidate against stored records (DuplicateGuard)
//   2. stamp an id and creation time
//   3. append the record and its audit event in one store transaction
//
// Reads are plain store queries; statements are computed on demand.

use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, info};

use crate::config::{GuardConfig, LedgerConfig};
use crate::db::{Event, RecordStore};
use crate::deduplication::DuplicateGuard;
use crate::entities::{
    new_record_id, within_amount_limit, ChitPlan, Chit, ChitFilter, Customer, NewChit, NewCustomer,
    NewPaata, NewProfit, PaataEntry, Profit, MAX_AMOUNT,
};
use crate::error::{LedgerError, Result};
use crate::export::StatementReport;
use crate::ledger::{signed_balance, LedgerCalculator, MonthlyStatement};
use crate::schedule::{profit_schedule, ScheduleRow};
use crate::temporal::{Clock, SystemClock, YearMonth};

const ACTOR: &str = "chit-ledger";

pub struct ChitBook<S: RecordStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    guard: DuplicateGuard,
    ledger: LedgerCalculator,
}

impl<S: RecordStore, C: Clock> ChitBook<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        ChitBook {
            store,
            clock,
            guard: DuplicateGuard::new(),
            ledger: LedgerCalculator::new(),
        }
    }

    pub fn with_config(store: S, clock: C, guard: &GuardConfig, ledger: &LedgerConfig) -> Result<Self> {
        Ok(ChitBook {
            store,
            clock,
            guard: DuplicateGuard::from_config(guard)?,
            ledger: LedgerCalculator::from_config(ledger),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Insert a record and its "<entity>_created" event atomically
    fn insert_recorded<T, F>(&mut self, entity_type: &str, id: &str, record: &T, insert: F) -> Result<()>
    where
        T: serde::Serialize,
        F: FnOnce(&mut S, &T) -> Result<()>,
    {
        let event = Event::new(
            &format!("{}_created", entity_type),
            entity_type,
            id,
            serde_json::to_value(record)?,
            ACTOR,
            self.clock.now(),
        );

        self.store.in_transaction(|store| {
            insert(store, record)?;
            store.insert_event(&event)
        })
    }

    /// Delete by id and record "<entity>_deleted" atomically; false when nothing matched
    fn delete_recorded<F>(&mut self, entity_type: &str, id: &str, delete: F) -> Result<bool>
    where
        F: FnOnce(&mut S, &str) -> Result<bool>,
    {
        let now = self.clock.now();

        self.store.in_transaction(|store| {
            let removed = delete(store, id)?;
            if removed {
                let event = Event::new(&format!("{}_deleted", entity_type), entity_type, id, json!({}), ACTOR, now);
                store.insert_event(&event)?;
            }
            Ok(removed)
        })
    }

    // ========================================================================
    // CUSTOMERS
    // ========================================================================

    pub fn list_customers(&self, tier: Option<ChitPlan>) -> Result<Vec<Customer>> {
        self.store.list_customers(tier)
    }

    pub fn get_customer(&self, id: &str) -> Result<Customer> {
        self.store
            .get_customer(id)?
            .ok_or_else(|| LedgerError::NotFound(format!("customer {}", id)))
    }

    pub fn create_customer(&mut self, candidate: &NewCustomer) -> Result<Customer> {
        let valid = self.guard.validate_customer(candidate)?;
        let existing = self.store.list_customers(Some(valid.tier))?;
        let now = self.clock.now();
        self.guard.check_customer(&valid, &existing, now)?;

        let customer = Customer {
            id: new_record_id(),
            name: valid.name,
            phone: valid.phone,
            address: valid.address,
            tier: valid.tier,
            fingerprint: valid.fingerprint,
            created_at: now,
        };

        self.insert_recorded("customer", &customer.id, &customer, |store, c| store.insert_customer(c))?;

        info!(id = %customer.id, tier = %customer.tier, "Customer created");
        Ok(customer)
    }

    /// Remove a customer and all of their chits; unknown ids are a no-op
    pub fn delete_customer(&mut self, id: &str) -> Result<()> {
        let now = self.clock.now();

        let removal = self.store.in_transaction(|store| {
            let removal = store.delete_customer(id)?;
            if removal.existed {
                let event = Event::new(
                    "customer_deleted",
                    "customer",
                    id,
                    json!({ "chitsRemoved": removal.chits_removed }),
                    ACTOR,
                    now,
                );
                store.insert_event(&event)?;
            }
            Ok(removal)
        })?;

        if removal.existed {
            info!(id, chits_removed = removal.chits_removed, "Customer deleted");
        } else {
            debug!(id, "Delete of unknown customer ignored");
        }

        Ok(())
    }

    // ========================================================================
    // CHITS
    // ========================================================================

    pub fn list_chits(&self, filter: &ChitFilter) -> Result<Vec<Chit>> {
        self.store.list_chits(filter)
    }

    pub fn create_chit(&mut self, candidate: &NewChit) -> Result<Chit> {
        let valid = self.guard.validate_chit(candidate)?;

        let customer = self.store.get_customer(&valid.customer_id)?.ok_or_else(|| {
            LedgerError::InvalidInput(format!("chit references unknown customer {}", valid.customer_id))
        })?;

        if let Some(tier) = valid.tier {
            if tier != customer.tier {
                return Err(LedgerError::InvalidInput(format!(
                    "chit plan {} does not match customer plan {}",
                    tier, customer.tier
                )));
            }
        }

        let existing = self.store.list_chits(&ChitFilter::for_customer(&customer.id))?;
        let now = self.clock.now();
        self.guard.check_chit(&valid, &existing, now)?;

        let chit = Chit {
            id: new_record_id(),
            customer_id: customer.id,
            amount: valid.amount_text,
            date: valid.date,
            account_details: valid.account_details,
            tier: customer.tier,
            kind: valid.kind,
            fingerprint: valid.fingerprint,
            created_at: now,
        };

        self.insert_recorded("chit", &chit.id, &chit, |store, c| store.insert_chit(c))?;

        info!(id = %chit.id, customer_id = %chit.customer_id, amount = %valid.amount, "Chit created");
        Ok(chit)
    }

    pub fn delete_chit(&mut self, id: &str) -> Result<()> {
        if self.delete_recorded("chit", id, |store, id| store.delete_chit(id))? {
            info!(id, "Chit deleted");
        }
        Ok(())
    }

    /// Running balance of a customer's chits: debits add, everything else subtracts
    pub fn balance(&self, customer_id: &str) -> Result<Decimal> {
        let customer = self.get_customer(customer_id)?;
        let chits = self.store.list_chits(&ChitFilter::for_customer(&customer.id))?;
        signed_balance(&chits)
    }

    // ========================================================================
    // PROFITS
    // ========================================================================

    pub fn list_profits(&self, tier: Option<ChitPlan>) -> Result<Vec<Profit>> {
        self.store.list_profits(tier)
    }

    pub fn create_profit(&mut self, candidate: &NewProfit) -> Result<Profit> {
        let amount = checked_amount(candidate.amount, "profit")?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(LedgerError::InvalidInput("profit amount cannot be negative".to_string()));
        }

        let profit = Profit {
            id: new_record_id(),
            tier: candidate.tier,
            month: candidate.month.unwrap_or_else(|| YearMonth::current(&self.clock)),
            amount,
            created_at: self.clock.now(),
        };

        self.insert_recorded("profit", &profit.id, &profit, |store, p| store.insert_profit(p))?;

        info!(id = %profit.id, tier = %profit.tier, month = %profit.month, "Profit recorded");
        Ok(profit)
    }

    pub fn delete_profit(&mut self, id: &str) -> Result<()> {
        self.delete_recorded("profit", id, |store, id| store.delete_profit(id))?;
        Ok(())
    }

    /// Capped profit view for one plan
    pub fn profit_schedule(&self, tier: ChitPlan) -> Result<Vec<ScheduleRow>> {
        let profits = self.store.list_profits(Some(tier))?;
        profit_schedule(tier, &profits)
    }

    // ========================================================================
    // PAATA
    // ========================================================================

    pub fn list_paata(&self, tier: Option<ChitPlan>) -> Result<Vec<PaataEntry>> {
        self.store.list_paata(tier)
    }

    pub fn create_paata(&mut self, candidate: &NewPaata) -> Result<PaataEntry> {
        let entry = PaataEntry {
            id: new_record_id(),
            tier: candidate.tier,
            month: candidate.month.unwrap_or_else(|| YearMonth::current(&self.clock)),
            amount: checked_amount(candidate.amount, "paata")?,
            created_at: self.clock.now(),
        };

        self.insert_recorded("paata", &entry.id, &entry, |store, e| store.insert_paata(e))?;

        info!(id = %entry.id, tier = %entry.tier, month = %entry.month, "Paata entry recorded");
        Ok(entry)
    }

    pub fn delete_paata(&mut self, id: &str) -> Result<()> {
        self.delete_recorded("paata", id, |store, id| store.delete_paata(id))?;
        Ok(())
    }

    // ========================================================================
    // STATEMENTS & AUDIT
    // ========================================================================

    /// Monthly statements for one customer; an unknown customer has none
    pub fn compute_statements(&self, customer_id: &str) -> Result<Vec<MonthlyStatement>> {
        match self.store.get_customer(customer_id)? {
            Some(customer) => self.statements_for(&customer),
            None => Ok(Vec::new()),
        }
    }

    /// Statements together with the customer header and the plan's paata entries
    pub fn statement_report(&self, customer_id: &str) -> Result<StatementReport> {
        let customer = self.get_customer(customer_id)?;
        let statements = self.statements_for(&customer)?;
        let paata = self.store.list_paata(Some(customer.tier))?;

        Ok(StatementReport {
            customer,
            statements,
            paata,
        })
    }

    fn statements_for(&self, customer: &Customer) -> Result<Vec<MonthlyStatement>> {
        let chits = self.store.list_chits(&ChitFilter::for_customer(&customer.id))?;
        let profits = self.store.list_profits(Some(customer.tier))?;

        self.ledger.compute(customer.tier, &chits, &profits)
    }

    pub fn events_for(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>> {
        self.store.events_for_entity(entity_type, entity_id)
    }
}

fn checked_amount(amount: Decimal, entity: &str) -> Result<Decimal> {
    if !within_amount_limit(amount) {
        return Err(LedgerError::InvalidInput(format!(
            "{} amount exceeds the maximum of {}",
            entity, MAX_AMOUNT
        )));
    }
    Ok(amount)
}
