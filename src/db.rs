// 🗄️ Record Store - customers, chits, profits, paata + audit trail
//
// `RecordStore` is the seam the service writes through. `SqliteStore` is
// the bundled implementation (WAL mode, one table per collection).
// Callers serialise writes per store instance; every mutating method takes
// `&mut self`.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::entities::{Chit, ChitFilter, ChitPlan, Customer, PaataEntry, Profit, TransactionKind};
use crate::error::Result;
use crate::temporal::YearMonth;

// ============================================================================
// STORE INTERFACE
// ============================================================================

/// Outcome of a cascading customer delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CustomerRemoval {
    pub existed: bool,
    pub chits_removed: usize,
}

pub trait RecordStore {
    fn insert_customer(&mut self, customer: &Customer) -> Result<()>;
    fn get_customer(&self, id: &str) -> Result<Option<Customer>>;
    fn list_customers(&self, tier: Option<ChitPlan>) -> Result<Vec<Customer>>;
    /// Removes the customer and every chit referencing it, atomically
    fn delete_customer(&mut self, id: &str) -> Result<CustomerRemoval>;

    fn insert_chit(&mut self, chit: &Chit) -> Result<()>;
    /// Ordered by date, then creation
    fn list_chits(&self, filter: &ChitFilter) -> Result<Vec<Chit>>;
    fn delete_chit(&mut self, id: &str) -> Result<bool>;

    fn insert_profit(&mut self, profit: &Profit) -> Result<()>;
    /// Ordered by month, then creation
    fn list_profits(&self, tier: Option<ChitPlan>) -> Result<Vec<Profit>>;
    fn delete_profit(&mut self, id: &str) -> Result<bool>;

    fn insert_paata(&mut self, entry: &PaataEntry) -> Result<()>;
    fn list_paata(&self, tier: Option<ChitPlan>) -> Result<Vec<PaataEntry>>;
    fn delete_paata(&mut self, id: &str) -> Result<bool>;

    fn insert_event(&mut self, event: &Event) -> Result<()>;
    /// Newest first
    fn events_for_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>>;

    /// Run `work` atomically: every write inside it is kept, or none is
    fn in_transaction<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>;
}

// ============================================================================
// AUDIT EVENTS
// ============================================================================

/// Event for audit trail: every create and delete is recorded
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    fn delete_by_id(&mut self, table: &str, id: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![id])?;
        Ok(removed > 0)
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS customers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            phone TEXT NOT NULL,
            address TEXT,
            tier TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chits (
            id TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL,
            amount TEXT NOT NULL,
            date TEXT NOT NULL,
            account_details TEXT NOT NULL,
            tier TEXT NOT NULL,
            kind TEXT,
            fingerprint TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS profits (
            id TEXT PRIMARY KEY,
            tier TEXT NOT NULL,
            month TEXT NOT NULL,
            amount TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS paata (
            id TEXT PRIMARY KEY,
            tier TEXT NOT NULL,
            month TEXT NOT NULL,
            amount TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        -- Audit trail
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_customers_tier ON customers(tier);
        CREATE INDEX IF NOT EXISTS idx_chits_customer ON chits(customer_id);
        CREATE INDEX IF NOT EXISTS idx_chits_tier ON chits(tier);
        CREATE INDEX IF NOT EXISTS idx_chits_fingerprint ON chits(fingerprint);
        CREATE INDEX IF NOT EXISTS idx_profits_tier_month ON profits(tier, month);
        CREATE INDEX IF NOT EXISTS idx_paata_tier_month ON paata(tier, month);
        CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);",
    )?;

    Ok(())
}

// ============================================================================
// COLUMN CODECS
// ============================================================================

fn timestamp_text(ts: &DateTime<Utc>) -> String {
    // Fixed width keeps lexical order equal to time order
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(col: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, Type::Text, message.into())
}

fn parse_column<T, E>(row: &Row, col: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = E>,
    E: std::fmt::Display,
{
    let text: String = row.get(col)?;
    text.parse::<T>()
        .map_err(|e| conversion_error(col, format!("'{}': {}", text, e)))
}

fn timestamp_column(row: &Row, col: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(col)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(col, format!("'{}': {}", text, e)))
}

fn date_column(row: &Row, col: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(col)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .map_err(|e| conversion_error(col, format!("'{}': {}", text, e)))
}

fn kind_column(row: &Row, col: usize) -> rusqlite::Result<Option<TransactionKind>> {
    let text: Option<String> = row.get(col)?;
    match text.as_deref() {
        None | Some("") => Ok(None),
        Some("credit") => Ok(Some(TransactionKind::Credit)),
        Some("debit") => Ok(Some(TransactionKind::Debit)),
        Some(other) => Err(conversion_error(col, format!("unknown transaction kind '{}'", other))),
    }
}

fn kind_text(kind: Option<TransactionKind>) -> Option<&'static str> {
    kind.map(|k| match k {
        TransactionKind::Credit => "credit",
        TransactionKind::Debit => "debit",
    })
}

fn customer_from_row(row: &Row) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        address: row.get(3)?,
        tier: parse_column(row, 4)?,
        fingerprint: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
    })
}

fn chit_from_row(row: &Row) -> rusqlite::Result<Chit> {
    Ok(Chit {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        // Kept as text: the ledger decides whether it is valid
        amount: row.get(2)?,
        date: date_column(row, 3)?,
        account_details: row.get(4)?,
        tier: parse_column(row, 5)?,
        kind: kind_column(row, 6)?,
        fingerprint: row.get(7)?,
        created_at: timestamp_column(row, 8)?,
    })
}

fn profit_from_row(row: &Row) -> rusqlite::Result<Profit> {
    Ok(Profit {
        id: row.get(0)?,
        tier: parse_column(row, 1)?,
        month: parse_column::<YearMonth, _>(row, 2)?,
        amount: parse_column::<Decimal, _>(row, 3)?,
        created_at: timestamp_column(row, 4)?,
    })
}

fn paata_from_row(row: &Row) -> rusqlite::Result<PaataEntry> {
    Ok(PaataEntry {
        id: row.get(0)?,
        tier: parse_column(row, 1)?,
        month: parse_column::<YearMonth, _>(row, 2)?,
        amount: parse_column::<Decimal, _>(row, 3)?,
        created_at: timestamp_column(row, 4)?,
    })
}

fn tier_param(tier: Option<ChitPlan>) -> Option<&'static str> {
    tier.map(|t| t.as_str())
}

// ============================================================================
// RECORD STORE IMPLEMENTATION
// ============================================================================

impl RecordStore for SqliteStore {
    fn insert_customer(&mut self, customer: &Customer) -> Result<()> {
        self.conn.execute(
            "INSERT INTO customers (id, name, phone, address, tier, fingerprint, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                customer.id,
                customer.name,
                customer.phone,
                customer.address,
                customer.tier.as_str(),
                customer.fingerprint,
                timestamp_text(&customer.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_customer(&self, id: &str) -> Result<Option<Customer>> {
        let customer = self
            .conn
            .query_row(
                "SELECT id, name, phone, address, tier, fingerprint, created_at
                 FROM customers WHERE id = ?1",
                params![id],
                customer_from_row,
            )
            .optional()?;
        Ok(customer)
    }

    fn list_customers(&self, tier: Option<ChitPlan>) -> Result<Vec<Customer>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, phone, address, tier, fingerprint, created_at
             FROM customers
             WHERE (?1 IS NULL OR tier = ?1)
             ORDER BY created_at, id",
        )?;

        let customers = stmt
            .query_map(params![tier_param(tier)], customer_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(customers)
    }

    fn delete_customer(&mut self, id: &str) -> Result<CustomerRemoval> {
        // Savepoint, so the cascade also nests inside in_transaction
        let sp = self.conn.savepoint()?;
        let chits_removed = sp.execute("DELETE FROM chits WHERE customer_id = ?1", params![id])?;
        let customers_removed = sp.execute("DELETE FROM customers WHERE id = ?1", params![id])?;
        sp.commit()?;

        Ok(CustomerRemoval {
            existed: customers_removed > 0,
            chits_removed,
        })
    }

    fn insert_chit(&mut self, chit: &Chit) -> Result<()> {
        self.conn.execute(
            "INSERT INTO chits (
                id, customer_id, amount, date, account_details, tier, kind, fingerprint, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                chit.id,
                chit.customer_id,
                chit.amount,
                chit.date.format("%Y-%m-%d").to_string(),
                chit.account_details,
                chit.tier.as_str(),
                kind_text(chit.kind),
                chit.fingerprint,
                timestamp_text(&chit.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_chits(&self, filter: &ChitFilter) -> Result<Vec<Chit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, customer_id, amount, date, account_details, tier, kind, fingerprint, created_at
             FROM chits
             WHERE (?1 IS NULL OR tier = ?1)
               AND (?2 IS NULL OR customer_id = ?2)
             ORDER BY date, created_at, id",
        )?;

        let chits = stmt
            .query_map(
                params![tier_param(filter.tier), filter.customer_id.as_deref()],
                chit_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(chits)
    }

    fn delete_chit(&mut self, id: &str) -> Result<bool> {
        self.delete_by_id("chits", id)
    }

    fn insert_profit(&mut self, profit: &Profit) -> Result<()> {
        self.conn.execute(
            "INSERT INTO profits (id, tier, month, amount, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                profit.id,
                profit.tier.as_str(),
                profit.month.to_string(),
                profit.amount.to_string(),
                timestamp_text(&profit.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_profits(&self, tier: Option<ChitPlan>) -> Result<Vec<Profit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, tier, month, amount, created_at
             FROM profits
             WHERE (?1 IS NULL OR tier = ?1)
             ORDER BY month, created_at, id",
        )?;

        let profits = stmt
            .query_map(params![tier_param(tier)], profit_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(profits)
    }

    fn delete_profit(&mut self, id: &str) -> Result<bool> {
        self.delete_by_id("profits", id)
    }

    fn insert_paata(&mut self, entry: &PaataEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO paata (id, tier, month, amount, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.id,
                entry.tier.as_str(),
                entry.month.to_string(),
                entry.amount.to_string(),
                timestamp_text(&entry.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_paata(&self, tier: Option<ChitPlan>) -> Result<Vec<PaataEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, tier, month, amount, created_at
             FROM paata
             WHERE (?1 IS NULL OR tier = ?1)
             ORDER BY month, created_at, id",
        )?;

        let entries = stmt
            .query_map(params![tier_param(tier)], paata_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    fn delete_paata(&mut self, id: &str) -> Result<bool> {
        self.delete_by_id("paata", id)
    }

    fn insert_event(&mut self, event: &Event) -> Result<()> {
        let data_json = serde_json::to_string(&event.data)?;

        self.conn.execute(
            "INSERT INTO events (
                event_id, timestamp, event_type, entity_type, entity_id, data, actor
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.event_id,
                timestamp_text(&event.timestamp),
                event.event_type,
                event.entity_type,
                event.entity_id,
                data_json,
                event.actor,
            ],
        )?;

        Ok(())
    }

    fn events_for_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
             FROM events
             WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY timestamp DESC, id DESC",
        )?;

        let events = stmt
            .query_map(params![entity_type, entity_id], |row| {
                let data_json: String = row.get(5)?;

                Ok(Event {
                    event_id: row.get(0)?,
                    timestamp: timestamp_column(row, 1)?,
                    event_type: row.get(2)?,
                    entity_type: row.get(3)?,
                    entity_id: row.get(4)?,
                    data: serde_json::from_str(&data_json)
                        .map_err(|e| conversion_error(5, e.to_string()))?,
                    actor: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(events)
    }

    fn in_transaction<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        // Left open only if an earlier unit of work panicked
        if !self.conn.is_autocommit() {
            warn!("Rolling back an abandoned transaction");
            self.conn.execute_batch("ROLLBACK")?;
        }

        self.conn.execute_batch("BEGIN IMMEDIATE")?;

        let outcome = work(self).and_then(|value| {
            self.conn.execute_batch("COMMIT")?;
            Ok(value)
        });

        if outcome.is_err() && !self.conn.is_autocommit() {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "Rollback failed");
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::new_record_id;

    fn create_test_customer(name: &str, tier: ChitPlan) -> Customer {
        Customer {
            id: new_record_id(),
            name: name.to_string(),
            phone: "9876543210".to_string(),
            address: Some("MG Road".to_string()),
            tier,
            fingerprint: "0123456789abcdef".to_string(),
            created_at: Utc::now(),
        }
    }

    fn create_test_chit(customer: &Customer, amount: &str, date: &str) -> Chit {
        Chit {
            id: new_record_id(),
            customer_id: customer.id.clone(),
            amount: amount.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            account_details: "SBI 1234".to_string(),
            tier: customer.tier,
            kind: Some(TransactionKind::Credit),
            fingerprint: "fedcba9876543210".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_customer_insert_and_filter() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let ravi = create_test_customer("Ravi", ChitPlan::TenLakh);
        let sita = create_test_customer("Sita", ChitPlan::FiveLakh);

        store.insert_customer(&ravi).unwrap();
        store.insert_customer(&sita).unwrap();

        assert_eq!(store.list_customers(None).unwrap().len(), 2);

        let ten = store.list_customers(Some(ChitPlan::TenLakh)).unwrap();
        assert_eq!(ten.len(), 1);
        assert_eq!(ten[0].name, "Ravi");
        assert_eq!(ten[0].address.as_deref(), Some("MG Road"));

        let fetched = store.get_customer(&sita.id).unwrap().unwrap();
        assert_eq!(fetched.tier, ChitPlan::FiveLakh);
        assert!(store.get_customer("missing").unwrap().is_none());
    }

    #[test]
    fn test_delete_customer_cascades_chits() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let ravi = create_test_customer("Ravi", ChitPlan::TenLakh);
        let sita = create_test_customer("Sita", ChitPlan::TenLakh);
        store.insert_customer(&ravi).unwrap();
        store.insert_customer(&sita).unwrap();

        store.insert_chit(&create_test_chit(&ravi, "20000", "2025-01-05")).unwrap();
        store.insert_chit(&create_test_chit(&ravi, "30000", "2025-02-05")).unwrap();
        store.insert_chit(&create_test_chit(&sita, "10000", "2025-01-05")).unwrap();

        let removal = store.delete_customer(&ravi.id).unwrap();
        assert_eq!(removal, CustomerRemoval { existed: true, chits_removed: 2 });

        assert!(store.list_chits(&ChitFilter::for_customer(&ravi.id)).unwrap().is_empty());
        assert_eq!(store.list_chits(&ChitFilter::default()).unwrap().len(), 1);

        // Second delete is a no-op
        let again = store.delete_customer(&ravi.id).unwrap();
        assert!(!again.existed);
    }

    #[test]
    fn test_chits_ordered_by_date_and_filtered() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let ravi = create_test_customer("Ravi", ChitPlan::TenLakh);
        store.insert_customer(&ravi).unwrap();

        store.insert_chit(&create_test_chit(&ravi, "2", "2025-02-05")).unwrap();
        store.insert_chit(&create_test_chit(&ravi, "1", "2025-01-05")).unwrap();

        let chits = store.list_chits(&ChitFilter::for_customer(&ravi.id)).unwrap();
        let amounts: Vec<&str> = chits.iter().map(|c| c.amount.as_str()).collect();
        assert_eq!(amounts, vec!["1", "2"]);
        assert_eq!(chits[0].kind, Some(TransactionKind::Credit));

        assert!(store.list_chits(&ChitFilter::for_tier(ChitPlan::OneLakh)).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_amount_survives_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let ravi = create_test_customer("Ravi", ChitPlan::TenLakh);
        store.insert_customer(&ravi).unwrap();
        store.insert_chit(&create_test_chit(&ravi, "twenty", "2025-01-05")).unwrap();

        let chits = store.list_chits(&ChitFilter::default()).unwrap();
        assert_eq!(chits[0].amount, "twenty");
        assert!(chits[0].amount_value().is_err());
    }

    #[test]
    fn test_profit_and_paata_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();

        let profit = Profit {
            id: new_record_id(),
            tier: ChitPlan::FiveLakh,
            month: "2025-02".parse().unwrap(),
            amount: Decimal::new(750_050, 2),
            created_at: now,
        };
        store.insert_profit(&profit).unwrap();

        let paata = PaataEntry {
            id: new_record_id(),
            tier: ChitPlan::FiveLakh,
            month: "2025-02".parse().unwrap(),
            amount: Decimal::from(1200),
            created_at: now,
        };
        store.insert_paata(&paata).unwrap();

        let profits = store.list_profits(Some(ChitPlan::FiveLakh)).unwrap();
        assert_eq!(profits.len(), 1);
        assert_eq!(profits[0].amount, Decimal::new(750_050, 2));
        assert_eq!(profits[0].month, profit.month);
        assert!(store.list_profits(Some(ChitPlan::TenLakh)).unwrap().is_empty());

        assert_eq!(store.list_paata(None).unwrap()[0].amount, Decimal::from(1200));

        assert!(store.delete_profit(&profit.id).unwrap());
        assert!(!store.delete_profit(&profit.id).unwrap());
        assert!(store.delete_paata(&paata.id).unwrap());
        assert!(store.list_paata(None).unwrap().is_empty());
    }

    #[test]
    fn test_event_log() {
        let mut store = SqliteStore::open_in_memory().unwrap();

        let event = Event::new(
            "customer_created",
            "customer",
            "cust-123",
            serde_json::json!({"name": "Ravi"}),
            "test_actor",
            Utc::now(),
        );

        store.insert_event(&event).unwrap();

        let events = store.events_for_entity("customer", "cust-123").unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "customer_created");
        assert_eq!(events[0].actor, "test_actor");
        assert_eq!(events[0].data["name"], "Ravi");
    }

    #[test]
    fn test_failed_event_rolls_back_record() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let customer = create_test_customer("Ravi", ChitPlan::TenLakh);

        let event = Event::new("customer_created", "customer", &customer.id, serde_json::json!({}), "test", Utc::now());
        store.insert_event(&event).unwrap();

        // Reusing the event id violates the unique constraint after the record is written
        let result = store.in_transaction(|tx| {
            tx.insert_customer(&customer)?;
            tx.insert_event(&event)
        });

        assert!(result.is_err());
        assert!(store.get_customer(&customer.id).unwrap().is_none());

        // The connection is usable again and a clean write commits
        let fresh = Event::new("customer_created", "customer", &customer.id, serde_json::json!({}), "test", Utc::now());
        store
            .in_transaction(|tx| {
                tx.insert_customer(&customer)?;
                tx.insert_event(&fresh)
            })
            .unwrap();
        assert!(store.get_customer(&customer.id).unwrap().is_some());
    }

    #[test]
    fn test_cascade_nests_inside_transaction() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let customer = create_test_customer("Ravi", ChitPlan::TenLakh);
        store.insert_customer(&customer).unwrap();
        store.insert_chit(&create_test_chit(&customer, "100", "2025-01-01")).unwrap();

        let removal = store.in_transaction(|tx| tx.delete_customer(&customer.id)).unwrap();

        assert!(removal.existed);
        assert_eq!(removal.chits_removed, 1);
        assert!(store.list_chits(&ChitFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_abandoned_transaction_is_discarded() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let stale = create_test_customer("Stale", ChitPlan::OneLakh);

        // A unit of work that never reached COMMIT
        store.conn.execute_batch("BEGIN IMMEDIATE").unwrap();
        store.insert_customer(&stale).unwrap();

        let customer = create_test_customer("Ravi", ChitPlan::TenLakh);
        store.in_transaction(|tx| tx.insert_customer(&customer)).unwrap();

        assert!(store.get_customer(&stale.id).unwrap().is_none());
        assert!(store.get_customer(&customer.id).unwrap().is_some());
    }
}
