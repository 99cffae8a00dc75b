// Chit Ledger - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod error;
pub mod config;
pub mod logging;
pub mod temporal;       // Clock + YearMonth
pub mod entities;       // Customers, chits, profits, paata
pub mod deduplication;  // Duplicate guard
pub mod db;             // SQLite record store + audit events
pub mod ledger;         // Carry-forward statements
pub mod schedule;       // Capped profit schedule
pub mod export;         // Text and CSV statements
pub mod service;        // ChitBook

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use error::{LedgerError, Result};
pub use config::{AppConfig, GuardConfig, LedgerConfig};
pub use temporal::{Clock, FixedClock, SystemClock, YearMonth};
pub use entities::{
    ChitPlan, Chit, ChitFilter, Customer, NewChit, NewCustomer, NewPaata, NewProfit,
    PaataEntry, Profit, TransactionKind,
};
pub use deduplication::{DuplicateGuard, DuplicateMatch, MatchStrategy};
pub use db::{Event, RecordStore, SqliteStore};
pub use ledger::{signed_balance, LedgerCalculator, LineKind, MonthlyStatement, StatementLine};
pub use schedule::{profit_schedule, ScheduleRow};
pub use export::{
    format_inr, render_customer_header, render_statement, render_statements, write_statements_csv,
    StatementReport,
};
pub use service::ChitBook;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
