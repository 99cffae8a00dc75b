// Entity Models
// Identity is a time-ordered UUID assigned by the store layer; every record
// also carries the instant it was created so the duplicate guard can reason
// about recent submissions.
//
// Customers and chits belong to a chit plan (tier). Profits and paata
// entries are per tier and per calendar month.

pub mod plan;
pub mod customer;
pub mod chit;
pub mod profit;
pub mod paata;

pub use plan::ChitPlan;
pub use customer::{Customer, NewCustomer};
pub use chit::{parse_amount, within_amount_limit, Chit, ChitFilter, NewChit, TransactionKind, MAX_AMOUNT};
pub use profit::{NewProfit, Profit};
pub use paata::{NewPaata, PaataEntry};

/// Generate a new record identity (UUID v7, ordered by creation time)
pub fn new_record_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
