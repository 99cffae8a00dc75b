use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;

use chit_ledger::logging::init_tracing;
use chit_ledger::{
    format_inr, AppConfig, ChitBook, ChitPlan, SqliteStore, SystemClock,
};

#[derive(Parser)]
#[command(name = "chit-ledger", version, about = "Chit fund record keeper")]
struct Cli {
    /// SQLite database (overrides CHIT_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and its tables
    Init,

    /// List customers, optionally for one plan (10L, 5L, 1L)
    Customers {
        #[arg(long)]
        tier: Option<ChitPlan>,
    },

    /// Print monthly statements for a customer
    Statements {
        customer_id: String,

        /// Also write the statements as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Print the capped profit schedule for a plan
    Schedule { tier: ChitPlan },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    config.validate().map_err(anyhow::Error::msg)?;

    init_tracing(&config.log_level);

    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("opening database {:?}", config.database_path))?;
    let book = ChitBook::with_config(store, SystemClock, &config.guard, &config.ledger)?;

    match cli.command {
        Command::Init => {
            println!("✓ Database ready at {:?}", config.database_path);
        }
        Command::Customers { tier } => {
            let customers = book.list_customers(tier)?;
            for c in &customers {
                println!("{}  {:<4} {:<30} {}", c.id, c.tier, c.name, c.phone);
            }
            println!("\n{} customer(s)", customers.len());
        }
        Command::Statements { customer_id, csv } => {
            let report = book.statement_report(&customer_id)?;

            println!("{}", report.customer.tier.label());
            println!("{}", report.render());
            println!("Balance: {}", format_inr(book.balance(&customer_id)?));

            if let Some(path) = csv {
                let file = File::create(&path).with_context(|| format!("creating {:?}", path))?;
                report.write_csv(file)?;
                println!("✓ Wrote {} statement(s) to {:?}", report.statements.len(), path);
            }
        }
        Command::Schedule { tier } => {
            println!("{:<10}{:>20}{:>20}{:>20}", "Month", "Profit", "Credited", "Carry Forward");
            for row in book.profit_schedule(tier)? {
                println!(
                    "{:<10}{:>20}{:>20}{:>20}",
                    row.profit.month.to_string(),
                    format_inr(row.profit.amount),
                    format_inr(row.calculated_amount),
                    format_inr(row.carry_forward)
                );
            }
        }
    }

    Ok(())
}
