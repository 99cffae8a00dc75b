//! Application configuration.
//!
//! Every setting has a default and can be overridden from the environment.

use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_RECENCY_SECS: u64 = 30;

/// Upper bound for the resubmission window (one day).
pub const MAX_RECENCY_SECS: u64 = 86_400;

/// Duplicate guard configuration.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// An identical submission newer than this is rejected as a resubmission.
    pub recency_window: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            recency_window: Duration::from_secs(DEFAULT_RECENCY_SECS),
        }
    }
}

impl GuardConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.recency_window > Duration::from_secs(MAX_RECENCY_SECS) {
            return Err(format!(
                "Duplicate window of {}s exceeds the maximum of {}s",
                self.recency_window.as_secs(),
                MAX_RECENCY_SECS
            ));
        }
        Ok(())
    }
}

/// Statement computation configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Fixed amount subtracted from every monthly statement total.
    pub statement_deduction: Decimal,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            statement_deduction: Decimal::from(50_000),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Log level used when RUST_LOG is not set.
    pub log_level: String,
    pub guard: GuardConfig,
    pub ledger: LedgerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("chits.db"),
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 3001,
            log_level: "info".to_string(),
            guard: GuardConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup (environment, test map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("CHIT_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(addr) = lookup("CHIT_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(port) = lookup("CHIT_LISTEN_PORT") {
            if let Ok(port) = port.parse() {
                config.listen_port = port;
            }
        }

        if let Some(level) = lookup("CHIT_LOG_LEVEL") {
            config.log_level = level;
        }

        if let Some(secs) = lookup("CHIT_DUPLICATE_WINDOW_SECS") {
            if let Ok(secs) = secs.parse() {
                config.guard.recency_window = Duration::from_secs(secs);
            }
        }

        if let Some(amount) = lookup("CHIT_STATEMENT_DEDUCTION") {
            if let Ok(amount) = amount.trim().parse() {
                config.ledger.statement_deduction = amount;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_port == 0 {
            return Err("Listen port cannot be 0".to_string());
        }

        if self.database_path.as_os_str().is_empty() {
            return Err("Database path cannot be empty".to_string());
        }

        self.guard.validate()?;

        if self.ledger.statement_deduction.is_sign_negative() {
            return Err("Statement deduction cannot be negative".to_string());
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }
}
