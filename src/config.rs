use anyhow::{Result, bail};
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::{ledger::LedgerPolicy, money::Money};

#[derive(Parser, Debug, Clone)]
#[command(name = "cardbar")]
#[command(about = "Prepaid NFC card balance service for a cocktail bar")]
#[command(version)]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "9876")]
    pub port: u16,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://payment.db")]
    pub database_url: String,

    /// Shared secret expected in the x-api-key header
    #[arg(
        long,
        env = "API_KEY",
        default_value = "CocktailBerry-Secret-Change-Me",
        hide_env_values = true
    )]
    pub api_key: String,

    /// Lowest balance a card may reach
    #[arg(long, env = "MIN_BALANCE", default_value = "-1000", allow_hyphen_values = true)]
    pub min_balance: Money,

    /// Comma separated card ids that are never charged for bookings
    #[arg(long, env = "MASTER_KEYS", value_delimiter = ',')]
    pub master_keys: Vec<String>,

    /// Directory for periodic database copies; backups are off when unset
    #[arg(long, env = "BACKUP_DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Seconds between database backups
    #[arg(long, env = "BACKUP_INTERVAL_SECS", default_value = "3600")]
    pub backup_interval_secs: u64,

    /// How long each NFC poll waits for a card, in milliseconds
    #[arg(long, env = "NFC_POLL_INTERVAL_MS", default_value = "500")]
    pub nfc_poll_interval_ms: u64,
}

impl Config {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn backup_interval(&self) -> Duration {
        Duration::from_secs(self.backup_interval_secs.max(1))
    }

    pub fn nfc_poll_interval(&self) -> Duration {
        Duration::from_millis(self.nfc_poll_interval_ms.max(1))
    }

    pub fn ledger_policy(&self) -> Result<LedgerPolicy> {
        // Bookings only check affordability, so a positive floor could be undercut
        if self.min_balance > Money::ZERO {
            bail!("MIN_BALANCE must be zero or negative, got {}", self.min_balance);
        }

        let master_keys: HashSet<String> = self
            .master_keys
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        Ok(LedgerPolicy {
            min_balance: self.min_balance,
            master_keys,
        })
    }
}
