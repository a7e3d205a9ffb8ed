//! Prepaid NFC card balances for a cocktail bar: a SQLite-backed ledger with
//! an append-only payment log, served over HTTP.

pub mod app_state;
pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod money;
pub mod nfc;

pub use app_state::AppState;
pub use config::Config;
pub use error::{ApiError, LedgerError};
pub use ledger::{Ledger, LedgerPolicy};
pub use money::Money;
