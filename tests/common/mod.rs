#![allow(dead_code)]

use cardbar::{Ledger, LedgerPolicy, Money, db::init_pool};
use sqlx::SqlitePool;
use std::collections::HashSet;
use tempfile::TempDir;

/// A file-backed database that lives as long as the returned value.
pub struct TestDb {
    pub dir: TempDir,
    pub pool: SqlitePool,
}

pub async fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("payment.db").display());
    let pool = init_pool(&url).await.expect("Failed to open test database");
    TestDb { dir, pool }
}

pub async fn setup_ledger() -> (TestDb, Ledger) {
    setup_ledger_with(LedgerPolicy::default()).await
}

pub async fn setup_ledger_with(policy: LedgerPolicy) -> (TestDb, Ledger) {
    let db = setup_db().await;
    let ledger = Ledger::new(db.pool.clone(), policy);
    (db, ledger)
}

pub fn master_policy(ids: &[&str]) -> LedgerPolicy {
    LedgerPolicy {
        master_keys: ids.iter().map(|id| id.to_string()).collect::<HashSet<_>>(),
        ..LedgerPolicy::default()
    }
}

pub fn money(s: &str) -> Money {
    s.parse().expect("valid amount")
}

/// Creates a card and tops it up to `balance`
pub async fn funded_card(ledger: &Ledger, card_id: &str, is_adult: bool, balance: &str) {
    ledger.create_card(card_id, is_adult).await.unwrap();
    let amount = money(balance);
    if amount != Money::ZERO {
        ledger.top_up(card_id, amount).await.unwrap();
    }
}
