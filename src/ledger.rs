//! Balance ledger: card lifecycle, top-ups and bookings.
//!
//! Every mutating operation runs in one sqlx transaction that starts with a
//! conditional write and ends with the matching audit row, so a balance change
//! and its log entry are committed together or not at all.

use sqlx::{Pool, Sqlite};
use std::collections::HashSet;
use tracing::{info, instrument};

use crate::{
    db::{
        models::{
            Card, CardUpdate, LOG_CREATED, LOG_DELETED, LOG_TOP_UP, LOG_UPDATED, NewLogEntry,
            PaymentLogEntry,
        },
        queries,
    },
    error::{LedgerError, LedgerResult},
    money::Money,
};

/// Rules fixed at process start
#[derive(Debug, Clone)]
pub struct LedgerPolicy {
    pub min_balance: Money,
    /// Staff cards that are never charged for bookings
    pub master_keys: HashSet<String>,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            min_balance: Money::from_cents(-100_000),
            master_keys: HashSet::new(),
        }
    }
}

#[derive(Clone)]
pub struct Ledger {
    pool: Pool<Sqlite>,
    policy: LedgerPolicy,
}

impl Ledger {
    pub fn new(pool: Pool<Sqlite>, policy: LedgerPolicy) -> Self {
        Self { pool, policy }
    }

    pub fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }

    pub fn is_master_key(&self, card_id: &str) -> bool {
        self.policy.master_keys.contains(card_id)
    }

    #[instrument(skip(self))]
    pub async fn create_card(&self, card_id: &str, is_adult: bool) -> LedgerResult<Card> {
        let card_id = validate_card_id(card_id)?;

        let mut tx = self.pool.begin().await?;
        let card = queries::insert_card(&mut *tx, card_id, is_adult)
            .await?
            .ok_or_else(|| LedgerError::AlreadyExists(card_id.to_string()))?;
        queries::append_log(
            &mut *tx,
            &NewLogEntry {
                card_id,
                amount: Money::ZERO,
                current_balance: card.balance,
                description: LOG_CREATED,
            },
        )
        .await?;
        tx.commit().await?;

        info!(card_id, is_adult, "Created card");
        Ok(card)
    }

    pub async fn get_card(&self, card_id: &str) -> LedgerResult<Card> {
        queries::get_card(&self.pool, card_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(card_id.to_string()))
    }

    pub async fn list_cards(&self, skip: i64, limit: i64) -> LedgerResult<Vec<Card>> {
        if skip < 0 || limit < 0 {
            return Err(LedgerError::Validation(
                "skip and limit must be non-negative".to_string(),
            ));
        }
        Ok(queries::list_cards(&self.pool, skip, limit).await?)
    }

    /// Applies only the fields present in `update`.
    ///
    /// The log entry's `amount` is the new absolute balance when one was
    /// supplied, not a delta. Top-ups log deltas.
    #[instrument(skip(self))]
    pub async fn update_card(&self, card_id: &str, update: CardUpdate) -> LedgerResult<Card> {
        let mut tx = self.pool.begin().await?;

        if let Some(balance) = update.balance {
            if balance < self.policy.min_balance {
                let current = queries::get_card(&mut *tx, card_id)
                    .await?
                    .ok_or_else(|| LedgerError::NotFound(card_id.to_string()))?
                    .balance;
                return Err(LedgerError::BelowMinimum {
                    current,
                    requested: balance,
                    minimum: self.policy.min_balance,
                });
            }
        }

        let card = queries::update_card(&mut *tx, card_id, update.is_adult, update.balance)
            .await?
            .ok_or_else(|| LedgerError::NotFound(card_id.to_string()))?;
        queries::append_log(
            &mut *tx,
            &NewLogEntry {
                card_id,
                amount: update.balance.unwrap_or(Money::ZERO),
                current_balance: card.balance,
                description: LOG_UPDATED,
            },
        )
        .await?;
        tx.commit().await?;

        info!(card_id, balance = %card.balance, is_adult = card.is_adult, "Updated card");
        Ok(card)
    }

    #[instrument(skip(self))]
    pub async fn delete_card(&self, card_id: &str) -> LedgerResult<()> {
        let mut tx = self.pool.begin().await?;
        queries::delete_card(&mut *tx, card_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(card_id.to_string()))?;
        queries::append_log(
            &mut *tx,
            &NewLogEntry {
                card_id,
                amount: Money::ZERO,
                current_balance: Money::ZERO,
                description: LOG_DELETED,
            },
        )
        .await?;
        tx.commit().await?;

        info!(card_id, "Deleted card");
        Ok(())
    }

    /// Credits `amount` (or debits, when negative) without a purchase.
    #[instrument(skip(self))]
    pub async fn top_up(&self, card_id: &str, amount: Money) -> LedgerResult<Card> {
        let mut tx = self.pool.begin().await?;

        let card = match queries::adjust_balance(&mut *tx, card_id, amount, self.policy.min_balance)
            .await?
        {
            Some(card) => card,
            None => {
                let current = queries::get_card(&mut *tx, card_id)
                    .await?
                    .ok_or_else(|| LedgerError::NotFound(card_id.to_string()))?;
                if current.balance.checked_add(amount).is_none() {
                    return Err(LedgerError::Validation(format!(
                        "Balance out of range. Current: {}, Requested: {amount}",
                        current.balance
                    )));
                }
                return Err(LedgerError::BelowMinimum {
                    current: current.balance,
                    requested: amount,
                    minimum: self.policy.min_balance,
                });
            }
        };

        queries::append_log(
            &mut *tx,
            &NewLogEntry {
                card_id,
                amount,
                current_balance: card.balance,
                description: LOG_TOP_UP,
            },
        )
        .await?;
        tx.commit().await?;

        info!(card_id, amount = %amount, balance = %card.balance, "Topped up card");
        Ok(card)
    }

    /// Charges `price` for `item_name`.
    ///
    /// Master-key cards are returned unchanged and nothing is logged. Otherwise
    /// the age gate is checked before the balance.
    #[instrument(skip(self))]
    pub async fn book_item(
        &self,
        card_id: &str,
        price: Money,
        is_alcoholic: bool,
        item_name: &str,
    ) -> LedgerResult<Card> {
        if !price.is_positive() {
            return Err(LedgerError::Validation(format!(
                "Price must be greater than 0, got {price}"
            )));
        }

        if self.is_master_key(card_id) {
            let card = self.get_card(card_id).await?;
            info!(card_id, item_name, price = %price, "Master key booking, balance untouched");
            return Ok(card);
        }

        let mut tx = self.pool.begin().await?;

        let card = match queries::debit(&mut *tx, card_id, price, is_alcoholic).await? {
            Some(card) => card,
            None => {
                let current = queries::get_card(&mut *tx, card_id)
                    .await?
                    .ok_or_else(|| LedgerError::NotFound(card_id.to_string()))?;
                if is_alcoholic && !current.is_adult {
                    return Err(LedgerError::Forbidden);
                }
                return Err(LedgerError::InsufficientFunds {
                    current: current.balance,
                    required: price,
                });
            }
        };

        queries::append_log(
            &mut *tx,
            &NewLogEntry {
                card_id,
                amount: -price,
                current_balance: card.balance,
                description: item_name,
            },
        )
        .await?;
        tx.commit().await?;

        info!(card_id, item_name, price = %price, balance = %card.balance, "Booked item");
        Ok(card)
    }

    /// Log entries for one card, newest first. Unknown cards yield an empty list.
    pub async fn history(&self, card_id: &str) -> LedgerResult<Vec<PaymentLogEntry>> {
        Ok(queries::list_logs(&self.pool, card_id).await?)
    }

    pub async fn all_history(&self) -> LedgerResult<Vec<PaymentLogEntry>> {
        Ok(queries::list_all_logs(&self.pool).await?)
    }

    /// Creates any configured master-key card that does not exist yet.
    pub async fn provision_master_keys(&self) -> LedgerResult<usize> {
        let mut created = 0;
        for card_id in &self.policy.master_keys {
            match self.create_card(card_id, true).await {
                Ok(_) => created += 1,
                Err(LedgerError::AlreadyExists(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(created)
    }
}

/// Ids are matched byte for byte everywhere else, so padding is refused
/// rather than stripped.
fn validate_card_id(card_id: &str) -> LedgerResult<&str> {
    let trimmed = card_id.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation("card_id must not be empty".to_string()));
    }
    if trimmed.len() != card_id.len() {
        return Err(LedgerError::Validation(format!(
            "card_id {card_id:?} must not start or end with whitespace"
        )));
    }
    Ok(card_id)
}
