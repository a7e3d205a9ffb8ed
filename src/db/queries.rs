use sqlx::{Result, SqliteExecutor};

use crate::db::models::{Card, NewLogEntry, PaymentLogEntry};
use crate::money::Money;

/// Upper bound for one page of `list_cards`
pub const MAX_PAGE_SIZE: i64 = 1000;

const CARD_COLUMNS: &str = "card_id, is_adult, balance_cents";
const LOG_COLUMNS: &str =
    "id, card_id, created_at, amount_cents, current_balance_cents, description";

pub async fn get_card<'c, E>(exec: E, card_id: &str) -> Result<Option<Card>>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, Card>(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE card_id = ?"))
        .bind(card_id)
        .fetch_optional(exec)
        .await
}

pub async fn list_cards<'c, E>(exec: E, skip: i64, limit: i64) -> Result<Vec<Card>>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, Card>(&format!(
        "SELECT {CARD_COLUMNS} FROM cards ORDER BY card_id LIMIT ? OFFSET ?"
    ))
    .bind(limit.clamp(0, MAX_PAGE_SIZE))
    .bind(skip.max(0))
    .fetch_all(exec)
    .await
}

/// Returns `None` when a card with this id already exists.
pub async fn insert_card<'c, E>(exec: E, card_id: &str, is_adult: bool) -> Result<Option<Card>>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, Card>(&format!(
        "INSERT INTO cards (card_id, is_adult, balance_cents) VALUES (?, ?, 0)
         ON CONFLICT(card_id) DO NOTHING
         RETURNING {CARD_COLUMNS}"
    ))
    .bind(card_id)
    .bind(is_adult)
    .fetch_optional(exec)
    .await
}

pub async fn update_card<'c, E>(
    exec: E,
    card_id: &str,
    is_adult: Option<bool>,
    balance: Option<Money>,
) -> Result<Option<Card>>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, Card>(&format!(
        "UPDATE cards SET is_adult = COALESCE(?, is_adult), balance_cents = COALESCE(?, balance_cents)
         WHERE card_id = ?
         RETURNING {CARD_COLUMNS}"
    ))
    .bind(is_adult)
    .bind(balance)
    .bind(card_id)
    .fetch_optional(exec)
    .await
}

pub async fn delete_card<'c, E>(exec: E, card_id: &str) -> Result<Option<Card>>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, Card>(&format!(
        "DELETE FROM cards WHERE card_id = ? RETURNING {CARD_COLUMNS}"
    ))
    .bind(card_id)
    .fetch_optional(exec)
    .await
}

/// Adds `delta` to the balance only if the result stays at or above `floor`
/// and fits in an `i64`.
///
/// The check and the write are one statement, so concurrent callers can never
/// both apply a delta to the same starting balance. `None` means the card is
/// missing, the floor would be crossed, or the sum would overflow.
pub async fn adjust_balance<'c, E>(
    exec: E,
    card_id: &str,
    delta: Money,
    floor: Money,
) -> Result<Option<Card>>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, Card>(&format!(
        "UPDATE cards SET balance_cents = balance_cents + ?1
         WHERE card_id = ?2
           AND (?1 <= 0 OR balance_cents <= ?4 - ?1)
           AND (?1 >= 0 OR balance_cents >= ?5 - ?1)
           AND balance_cents + ?1 >= ?3
         RETURNING {CARD_COLUMNS}"
    ))
    .bind(delta)
    .bind(card_id)
    .bind(floor)
    // SQLite turns an overflowing integer sum into a REAL, so bound it first
    .bind(i64::MAX)
    .bind(i64::MIN)
    .fetch_optional(exec)
    .await
}

/// Subtracts `price` if the card can afford it and passes the age gate.
/// `None` means one of the conditions failed; the caller re-reads to tell which.
pub async fn debit<'c, E>(
    exec: E,
    card_id: &str,
    price: Money,
    is_alcoholic: bool,
) -> Result<Option<Card>>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, Card>(&format!(
        "UPDATE cards SET balance_cents = balance_cents - ?1
         WHERE card_id = ?2 AND balance_cents >= ?1 AND (is_adult OR NOT ?3)
         RETURNING {CARD_COLUMNS}"
    ))
    .bind(price)
    .bind(card_id)
    .bind(is_alcoholic)
    .fetch_optional(exec)
    .await
}

/// Appends an audit row. `created_at` is never earlier than the newest
/// existing row, so insertion order and timestamp order agree.
pub async fn append_log<'c, E>(exec: E, entry: &NewLogEntry<'_>) -> Result<PaymentLogEntry>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, PaymentLogEntry>(&format!(
        "INSERT INTO payment_logs (card_id, created_at, amount_cents, current_balance_cents, description)
         VALUES (
             ?,
             (SELECT max(strftime('%Y-%m-%d %H:%M:%f', 'now'), coalesce(max(created_at), ''))
              FROM payment_logs),
             ?, ?, ?
         )
         RETURNING {LOG_COLUMNS}"
    ))
    .bind(entry.card_id)
    .bind(entry.amount)
    .bind(entry.current_balance)
    .bind(entry.description)
    .fetch_one(exec)
    .await
}

/// Newest first. Same-timestamp rows are ordered by ascending balance, then
/// newest id.
pub async fn list_logs<'c, E>(exec: E, card_id: &str) -> Result<Vec<PaymentLogEntry>>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, PaymentLogEntry>(&format!(
        "SELECT {LOG_COLUMNS} FROM payment_logs WHERE card_id = ?
         ORDER BY created_at DESC, current_balance_cents ASC, id DESC"
    ))
    .bind(card_id)
    .fetch_all(exec)
    .await
}

pub async fn list_all_logs<'c, E>(exec: E) -> Result<Vec<PaymentLogEntry>>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, PaymentLogEntry>(&format!(
        "SELECT {LOG_COLUMNS} FROM payment_logs ORDER BY id"
    ))
    .fetch_all(exec)
    .await
}
