use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};

use crate::money::Money;

/// Fixed log descriptions for non-purchase events
pub const LOG_CREATED: &str = "Created";
pub const LOG_UPDATED: &str = "Updated";
pub const LOG_DELETED: &str = "Deleted";
pub const LOG_TOP_UP: &str = "Top Up";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Card {
    pub card_id: String,
    pub is_adult: bool,
    #[sqlx(rename = "balance_cents")]
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PaymentLogEntry {
    pub id: i64,
    pub card_id: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: NaiveDateTime,
    #[sqlx(rename = "amount_cents")]
    pub amount: Money,
    #[sqlx(rename = "current_balance_cents")]
    pub current_balance: Money,
    pub description: String,
}

/// A log row before the store assigns `id` and `created_at`
#[derive(Debug, Clone)]
pub struct NewLogEntry<'a> {
    pub card_id: &'a str,
    pub amount: Money,
    pub current_balance: Money,
    pub description: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub card_id: String,
    #[serde(default)]
    pub is_adult: bool,
}

/// Partial card update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardUpdate {
    #[serde(default)]
    pub is_adult: Option<bool>,
    #[serde(default)]
    pub balance: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpRequest {
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookItemRequest {
    pub name: String,
    pub price: Money,
    pub is_alcoholic: bool,
}

fn serialize_timestamp<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&ts.format("%Y-%m-%d %H:%M:%S"))
}
