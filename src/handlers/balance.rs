use axum::{
    Json,
    extract::{Path, State},
};

use super::extract::ApiJson;
use crate::{
    app_state::AppState,
    db::models::{BookItemRequest, Card, TopUpRequest},
    error::Result,
};

/// POST /api/users/{card_id}/balance/top-up
/// Adds to (or, with a negative amount, subtracts from) the balance
pub async fn top_up(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
    ApiJson(req): ApiJson<TopUpRequest>,
) -> Result<Json<Card>> {
    Ok(Json(state.ledger.top_up(&card_id, req.amount).await?))
}

/// POST /api/users/{card_id}/cocktails/book
/// Charges a cocktail to the card, with age verification for alcoholic ones
pub async fn book_cocktail(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
    ApiJson(req): ApiJson<BookItemRequest>,
) -> Result<Json<Card>> {
    let card = state
        .ledger
        .book_item(&card_id, req.price, req.is_alcoholic, &req.name)
        .await?;
    Ok(Json(card))
}
