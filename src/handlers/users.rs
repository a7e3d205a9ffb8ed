use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use super::extract::ApiJson;
use crate::{
    app_state::AppState,
    db::{
        models::{Card, CardUpdate, CreateCardRequest, PaymentLogEntry},
        queries::MAX_PAGE_SIZE,
    },
    error::{ApiError, Result},
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    MAX_PAGE_SIZE
}

/// GET /api/users?skip&limit
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Card>>> {
    let cards = state.ledger.list_cards(params.skip, params.limit).await?;
    Ok(Json(cards))
}

/// GET /api/users/{card_id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<Card>> {
    Ok(Json(state.ledger.get_card(&card_id).await?))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateCardRequest>,
) -> Result<(StatusCode, Json<Card>)> {
    let card = state.ledger.create_card(&req.card_id, req.is_adult).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

/// PUT /api/users/{card_id}
pub async fn update_user(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
    ApiJson(update): ApiJson<CardUpdate>,
) -> Result<Json<Card>> {
    Ok(Json(state.ledger.update_card(&card_id, update).await?))
}

/// DELETE /api/users/{card_id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<StatusCode> {
    state.ledger.delete_card(&card_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/{card_id}/history
///
/// An empty history is reported as 404 so callers can tell an unknown card apart.
pub async fn get_user_history(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<Vec<PaymentLogEntry>>> {
    let logs = state.ledger.history(&card_id).await?;
    if logs.is_empty() {
        return Err(ApiError::NotFound(format!("No logs for {card_id} found")));
    }
    Ok(Json(logs))
}
