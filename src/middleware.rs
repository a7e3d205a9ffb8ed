use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Rejects requests whose `x-api-key` header does not match the configured key.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .ok_or(ApiError::Unauthorized("Missing API Key"))?;

    if provided.as_bytes() != state.config.api_key.as_bytes() {
        return Err(ApiError::Unauthorized("Invalid API Key"));
    }

    Ok(next.run(request).await)
}
