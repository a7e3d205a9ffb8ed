use axum::{Json, extract::State};
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct NfcReadResponse {
    pub nfc_id: String,
}

/// GET /api/nfc/scan
/// Latest scanned card id, or `null`. Each id is handed out once.
pub async fn scan(State(state): State<AppState>) -> Json<Option<NfcReadResponse>> {
    Json(state.nfc.take_latest().map(|nfc_id| NfcReadResponse { nfc_id }))
}
