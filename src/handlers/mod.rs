pub mod balance;
pub mod extract;
pub mod nfc;
pub mod users;

use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{app_state::AppState, middleware::require_api_key};

/// Full HTTP surface. Everything under `/api` needs the API key.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{card_id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{card_id}/history", get(users::get_user_history))
        .route("/users/{card_id}/balance/top-up", post(balance::top_up))
        .route("/users/{card_id}/cocktails/book", post(balance::book_cocktail))
        .route("/nfc/scan", get(nfc::scan))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "CocktailBerry Payment API" }))
}
