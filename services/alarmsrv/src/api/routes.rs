//! Route table

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::api::{alarm_types, alarms, auth};
use crate::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/alarmes", get(alarms::list).post(alarms::create))
        .route("/alarmes/stats", get(alarms::stats))
        .route(
            "/alarmes/{id}",
            get(alarms::show)
                .put(alarms::update)
                .patch(alarms::update)
                .delete(alarms::destroy),
        )
        .route(
            "/tipo-alarmes",
            get(alarm_types::index).post(alarm_types::store),
        )
        .route(
            "/tipo-alarmes/{id}",
            get(alarm_types::show)
                .put(alarm_types::update)
                .delete(alarm_types::destroy),
        )
        .route("/user", get(auth::current_user))
        .route("/logout", post(auth::logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .route("/login", post(auth::login));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
