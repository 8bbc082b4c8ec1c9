use axum::{Json, Router, response::IntoResponse, routing::get};
use chrono::Utc;
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    dtos::HealthResponseDto,
    error::HttpError,
    handler::{
        auth::auth_handler, collection_point::collection_point_handler, report::report_handler,
        stats::stats_handler, user::users_handler,
    },
};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .route("/health", get(health))
        .nest("/auth", auth_handler(app_state.clone()))
        .nest("/users", users_handler(app_state.clone()))
        .nest("/reports", report_handler(app_state.clone()))
        .nest("/collection-points", collection_point_handler(app_state.clone()))
        .nest("/stats", stats_handler(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new()
        .route("/", get(welcome))
        .nest("/api", api_route)
        .fallback(not_found)
}

async fn welcome() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Bienvenido a Latacunga Clean API",
        "version": "1.0.0",
        "status": "active",
    }))
}

async fn health() -> impl IntoResponse {
    let environment = if cfg!(debug_assertions) {
        "development"
    } else {
        "production"
    };

    Json(HealthResponseDto {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        environment: environment.to_string(),
    })
}

async fn not_found() -> HttpError {
    HttpError::not_found("Ruta no encontrada")
}
