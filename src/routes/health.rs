use actix_web::{web, HttpResponse, Responder};

use super::AppState;
use crate::models::HealthResponse;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}

/// Health check endpoint
///
/// Reports `degraded` rather than failing when a dependency is down.
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let database = state.postgres.health_check().await.unwrap_or(false);
    let backend = state.backend.health_check().await;

    let status = if database && backend { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        backend,
        timestamp: chrono::Utc::now(),
    })
}
