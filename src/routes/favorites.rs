use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::auth::AuthUser;
use super::AppState;
use crate::error::ApiError;
use crate::models::Favorite;
use crate::services::TableQuery;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/favorites", web::get().to(list_favorites))
        .route("/favorites/{model_id}", web::get().to(is_favorite))
        .route("/favorites/{model_id}", web::put().to(add_favorite))
        .route("/favorites/{model_id}", web::delete().to(remove_favorite));
}

fn favorite_query(user_id: Uuid, model_id: Uuid) -> TableQuery {
    TableQuery::new().eq("user_id", user_id).eq("model_id", model_id)
}

async fn list_favorites(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse, ApiError> {
    let favorites: Vec<Favorite> = state
        .backend
        .select(
            &state.tables().favorites,
            &TableQuery::new().eq("user_id", user.user_id()).order("created_at", false),
            user.credential(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(favorites))
}

async fn is_favorite(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let model_id = path.into_inner();
    let rows: Vec<Favorite> = state
        .backend
        .select(&state.tables().favorites, &favorite_query(user.user_id(), model_id), user.credential())
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "model_id": model_id, "favorite": !rows.is_empty() })))
}

/// Idempotent: favouriting twice leaves one row
async fn add_favorite(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let favorite = Favorite {
        user_id: user.user_id(),
        model_id: path.into_inner(),
        created_at: None,
    };

    let mut rows: Vec<Favorite> = state
        .backend
        .upsert(&state.tables().favorites, &[favorite.clone()], "user_id,model_id", user.credential())
        .await?;

    Ok(HttpResponse::Ok().json(rows.pop().unwrap_or(favorite)))
}

async fn remove_favorite(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let model_id = path.into_inner();
    state
        .backend
        .delete(&state.tables().favorites, &favorite_query(user.user_id(), model_id), user.credential())
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
