use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use super::auth::AuthUser;
use super::{AppState, AuditExt};
use crate::core::{build_model_query, policy};
use crate::error::ApiError;
use crate::models::{ModelProfile, ModelSearchQuery, UpdateModelRequest};
use crate::services::{CacheKey, TableQuery};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/models", web::get().to(search_models))
        .route("/models/{model_id}", web::get().to(get_model))
        .route("/models/{model_id}", web::patch().to(update_model));
}

/// Load a model profile under the caller's identity
pub(crate) async fn load_model(state: &AppState, user: &AuthUser, model_id: Uuid) -> Result<ModelProfile, ApiError> {
    let model = state
        .backend
        .select_one(&state.tables().models, TableQuery::new().eq("id", model_id), user.credential())
        .await?;
    Ok(model)
}

/// Load a model and check the caller may edit it
pub(crate) async fn load_managed_model(
    state: &AppState,
    user: &AuthUser,
    model_id: Uuid,
) -> Result<ModelProfile, ApiError> {
    let model = load_model(state, user, model_id).await?;
    let owned = state.owned_agencies(user).await?;

    if !policy::can_manage_model(&user.viewer, &model, &owned) {
        return Err(ApiError::Forbidden("You cannot manage this model".to_string()));
    }
    Ok(model)
}

/// Model directory
///
/// GET /api/v1/models?city=Mumbai&gender=female&minHeightCm=170&availableOnly=true
///
/// Results are cached per viewer and rendered query; any model edit clears them.
async fn search_models(
    state: web::Data<AppState>,
    user: AuthUser,
    search: web::Query<ModelSearchQuery>,
) -> Result<HttpResponse, ApiError> {
    search.validate()?;

    let query = build_model_query(&search);
    let cache_key = CacheKey::models(&user.user_id(), &query.to_query_string());

    if let Ok(cached) = state.cache.get::<Vec<ModelProfile>>(&cache_key).await {
        tracing::debug!("Cache hit for {}", cache_key);
        return Ok(HttpResponse::Ok().json(cached));
    }

    let models: Vec<ModelProfile> = state
        .backend
        .select(&state.tables().models, &query, user.credential())
        .await?;

    if let Err(e) = state.cache.set(&cache_key, &models).await {
        tracing::warn!("Failed to cache model search: {}", e);
    }

    Ok(HttpResponse::Ok().json(models))
}

async fn get_model(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let model_id = path.into_inner();
    let cache_key = CacheKey::model(&user.user_id(), &model_id);

    if let Ok(cached) = state.cache.get::<ModelProfile>(&cache_key).await {
        return Ok(HttpResponse::Ok().json(cached));
    }

    let model = load_model(&state, &user, model_id).await?;

    if let Err(e) = state.cache.set(&cache_key, &model).await {
        tracing::warn!("Failed to cache model {}: {}", model_id, e);
    }

    Ok(HttpResponse::Ok().json(model))
}

/// Partial profile update by the model, their agency, or an admin
async fn update_model(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<UpdateModelRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let model_id = path.into_inner();

    load_managed_model(&state, &user, model_id).await?;

    let mut updated = state
        .backend
        .update::<ModelProfile, _>(
            &state.tables().models,
            &TableQuery::new().eq("id", model_id),
            &req.into_inner(),
            user.credential(),
        )
        .await
        .audited(&state, Some(user.user_id()), "model.update")?;

    let model = updated
        .pop()
        .ok_or_else(|| ApiError::NotFound(format!("Model {} not found", model_id)))?;

    invalidate_models(&state, model_id).await;
    tracing::info!("User {} updated model {}", user.user_id(), model_id);

    Ok(HttpResponse::Ok().json(model))
}

pub(crate) async fn invalidate_models(state: &AppState, model_id: Uuid) {
    // Every viewer's pages and cards share the prefix
    if let Err(e) = state.cache.invalidate_prefix(CacheKey::MODELS_PREFIX).await {
        tracing::warn!("Failed to clear model cache after editing {}: {}", model_id, e);
    }
}
