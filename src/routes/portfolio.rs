use actix_web::{web, HttpResponse};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::auth::AuthUser;
use super::models::{invalidate_models, load_managed_model, load_model};
use super::{AppState, AuditExt};
use crate::core::{compact_positions, cover_changes, next_position, plan_reorder, CoverChange, PositionUpdate};
use crate::error::ApiError;
use crate::models::{AddPortfolioImageRequest, NewPortfolioImage, PortfolioImage, ReorderPortfolioRequest, ReorderResponse};
use crate::services::{Credential, TableQuery};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/models/{model_id}/portfolio", web::get().to(list_images))
        .route("/models/{model_id}/portfolio", web::post().to(add_image))
        .route("/models/{model_id}/portfolio/order", web::put().to(reorder_images))
        .route("/models/{model_id}/portfolio/{image_id}/cover", web::post().to(set_cover))
        .route("/models/{model_id}/portfolio/{image_id}", web::delete().to(delete_image));
}

async fn fetch_images(state: &AppState, model_id: Uuid, credential: Credential<'_>) -> Result<Vec<PortfolioImage>, ApiError> {
    let images = state
        .backend
        .select(
            &state.tables().portfolio_images,
            &TableQuery::new().eq("model_id", model_id).order("position", true),
            credential,
        )
        .await?;
    Ok(images)
}

/// Patch one image of this model
///
/// A row the backend filtered out (deleted meanwhile, or hidden by policy)
/// comes back as an empty representation and is reported as a conflict.
async fn patch_image(
    state: &AppState,
    model_id: Uuid,
    image_id: Uuid,
    body: &serde_json::Value,
    credential: Credential<'_>,
) -> Result<(), ApiError> {
    let updated: Vec<PortfolioImage> = state
        .backend
        .update(
            &state.tables().portfolio_images,
            &TableQuery::new().eq("id", image_id).eq("model_id", model_id),
            body,
            credential,
        )
        .await?;

    if updated.is_empty() {
        return Err(ApiError::Conflict(format!(
            "Image {} changed while saving, reload the portfolio and try again",
            image_id
        )));
    }
    Ok(())
}

/// Persist position changes one row at a time
async fn apply_positions(
    state: &AppState,
    model_id: Uuid,
    updates: &[PositionUpdate],
    credential: Credential<'_>,
) -> Result<(), ApiError> {
    for update in updates {
        patch_image(state, model_id, update.image_id, &json!({ "position": update.position }), credential).await?;
    }
    Ok(())
}

/// Persist cover flags in order; unsets are expected first
async fn apply_covers(
    state: &AppState,
    model_id: Uuid,
    changes: &[CoverChange],
    credential: Credential<'_>,
) -> Result<(), ApiError> {
    for change in changes {
        patch_image(state, model_id, change.image_id, &json!({ "is_cover": change.is_cover }), credential).await?;
    }
    Ok(())
}

async fn list_images(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let model_id = path.into_inner();
    // 404 for unknown models rather than an empty gallery
    load_model(&state, &user, model_id).await?;

    let images = fetch_images(&state, model_id, user.credential()).await?;
    Ok(HttpResponse::Ok().json(images))
}

/// Append an image; the first image of a portfolio becomes its cover
async fn add_image(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<AddPortfolioImageRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let model_id = path.into_inner();
    load_managed_model(&state, &user, model_id).await?;

    let current = fetch_images(&state, model_id, user.credential()).await?;
    let req = req.into_inner();

    let image = NewPortfolioImage {
        model_id,
        url: req.url,
        caption: req.caption,
        position: next_position(&current),
        is_cover: current.is_empty(),
    };

    let created: PortfolioImage = state
        .backend
        .insert(&state.tables().portfolio_images, &image, user.credential())
        .await?;

    invalidate_models(&state, model_id).await;
    Ok(HttpResponse::Created().json(created))
}

/// Save a drag-and-drop order
///
/// PUT /api/v1/models/{model_id}/portfolio/order
///
/// ```json
/// { "image_ids": ["<first>", "<second>", "..."] }
/// ```
async fn reorder_images(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<ReorderPortfolioRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let model_id = path.into_inner();
    load_managed_model(&state, &user, model_id).await?;

    let current = fetch_images(&state, model_id, user.credential()).await?;
    let updates = plan_reorder(&current, &req.image_ids)?;

    tracing::info!(
        "Reordering portfolio of {}: {} of {} images move",
        model_id,
        updates.len(),
        current.len()
    );

    apply_positions(&state, model_id, &updates, user.credential())
        .await
        .audited(&state, Some(user.user_id()), "portfolio.reorder")?;

    Ok(HttpResponse::Ok().json(ReorderResponse {
        updated: updates.len(),
        order: req.into_inner().image_ids,
    }))
}

async fn set_cover(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    let (model_id, image_id) = path.into_inner();
    load_managed_model(&state, &user, model_id).await?;

    let images = fetch_images(&state, model_id, user.credential()).await?;
    if !images.iter().any(|img| img.id == image_id) {
        return Err(ApiError::NotFound(format!("Image {} not found", image_id)));
    }

    let changes = cover_changes(&images, Some(image_id));
    apply_covers(&state, model_id, &changes, user.credential()).await?;

    invalidate_models(&state, model_id).await;
    Ok(HttpResponse::Ok().json(json!({ "cover": image_id, "updated": changes.len() })))
}

/// Remove an image, close the gap it leaves and keep a cover in place
async fn delete_image(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    let (model_id, image_id) = path.into_inner();
    load_managed_model(&state, &user, model_id).await?;

    let deleted = state
        .backend
        .delete(
            &state.tables().portfolio_images,
            &TableQuery::new().eq("id", image_id).eq("model_id", model_id),
            user.credential(),
        )
        .await?;

    if deleted == 0 {
        return Err(ApiError::NotFound(format!("Image {} not found", image_id)));
    }

    let remaining = fetch_images(&state, model_id, user.credential()).await?;
    apply_positions(&state, model_id, &compact_positions(&remaining), user.credential()).await?;
    apply_covers(&state, model_id, &cover_changes(&remaining, None), user.credential()).await?;

    invalidate_models(&state, model_id).await;
    Ok(HttpResponse::NoContent().finish())
}
