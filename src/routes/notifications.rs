use actix_web::{web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use super::auth::AuthUser;
use super::AppState;
use crate::error::ApiError;
use crate::models::{Notification, NotificationQuery};
use crate::services::TableQuery;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/notifications", web::get().to(list_notifications))
        .route("/notifications/{notification_id}/read", web::post().to(mark_read));
}

async fn list_notifications(
    state: web::Data<AppState>,
    user: AuthUser,
    params: web::Query<NotificationQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut query = TableQuery::new().eq("user_id", user.user_id());
    if params.unread_only {
        query = query.is_null("read_at");
    }

    let notifications: Vec<Notification> = state
        .backend
        .select(
            &state.tables().notifications,
            &query.order("created_at", false).limit(100),
            user.credential(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(notifications))
}

async fn mark_read(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let notification_id = path.into_inner();

    let mut updated: Vec<Notification> = state
        .backend
        .update(
            &state.tables().notifications,
            &TableQuery::new().eq("id", notification_id).eq("user_id", user.user_id()),
            &json!({ "read_at": chrono::Utc::now() }),
            user.credential(),
        )
        .await?;

    let notification = updated
        .pop()
        .ok_or_else(|| ApiError::NotFound(format!("Notification {} not found", notification_id)))?;

    Ok(HttpResponse::Ok().json(notification))
}
