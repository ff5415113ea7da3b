use actix_web::{web, HttpResponse};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::auth::AuthUser;
use super::AppState;
use crate::error::ApiError;
use crate::models::{Message, NewMessage, SendMessageRequest};
use crate::services::{Credential, TableQuery};

/// Most recent messages returned for one conversation
const THREAD_LIMIT: usize = 200;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/messages", web::post().to(send_message))
        .route("/messages/{other_user_id}", web::get().to(get_thread))
        .route("/messages/{message_id}/read", web::post().to(mark_read));
}

async fn send_message(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let req = req.into_inner();

    if req.recipient_id == user.user_id() {
        return Err(ApiError::Validation("You cannot message yourself".to_string()));
    }

    let message = NewMessage {
        sender_id: user.user_id(),
        recipient_id: req.recipient_id,
        body: req.body.trim().to_string(),
    };

    let created: Message = state
        .backend
        .insert(&state.tables().messages, &message, user.credential())
        .await?;

    state
        .notify(
            req.recipient_id,
            "message.received",
            "You have a new message".to_string(),
            Some(format!("/messages/{}", user.user_id())),
            Credential::Service,
        )
        .await;

    Ok(HttpResponse::Created().json(created))
}

/// The latest page of a conversation between the caller and one other
/// user, returned oldest first
async fn get_thread(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let other = path.into_inner();
    let me = user.user_id();
    let pair = [me, other];

    let query = TableQuery::new()
        .in_list("sender_id", pair)
        .in_list("recipient_id", pair)
        .order("created_at", false)
        .limit(THREAD_LIMIT);

    let messages: Vec<Message> = state
        .backend
        .select(&state.tables().messages, &query, user.credential())
        .await?;

    // The list filters also admit notes-to-self; keep only the two-way thread
    let thread: Vec<Message> = messages
        .into_iter()
        .rev()
        .filter(|m| {
            (m.sender_id == me && m.recipient_id == other) || (m.sender_id == other && m.recipient_id == me)
        })
        .collect();

    Ok(HttpResponse::Ok().json(thread))
}

async fn mark_read(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let message_id = path.into_inner();

    let mut updated: Vec<Message> = state
        .backend
        .update(
            &state.tables().messages,
            &TableQuery::new().eq("id", message_id).eq("recipient_id", user.user_id()),
            &json!({ "read_at": chrono::Utc::now() }),
            user.credential(),
        )
        .await?;

    let message = updated
        .pop()
        .ok_or_else(|| ApiError::NotFound(format!("Message {} not found", message_id)))?;

    Ok(HttpResponse::Ok().json(message))
}
