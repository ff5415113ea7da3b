use actix_web::{web, HttpResponse};
use std::collections::HashMap;
use uuid::Uuid;

use super::auth::RequireAdmin;
use super::{AppState, AuditExt};
use crate::error::ApiError;
use crate::models::{AdminUserView, PageQuery, Role, RoleAssignmentRequest, UserProfile, UserRole};
use crate::services::{CacheKey, TableQuery};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/admin/users", web::get().to(list_users))
        .route("/admin/roles", web::post().to(grant_role))
        .route("/admin/roles", web::delete().to(revoke_role))
        .route("/admin/audit", web::get().to(list_audit));
}

fn page_bounds(page: &PageQuery) -> (usize, usize) {
    let limit = page.limit.unwrap_or(50).clamp(1, 200) as usize;
    (limit, page.offset.unwrap_or(0) as usize)
}

async fn forget_roles(state: &AppState, user_id: Uuid) {
    if let Err(e) = state.cache.delete(&CacheKey::roles(&user_id)).await {
        tracing::warn!("Failed to evict cached roles for {}: {}", user_id, e);
    }
}

/// Users with their roles, newest first
async fn list_users(
    state: web::Data<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let (limit, offset) = page_bounds(&page);

    let profiles: Vec<UserProfile> = state
        .backend
        .select(
            &state.tables().profiles,
            &TableQuery::new().order("created_at", false).limit(limit).offset(offset),
            admin.credential(),
        )
        .await?;

    if profiles.is_empty() {
        return Ok(HttpResponse::Ok().json(Vec::<AdminUserView>::new()));
    }

    let grants: Vec<UserRole> = state
        .backend
        .select(
            &state.tables().user_roles,
            &TableQuery::new().in_list("user_id", profiles.iter().map(|p| p.id)),
            admin.credential(),
        )
        .await?;

    let mut by_user: HashMap<Uuid, Vec<Role>> = HashMap::new();
    for grant in grants {
        by_user.entry(grant.user_id).or_default().push(grant.role);
    }

    let users: Vec<AdminUserView> = profiles
        .into_iter()
        .map(|profile| AdminUserView {
            roles: by_user.remove(&profile.id).unwrap_or_default(),
            profile,
        })
        .collect();

    Ok(HttpResponse::Ok().json(users))
}

/// Grant a role; granting one the user already holds is a no-op
async fn grant_role(
    state: web::Data<AppState>,
    RequireAdmin(admin): RequireAdmin,
    req: web::Json<RoleAssignmentRequest>,
) -> Result<HttpResponse, ApiError> {
    let grant = UserRole {
        user_id: req.user_id,
        role: req.role,
    };

    let rows = state
        .backend
        .upsert::<UserRole, _>(&state.tables().user_roles, &[grant.clone()], "user_id,role", admin.credential())
        .await
        .audited(&state, Some(admin.user_id()), "role.grant")?;

    forget_roles(&state, grant.user_id).await;
    state.audit(
        Some(admin.user_id()),
        "role.grant",
        format!("user={} role={}", grant.user_id, grant.role),
    );
    tracing::info!("Admin {} granted {} to {}", admin.user_id(), grant.role, grant.user_id);

    Ok(HttpResponse::Ok().json(rows.into_iter().next().unwrap_or(grant)))
}

async fn revoke_role(
    state: web::Data<AppState>,
    RequireAdmin(admin): RequireAdmin,
    req: web::Json<RoleAssignmentRequest>,
) -> Result<HttpResponse, ApiError> {
    if req.user_id == admin.user_id() && req.role == Role::Admin {
        return Err(ApiError::Validation("You cannot remove your own admin role".to_string()));
    }

    let removed = state
        .backend
        .delete(
            &state.tables().user_roles,
            &TableQuery::new().eq("user_id", req.user_id).eq("role", req.role),
            admin.credential(),
        )
        .await
        .audited(&state, Some(admin.user_id()), "role.revoke")?;

    if removed == 0 {
        return Err(ApiError::NotFound(format!("User {} does not have role {}", req.user_id, req.role)));
    }

    forget_roles(&state, req.user_id).await;
    state.audit(
        Some(admin.user_id()),
        "role.revoke",
        format!("user={} role={}", req.user_id, req.role),
    );

    Ok(HttpResponse::NoContent().finish())
}

async fn list_audit(
    state: web::Data<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let (limit, offset) = page_bounds(&page);
    let entries = state.postgres.recent_audit(limit as i64, offset as i64).await?;
    Ok(HttpResponse::Ok().json(entries))
}
