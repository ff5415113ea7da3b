use actix_web::{web, HttpResponse};
use validator::Validate;

use super::auth::AuthUser;
use super::AppState;
use crate::core::policy;
use crate::error::ApiError;
use crate::models::{Campaign, CampaignStatus, CreateCampaignRequest, NewCampaign, PageQuery};
use crate::services::TableQuery;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/campaigns", web::get().to(list_campaigns))
        .route("/campaigns", web::post().to(create_campaign));
}

/// Open campaigns plus the caller's own drafts; admins see all
async fn list_campaigns(
    state: web::Data<AppState>,
    user: AuthUser,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut query = TableQuery::new();
    if !user.viewer.is_admin() {
        query = query.or_any(&[
            ("status", "eq", CampaignStatus::Open.as_str().to_string()),
            ("brand_id", "eq", user.user_id().to_string()),
        ]);
    }

    let limit = page.limit.unwrap_or(50).clamp(1, 100) as usize;
    let query = query
        .order("created_at", false)
        .limit(limit)
        .offset(page.offset.unwrap_or(0) as usize);

    let campaigns: Vec<Campaign> = state
        .backend
        .select(&state.tables().campaigns, &query, user.credential())
        .await?;

    let visible: Vec<Campaign> = campaigns
        .into_iter()
        .filter(|c| policy::can_view_campaign(&user.viewer, c))
        .collect();

    Ok(HttpResponse::Ok().json(visible))
}

async fn create_campaign(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<CreateCampaignRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    if !policy::can_create_campaign(&user.viewer) {
        return Err(ApiError::Forbidden("Only brands can post campaigns".to_string()));
    }

    let req = req.into_inner();
    let campaign = NewCampaign {
        brand_id: user.user_id(),
        title: req.title.trim().to_string(),
        description: req.description,
        budget_minor: req.budget_minor,
        status: if req.publish { CampaignStatus::Open } else { CampaignStatus::Draft },
        starts_on: req.starts_on,
    };

    let created: Campaign = state
        .backend
        .insert(&state.tables().campaigns, &campaign, user.credential())
        .await?;

    tracing::info!("Campaign {} created by {} ({:?})", created.id, user.user_id(), created.status);
    Ok(HttpResponse::Created().json(created))
}
