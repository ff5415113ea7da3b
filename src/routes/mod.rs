// Route exports
pub mod admin;
pub mod auth;
pub mod bookings;
pub mod campaigns;
pub mod favorites;
pub mod health;
pub mod messages;
pub mod models;
pub mod notifications;
pub mod payments;
pub mod portfolio;

use actix_web::web;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{Settings, TableSettings};
use crate::error::ApiError;
use crate::models::{NewNotification, Notification, Role, UserRole};
use crate::services::{BackendClient, CacheKey, CacheManager, Credential, PaymentGateways, PostgresClient, TableQuery};
use auth::{AuthUser, TokenVerifier};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub backend: Arc<BackendClient>,
    pub cache: Arc<CacheManager>,
    pub postgres: Arc<PostgresClient>,
    pub gateways: PaymentGateways,
    pub tokens: Arc<TokenVerifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct IdRow {
    pub id: Uuid,
}

impl AppState {
    pub fn tables(&self) -> &TableSettings {
        &self.settings.tables
    }

    /// Roles granted to a user, cached per user
    pub async fn roles_for(&self, user_id: Uuid, token: &str) -> Result<Vec<Role>, ApiError> {
        let key = CacheKey::roles(&user_id);
        if let Ok(roles) = self.cache.get::<Vec<Role>>(&key).await {
            return Ok(roles);
        }

        let rows: Vec<UserRole> = self
            .backend
            .select(
                &self.tables().user_roles,
                &TableQuery::new().eq("user_id", user_id),
                Credential::User(token),
            )
            .await?;

        let roles: Vec<Role> = rows.into_iter().map(|r| r.role).collect();

        if let Err(e) = self.cache.set(&key, &roles).await {
            tracing::warn!("Failed to cache roles for {}: {}", user_id, e);
        }

        Ok(roles)
    }

    /// Agencies owned by the caller; empty for non-agency users
    pub async fn owned_agencies(&self, user: &AuthUser) -> Result<Vec<Uuid>, ApiError> {
        if !user.viewer.has_role(Role::Agency) {
            return Ok(Vec::new());
        }

        let rows: Vec<IdRow> = self
            .backend
            .select(
                &self.tables().agencies,
                &TableQuery::new().select("id").eq("owner_id", user.viewer.user_id),
                user.credential(),
            )
            .await?;

        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    /// Drop a notification in someone's inbox; failures are only logged
    pub async fn notify(&self, user_id: Uuid, kind: &str, body: String, link: Option<String>, credential: Credential<'_>) {
        let notification = NewNotification {
            user_id,
            kind: kind.to_string(),
            body,
            link,
        };

        if let Err(e) = self
            .backend
            .insert::<Notification, _>(&self.tables().notifications, &notification, credential)
            .await
        {
            tracing::warn!("Failed to notify {} ({}): {}", user_id, kind, e);
        }
    }

    /// Write an audit entry without holding up the response
    pub fn audit(&self, actor: Option<Uuid>, action: &str, detail: String) {
        let postgres = self.postgres.clone();
        let action = action.to_string();
        actix_web::rt::spawn(async move {
            if let Err(e) = postgres.record_audit(actor, &action, &detail).await {
                tracing::warn!("Failed to write audit entry for {}: {}", action, e);
            }
        });
    }
}

/// Record server-side failures of a handler step in the audit log
pub trait AuditExt<T> {
    fn audited(self, state: &AppState, actor: Option<Uuid>, action: &str) -> Result<T, ApiError>;
}

impl<T, E> AuditExt<T> for Result<T, E>
where
    E: Into<ApiError>,
{
    fn audited(self, state: &AppState, actor: Option<Uuid>, action: &str) -> Result<T, ApiError> {
        self.map_err(|e| {
            let err: ApiError = e.into();
            if actix_web::ResponseError::status_code(&err).is_server_error() {
                state.audit(actor, action, err.to_string());
            }
            err
        })
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::configure)
            .configure(models::configure)
            .configure(portfolio::configure)
            .configure(bookings::configure)
            .configure(messages::configure)
            .configure(notifications::configure)
            .configure(favorites::configure)
            .configure(campaigns::configure)
            .configure(payments::configure)
            .configure(admin::configure),
    );
}
