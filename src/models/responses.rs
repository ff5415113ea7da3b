use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{Role, UserProfile};
use crate::services::payments::{CheckoutSession, GatewayKind};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: bool,
    pub backend: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderResponse {
    pub updated: usize,
    pub order: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub txn_id: String,
    pub gateway: GatewayKind,
    pub session: CheckoutSession,
}

/// Profile plus granted roles, for the admin user list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserView {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub roles: Vec<Role>,
}
