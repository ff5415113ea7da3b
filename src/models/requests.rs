use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::domain::{BookingStatus, PaymentMethod, Role};

/// Model directory filters
///
/// GET /api/v1/models?city=..&gender=..&minHeightCm=..
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ModelSearchQuery {
    #[validate(length(max = 80))]
    pub city: Option<String>,
    #[validate(length(max = 32))]
    pub gender: Option<String>,
    #[validate(range(min = 100, max = 230))]
    pub min_height_cm: Option<i32>,
    #[validate(range(min = 100, max = 230))]
    pub max_height_cm: Option<i32>,
    pub agency_id: Option<Uuid>,
    pub available_only: Option<bool>,
    pub limit: Option<u16>,
    pub offset: Option<u32>,
}

/// Partial model update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateModelRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 80))]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 80))]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 100, max = 230))]
    pub height_cm: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 40, max = 160))]
    pub bust_cm: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 40, max = 160))]
    pub waist_cm: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 40, max = 160))]
    pub hips_cm: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hair_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eye_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0))]
    pub day_rate_minor: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddPortfolioImageRequest {
    #[validate(url)]
    pub url: String,
    #[validate(length(max = 280))]
    pub caption: Option<String>,
}

/// Full dragged sequence of image ids, first element ends up at position 0
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReorderPortfolioRequest {
    #[validate(length(min = 1, max = 200))]
    pub image_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub model_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(range(min = 0))]
    pub fee_minor: i64,
    #[validate(length(equal = 3))]
    pub currency: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    #[validate(length(min = 1, max = 4000))]
    pub body: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCampaignRequest {
    #[validate(length(min = 3, max = 120))]
    pub title: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub budget_minor: Option<i64>,
    pub starts_on: Option<NaiveDate>,
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 64))]
    pub plan_id: String,
    #[validate(range(min = 1))]
    pub amount_minor: i64,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignmentRequest {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u16>,
    pub offset: Option<u32>,
}
