use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Application role, one row per (user, role) in `user_roles`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Model,
    Agency,
    Brand,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Model => "model",
            Role::Agency => "agency",
            Role::Brand => "brand",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "model" => Ok(Role::Model),
            "agency" => Ok(Role::Agency),
            "brand" => Ok(Role::Brand),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role: Role,
}

/// Account profile, keyed by the auth user id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agency {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    /// Commission taken on completed bookings, in basis points
    pub commission_rate_bps: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Public model card with physical attributes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub agency_id: Option<Uuid>,
    pub display_name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub height_cm: Option<i32>,
    #[serde(default)]
    pub bust_cm: Option<i32>,
    #[serde(default)]
    pub waist_cm: Option<i32>,
    #[serde(default)]
    pub hips_cm: Option<i32>,
    #[serde(default)]
    pub hair_color: Option<String>,
    #[serde(default)]
    pub eye_color: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub day_rate_minor: Option<i64>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool { true }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioImage {
    pub id: Uuid,
    pub model_id: Uuid,
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
    pub position: i32,
    #[serde(default)]
    pub is_cover: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPortfolioImage {
    pub model_id: Uuid,
    pub url: String,
    pub caption: Option<String>,
    pub position: i32,
    pub is_cover: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Declined,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Declined => "declined",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Declined | BookingStatus::Cancelled | BookingStatus::Completed
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub model_id: Uuid,
    /// Denormalized so both parties can filter on their own id
    pub model_user_id: Uuid,
    #[serde(default)]
    pub agency_id: Option<Uuid>,
    pub client_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    pub fee_minor: i64,
    pub currency: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: BookingStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewBooking {
    pub model_id: Uuid,
    pub model_user_id: Uuid,
    pub agency_id: Option<Uuid>,
    pub client_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
    pub fee_minor: i64,
    pub currency: String,
    pub notes: Option<String>,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commission {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub agency_id: Uuid,
    pub amount_minor: i64,
    pub rate_bps: i32,
    pub currency: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCommission {
    pub booking_id: Uuid,
    pub agency_id: Uuid,
    pub amount_minor: i64,
    pub rate_bps: i32,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Open,
    Closed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Open => "open",
            CampaignStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub budget_minor: Option<i64>,
    pub status: CampaignStatus,
    #[serde(default)]
    pub starts_on: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCampaign {
    pub brand_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub budget_minor: Option<i64>,
    pub status: CampaignStatus,
    pub starts_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub body: String,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub body: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: String,
    pub body: String,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub user_id: Uuid,
    pub model_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Upi,
    Netbanking,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Netbanking => "netbanking",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }
}

/// Subscription payment attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub gateway: String,
    pub txn_id: String,
    pub status: PaymentStatus,
    #[serde(default)]
    pub gateway_ref: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub plan_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub gateway: String,
    pub txn_id: String,
    pub status: PaymentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("brand".parse::<Role>(), Ok(Role::Brand));
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_booking_status_wire_format() {
        let json = serde_json::to_string(&BookingStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        assert!(BookingStatus::Completed.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
    }

    #[test]
    fn test_model_defaults_available() {
        let model: ModelProfile = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "display_name": "Ana"
        }))
        .unwrap();
        assert!(model.is_available);
        assert!(model.agency_id.is_none());
    }
}
