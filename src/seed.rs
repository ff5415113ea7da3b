//! Demo data for local and staging environments.
//!
//! Every write is an upsert on a natural unique key, so running the seed
//! again converges on the same rows instead of duplicating them.

use serde_json::json;
use uuid::Uuid;

use crate::config::TableSettings;
use crate::models::{Agency, ModelProfile, PortfolioImage, Role, UserProfile, UserRole};
use crate::services::{BackendClient, BackendError, Credential};

/// One demo sign-in
#[derive(Debug, Clone)]
pub struct DemoAccount {
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

const ACCOUNTS: &[(&str, &str, Role)] = &[
    ("admin@casting-hub.test", "Asha Admin", Role::Admin),
    ("agency@casting-hub.test", "Vikram Talent", Role::Agency),
    ("brand@casting-hub.test", "Meera Couture", Role::Brand),
    ("model@casting-hub.test", "Ria Kapoor", Role::Model),
];

const PORTFOLIO: &[(&str, &str)] = &[
    ("https://images.casting-hub.test/demo/ria-01.jpg", "Editorial, Mumbai"),
    ("https://images.casting-hub.test/demo/ria-02.jpg", "Runway"),
    ("https://images.casting-hub.test/demo/ria-03.jpg", "Studio headshot"),
];

/// What to create and the shared demo password
#[derive(Debug, Clone)]
pub struct SeedPlan {
    pub password: String,
    pub accounts: Vec<DemoAccount>,
    pub agency_name: String,
    pub agency_commission_bps: i32,
}

impl SeedPlan {
    pub fn demo(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            accounts: ACCOUNTS
                .iter()
                .map(|(email, name, role)| DemoAccount {
                    email: email.to_string(),
                    full_name: name.to_string(),
                    role: *role,
                })
                .collect(),
            agency_name: "Northline Talent".to_string(),
            agency_commission_bps: 1500,
        }
    }

    fn account(&self, role: Role) -> Option<&DemoAccount> {
        self.accounts.iter().find(|a| a.role == role)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    pub users: Vec<(Role, Uuid)>,
    pub agency_id: Option<Uuid>,
    pub model_id: Option<Uuid>,
    pub images: usize,
}

impl SeedReport {
    fn user(&self, role: Role) -> Option<Uuid> {
        self.users.iter().find(|(r, _)| *r == role).map(|(_, id)| *id)
    }
}

/// Create the auth account, or find the existing one by email
async fn ensure_user(backend: &BackendClient, account: &DemoAccount, password: &str) -> Result<Uuid, BackendError> {
    let metadata = json!({ "full_name": account.full_name, "role": account.role });

    match backend.create_auth_user(&account.email, password, metadata).await {
        Ok(id) => {
            tracing::info!("Created {} ({})", account.email, id);
            Ok(id)
        }
        Err(BackendError::Conflict(_)) => {
            // The profile may be missing if an earlier run stopped halfway
            let id = backend.find_auth_user(&account.email).await?.ok_or_else(|| {
                BackendError::NotFound(format!("{} is registered but not listed by the auth API", account.email))
            })?;
            tracing::info!("{} already registered ({})", account.email, id);
            Ok(id)
        }
        Err(e) => Err(e),
    }
}

fn first<T>(rows: Vec<T>, table: &str) -> Result<T, BackendError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| BackendError::InvalidResponse(format!("{}: upsert returned no rows", table)))
}

/// Run the plan against the backend with the service key
///
/// Steps run one after another; a failure stops the run and leaves what
/// was already written in place for the next attempt to converge.
pub async fn run(backend: &BackendClient, tables: &TableSettings, plan: &SeedPlan) -> Result<SeedReport, BackendError> {
    let mut report = SeedReport::default();

    for account in &plan.accounts {
        let user_id = ensure_user(backend, account, &plan.password).await?;

        backend
            .upsert::<UserProfile, _>(
                &tables.profiles,
                &[json!({ "id": user_id, "email": account.email, "full_name": account.full_name })],
                "id",
                Credential::Service,
            )
            .await?;

        backend
            .upsert::<UserRole, _>(
                &tables.user_roles,
                &[UserRole { user_id, role: account.role }],
                "user_id,role",
                Credential::Service,
            )
            .await?;

        report.users.push((account.role, user_id));
    }

    let (Some(owner), Some(model_user)) = (report.user(Role::Agency), report.user(Role::Model)) else {
        tracing::warn!("Seed plan has no agency or model account, skipping marketplace rows");
        return Ok(report);
    };

    let agency: Agency = first(
        backend
            .upsert(
                &tables.agencies,
                &[json!({
                    "owner_id": owner,
                    "name": plan.agency_name,
                    "city": "Mumbai",
                    "commission_rate_bps": plan.agency_commission_bps,
                })],
                "owner_id",
                Credential::Service,
            )
            .await?,
        &tables.agencies,
    )?;
    report.agency_id = Some(agency.id);

    let display_name = plan
        .account(Role::Model)
        .map(|a| a.full_name.clone())
        .unwrap_or_else(|| "Demo Model".to_string());

    let model: ModelProfile = first(
        backend
            .upsert(
                &tables.models,
                &[json!({
                    "user_id": model_user,
                    "agency_id": agency.id,
                    "display_name": display_name,
                    "city": "Mumbai",
                    "gender": "female",
                    "height_cm": 175,
                    "bust_cm": 84,
                    "waist_cm": 61,
                    "hips_cm": 89,
                    "hair_color": "black",
                    "eye_color": "brown",
                    "bio": "Editorial and runway. Based in Mumbai, available across India.",
                    "day_rate_minor": 2_500_000,
                    "is_available": true,
                })],
                "user_id",
                Credential::Service,
            )
            .await?,
        &tables.models,
    )?;
    report.model_id = Some(model.id);

    let images: Vec<serde_json::Value> = PORTFOLIO
        .iter()
        .enumerate()
        .map(|(position, (url, caption))| {
            json!({
                "model_id": model.id,
                "url": url,
                "caption": caption,
                "position": position,
                "is_cover": position == 0,
            })
        })
        .collect();

    let stored: Vec<PortfolioImage> = backend
        .upsert(&tables.portfolio_images, &images, "model_id,position", Credential::Service)
        .await?;
    report.images = stored.len();

    tracing::info!(
        "Seed complete: {} users, agency {}, model {}, {} images",
        report.users.len(),
        agency.id,
        model.id,
        report.images
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_plan_has_one_account_per_role() {
        let plan = SeedPlan::demo("pw");
        for role in [Role::Admin, Role::Agency, Role::Brand, Role::Model] {
            assert_eq!(plan.accounts.iter().filter(|a| a.role == role).count(), 1);
        }
    }
}
