//! Seed demo accounts and marketplace rows into the hosted backend.
//!
//! Usage: `SEED_PASSWORD=... cargo run --bin seed`

use casting_hub::config::Settings;
use casting_hub::seed::{self, SeedPlan};
use casting_hub::services::BackendClient;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let settings = Settings::load()?;
    if settings.backend.service_key.is_empty() {
        return Err("backend.service_key is required to seed (HUB_BACKEND_SERVICE_KEY)".into());
    }

    let password = std::env::var("SEED_PASSWORD").unwrap_or_else(|_| "demo-password-123".to_string());

    let backend = BackendClient::new(
        settings.backend.endpoint.clone(),
        settings.backend.anon_key.clone(),
        settings.backend.service_key.clone(),
        Duration::from_secs(settings.backend.timeout_secs.unwrap_or(30)),
    )?;

    println!("Seeding {}", backend.base_url());

    let report = seed::run(&backend, &settings.tables, &SeedPlan::demo(password)).await?;

    for (role, id) in &report.users {
        println!("  {:<7} {}", role.as_str(), id);
    }
    if let Some(agency) = report.agency_id {
        println!("  agency  {}", agency);
    }
    if let Some(model) = report.model_id {
        println!("  model   {} ({} portfolio images)", model, report.images);
    }

    Ok(())
}
