use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    #[serde(default)]
    pub tables: TableSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub auth: AuthSettings,
    pub payments: PaymentSettings,
    #[serde(default)]
    pub plans: Vec<SubscriptionPlan>,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Hosted backend (REST tables + auth admin API)
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    pub endpoint: String,
    pub anon_key: String,
    pub service_key: String,
    pub timeout_secs: Option<u64>,
}

/// Remote table names
#[derive(Debug, Clone, Deserialize)]
pub struct TableSettings {
    #[serde(default = "default_profiles_table")]
    pub profiles: String,
    #[serde(default = "default_user_roles_table")]
    pub user_roles: String,
    #[serde(default = "default_agencies_table")]
    pub agencies: String,
    #[serde(default = "default_models_table")]
    pub models: String,
    #[serde(default = "default_portfolio_table")]
    pub portfolio_images: String,
    #[serde(default = "default_bookings_table")]
    pub bookings: String,
    #[serde(default = "default_commissions_table")]
    pub commissions: String,
    #[serde(default = "default_campaigns_table")]
    pub campaigns: String,
    #[serde(default = "default_messages_table")]
    pub messages: String,
    #[serde(default = "default_notifications_table")]
    pub notifications: String,
    #[serde(default = "default_favorites_table")]
    pub favorites: String,
    #[serde(default = "default_payments_table")]
    pub payments: String,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            profiles: default_profiles_table(),
            user_roles: default_user_roles_table(),
            agencies: default_agencies_table(),
            models: default_models_table(),
            portfolio_images: default_portfolio_table(),
            bookings: default_bookings_table(),
            commissions: default_commissions_table(),
            campaigns: default_campaigns_table(),
            messages: default_messages_table(),
            notifications: default_notifications_table(),
            favorites: default_favorites_table(),
            payments: default_payments_table(),
        }
    }
}

fn default_profiles_table() -> String { "profiles".to_string() }
fn default_user_roles_table() -> String { "user_roles".to_string() }
fn default_agencies_table() -> String { "agencies".to_string() }
fn default_models_table() -> String { "models".to_string() }
fn default_portfolio_table() -> String { "portfolio_images".to_string() }
fn default_bookings_table() -> String { "bookings".to_string() }
fn default_commissions_table() -> String { "commissions".to_string() }
fn default_campaigns_table() -> String { "campaigns".to_string() }
fn default_messages_table() -> String { "messages".to_string() }
fn default_notifications_table() -> String { "notifications".to_string() }
fn default_favorites_table() -> String { "favorites".to_string() }
fn default_payments_table() -> String { "payments".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Empty or missing runs the cache in-process only
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// Secret the hosted auth service signs session tokens with
    pub jwt_secret: String,
    #[serde(default = "default_audience")]
    pub audience: String,
}

fn default_audience() -> String { "authenticated".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSettings {
    /// Browser lands here after checkout, with `/success` or `/failure` appended
    pub return_base_url: String,
    /// Public URL of this service, used for gateway callbacks
    pub public_base_url: String,
    pub stripe: StripeSettings,
    pub payu: PayuSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSettings {
    #[serde(default = "default_stripe_api_base")]
    pub api_base: String,
    pub secret_key: String,
}

fn default_stripe_api_base() -> String { "https://api.stripe.com".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct PayuSettings {
    #[serde(default = "default_payu_action_url")]
    pub action_url: String,
    pub merchant_key: String,
    pub salt: String,
}

fn default_payu_action_url() -> String { "https://secure.payu.in/_payment".to_string() }

/// A purchasable subscription plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: String,
    pub name: String,
    /// Price in minor currency units (cents, paise)
    pub amount_minor: i64,
    pub currency: String,
    #[serde(default = "default_interval")]
    pub interval: String,
}

fn default_interval() -> String { "month".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with HUB__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., HUB__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("HUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_secret_overrides(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("HUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Look up a configured plan by id
    pub fn plan(&self, plan_id: &str) -> Option<&SubscriptionPlan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }
}

/// Well-known secret variables take precedence over anything in config files
fn apply_secret_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let overrides = [
        ("DATABASE_URL", "database.url"),
        ("HUB_JWT_SECRET", "auth.jwt_secret"),
        ("HUB_BACKEND_SERVICE_KEY", "backend.service_key"),
        ("STRIPE_SECRET_KEY", "payments.stripe.secret_key"),
        ("PAYU_MERCHANT_KEY", "payments.payu.merchant_key"),
        ("PAYU_SALT", "payments.payu.salt"),
    ];

    let mut builder = Config::builder().add_source(settings);
    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables() {
        let tables = TableSettings::default();
        assert_eq!(tables.user_roles, "user_roles");
        assert_eq!(tables.portfolio_images, "portfolio_images");
        assert_eq!(tables.payments, "payments");
    }

    #[test]
    fn test_default_logging() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_log_format(), "json");
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("casting-hub-cfg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "127.0.0.1"
port = 8088

[backend]
endpoint = "https://backend.test"
anon_key = "anon"
service_key = "service"

[database]
url = "postgres://localhost/hub"

[cache]
ttl_secs = 60

[auth]
jwt_secret = "secret"

[payments]
return_base_url = "https://app.test/billing"
public_base_url = "https://api.test"

[payments.stripe]
secret_key = "sk_test"

[payments.payu]
merchant_key = "key"
salt = "salt"

[[plans]]
id = "pro"
name = "Pro"
amount_minor = 49900
currency = "INR"

[logging]
level = "debug"
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.server.port, 8088);
        assert_eq!(settings.payments.stripe.api_base, "https://api.stripe.com");
        assert_eq!(settings.auth.audience, "authenticated");
        assert_eq!(settings.plan("pro").map(|p| p.amount_minor), Some(49900));
        assert_eq!(settings.plan("pro").map(|p| p.interval.as_str()), Some("month"));
        assert!(settings.plan("enterprise").is_none());
        assert!(settings.cache.redis_url.is_none());
        assert_eq!(settings.logging.format, "json");
    }
}
