use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use casting_hub::config::Settings;
use casting_hub::error::{json_error_handler, query_error_handler};
use casting_hub::routes::{self, auth::TokenVerifier, AppState};
use casting_hub::services::payments::{PayuGateway, StripeGateway};
use casting_hub::services::{BackendClient, CacheManager, PaymentGateways, PostgresClient};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn startup_error(what: &str, e: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", what, e);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", what, e))
}

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_logging(&settings);
    info!("Starting casting hub service...");

    let timeout = Duration::from_secs(settings.backend.timeout_secs.unwrap_or(30));

    let backend = Arc::new(
        BackendClient::new(
            settings.backend.endpoint.clone(),
            settings.backend.anon_key.clone(),
            settings.backend.service_key.clone(),
            timeout,
        )
        .map_err(|e| startup_error("Failed to build backend client", e))?,
    );

    info!("Backend client initialized for {}", backend.base_url());

    // Cache is optional: without Redis it runs in-process only
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);
    let cache = Arc::new(CacheManager::new(settings.cache.redis_url.as_deref(), l1_cache_size, cache_ttl).await);

    info!(
        "Cache manager initialized (L1: {} entries, TTL: {}s, redis: {})",
        l1_cache_size,
        cache_ttl,
        cache.has_redis()
    );

    let postgres = Arc::new(
        PostgresClient::from_settings(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
        )
        .await
        .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?,
    );

    info!("PostgreSQL client initialized, migrations applied");

    let payments = &settings.payments;
    let stripe = StripeGateway::new(payments.stripe.api_base.clone(), payments.stripe.secret_key.clone(), timeout)
        .map_err(|e| startup_error("Failed to build Stripe client", e))?;
    let payu = PayuGateway::new(
        payments.payu.action_url.clone(),
        payments.payu.merchant_key.clone(),
        payments.payu.salt.clone(),
        format!("{}/api/v1/payments/callback/payu", payments.public_base_url.trim_end_matches('/')),
    );
    let gateways = PaymentGateways {
        stripe: Arc::new(stripe),
        payu: Arc::new(payu),
    };

    if settings.auth.jwt_secret.is_empty() {
        return Err(startup_error("Invalid auth settings", "auth.jwt_secret is empty"));
    }
    let tokens = Arc::new(TokenVerifier::new(&settings.auth.jwt_secret, &settings.auth.audience));

    info!("{} subscription plans configured", settings.plans.len());

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    let app_state = AppState {
        settings: Arc::new(settings),
        backend,
        cache,
        postgres,
        gateways,
        tokens,
    };

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .app_data(web::FormConfig::default().limit(16 * 1024))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
