use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

/// One row of the audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub detail: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// PostgreSQL client for the tables this service owns
///
/// Marketplace data lives in the hosted backend. This database only keeps
/// the audit log of failed writes and the ledger of gateway callbacks that
/// have already been applied.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Connect and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Pool that connects on first use, without running migrations
    pub fn lazy(database_url: &str, acquire_timeout: Duration) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    /// Append an entry to the audit log
    pub async fn record_audit(
        &self,
        actor_id: Option<Uuid>,
        action: &str,
        detail: &str,
    ) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO audit_logs (actor_id, action, detail, created_at)
            VALUES ($1, $2, $3, NOW())
        "#;

        sqlx::query(query)
            .bind(actor_id)
            .bind(action)
            .bind(detail)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Recorded audit entry: {} ({:?})", action, actor_id);

        Ok(())
    }

    /// Most recent audit entries, newest first
    pub async fn recent_audit(&self, limit: i64, offset: i64) -> Result<Vec<AuditEntry>, PostgresError> {
        let query = r#"
            SELECT id, actor_id, action, detail, created_at
            FROM audit_logs
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
        "#;

        let rows = sqlx::query(query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let entries = rows
            .iter()
            .map(|row| AuditEntry {
                id: row.get("id"),
                actor_id: row.get("actor_id"),
                action: row.get("action"),
                detail: row.get("detail"),
                created_at: row.get("created_at"),
            })
            .collect();

        Ok(entries)
    }

    /// Record a gateway result, returning false if this status was already
    /// recorded for the transaction
    ///
    /// A transaction may report `pending` and later `success`; each status
    /// is kept once.
    pub async fn claim_callback(
        &self,
        gateway: &str,
        txn_id: &str,
        status: &str,
    ) -> Result<bool, PostgresError> {
        let query = r#"
            INSERT INTO gateway_callbacks (gateway, txn_id, status, received_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (gateway, txn_id, status) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(gateway)
            .bind(txn_id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        let first = result.rows_affected() == 1;
        if !first {
            tracing::info!("Repeated {} {} callback for {}", gateway, status, txn_id);
        }

        Ok(first)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lazy_pool_does_not_connect() {
        let client = PostgresClient::lazy("postgres://nobody@127.0.0.1:1/none", Duration::from_millis(200));
        assert!(client.is_ok());
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_claim_callback_once() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let client = PostgresClient::new(&url, 2, 1, Duration::from_secs(5), Duration::from_secs(60))
            .await
            .unwrap();

        let txn = Uuid::new_v4().simple().to_string();
        assert!(client.claim_callback("payu", &txn, "pending").await.unwrap());
        assert!(client.claim_callback("payu", &txn, "success").await.unwrap());
        assert!(!client.claim_callback("payu", &txn, "success").await.unwrap());
    }
}
