use crate::services::query::TableQuery;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when interacting with the hosted backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized ({status}): {body}")]
    Unauthorized { status: u16, body: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Refusing unfiltered {0} on table {1}")]
    UnfilteredWrite(&'static str, String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Whose identity a call is made under
///
/// User calls carry the caller's session token so the backend's row-level
/// policies see the real user. Service calls bypass those policies and are
/// reserved for operator tooling and gateway callbacks.
#[derive(Debug, Clone, Copy)]
pub enum Credential<'a> {
    Anonymous,
    User(&'a str),
    Service,
}

/// Hosted backend API client
///
/// Table-scoped CRUD against `{endpoint}/rest/v1/{table}` plus the admin
/// auth endpoint used for seeding demo accounts.
pub struct BackendClient {
    base_url: String,
    anon_key: String,
    service_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct AuthUserRecord {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthUserPage {
    #[serde(default)]
    users: Vec<AuthUserRecord>,
}

const AUTH_PAGE_SIZE: usize = 100;

impl BackendClient {
    /// Create a new backend client
    pub fn new(
        base_url: String,
        anon_key: String,
        service_key: String,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            service_key,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str, query: &TableQuery) -> String {
        let qs = query.to_query_string();
        if qs.is_empty() {
            format!("{}/rest/v1/{}", self.base_url, table)
        } else {
            format!("{}/rest/v1/{}?{}", self.base_url, table, qs)
        }
    }

    fn authorize(&self, request: RequestBuilder, credential: Credential<'_>) -> RequestBuilder {
        match credential {
            Credential::Anonymous => request
                .header("apikey", &self.anon_key)
                .bearer_auth(&self.anon_key),
            Credential::User(token) => request
                .header("apikey", &self.anon_key)
                .bearer_auth(token),
            Credential::Service => request
                .header("apikey", &self.service_key)
                .bearer_auth(&self.service_key),
        }
    }

    /// Map non-success statuses onto the error taxonomy
    async fn check(response: Response, context: &str) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read body".to_string());
        tracing::warn!("Backend call '{}' failed: {} - {}", context, status, body);

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized {
                status: status.as_u16(),
                body,
            },
            StatusCode::NOT_FOUND => BackendError::NotFound(context.to_string()),
            StatusCode::CONFLICT => BackendError::Conflict(body),
            StatusCode::UNPROCESSABLE_ENTITY
                if body.contains("already") || body.contains("exists") =>
            {
                BackendError::Conflict(body)
            }
            _ => BackendError::ApiError {
                status: status.as_u16(),
                body,
            },
        })
    }

    async fn rows<T: DeserializeOwned>(response: Response, context: &str) -> Result<Vec<T>, BackendError> {
        let json: Value = response.json().await?;
        let rows = json
            .as_array()
            .ok_or_else(|| BackendError::InvalidResponse(format!("{}: expected a JSON array", context)))?;

        rows.iter()
            .map(|row| {
                serde_json::from_value(row.clone()).map_err(|e| {
                    BackendError::InvalidResponse(format!("{}: failed to parse row: {}", context, e))
                })
            })
            .collect()
    }

    /// Select rows matching `query`
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &TableQuery,
        credential: Credential<'_>,
    ) -> Result<Vec<T>, BackendError> {
        let url = self.table_url(table, query);
        tracing::debug!("Selecting from: {}", url);

        let response = self
            .authorize(self.client.get(&url), credential)
            .send()
            .await?;
        let response = Self::check(response, table).await?;

        Self::rows(response, table).await
    }

    /// Select exactly one row, `NotFound` when nothing matches
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: TableQuery,
        credential: Credential<'_>,
    ) -> Result<T, BackendError> {
        let query = query.limit(1);
        let mut rows: Vec<T> = self.select(table, &query, credential).await?;

        if rows.is_empty() {
            return Err(BackendError::NotFound(format!("no row in {} for {}", table, query.to_query_string())));
        }

        Ok(rows.swap_remove(0))
    }

    /// Insert one row and return its stored representation
    pub async fn insert<T, B>(
        &self,
        table: &str,
        body: &B,
        credential: Credential<'_>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.table_url(table, &TableQuery::new());

        let response = self
            .authorize(self.client.post(&url), credential)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let response = Self::check(response, table).await?;

        let mut rows: Vec<T> = Self::rows(response, table).await?;
        if rows.is_empty() {
            return Err(BackendError::InvalidResponse(format!("{}: insert returned no rows", table)));
        }

        tracing::debug!("Inserted row into {}", table);
        Ok(rows.swap_remove(0))
    }

    /// Patch every row matching `query`, returning the updated rows
    pub async fn update<T, B>(
        &self,
        table: &str,
        query: &TableQuery,
        body: &B,
        credential: Credential<'_>,
    ) -> Result<Vec<T>, BackendError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        if !query.has_filters() {
            return Err(BackendError::UnfilteredWrite("update", table.to_string()));
        }

        let url = self.table_url(table, query);

        let response = self
            .authorize(self.client.patch(&url), credential)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let response = Self::check(response, table).await?;

        Self::rows(response, table).await
    }

    /// Delete every row matching `query`, returning how many went away
    pub async fn delete(
        &self,
        table: &str,
        query: &TableQuery,
        credential: Credential<'_>,
    ) -> Result<usize, BackendError> {
        if !query.has_filters() {
            return Err(BackendError::UnfilteredWrite("delete", table.to_string()));
        }

        let url = self.table_url(table, query);

        let response = self
            .authorize(self.client.delete(&url), credential)
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let response = Self::check(response, table).await?;

        let rows: Vec<Value> = Self::rows(response, table).await?;
        Ok(rows.len())
    }

    /// Insert or merge rows keyed by the unique columns in `on_conflict`
    pub async fn upsert<T, B>(
        &self,
        table: &str,
        body: &B,
        on_conflict: &str,
        credential: Credential<'_>,
    ) -> Result<Vec<T>, BackendError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.table_url(table, &TableQuery::new().on_conflict(on_conflict));

        let response = self
            .authorize(self.client.post(&url), credential)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(body)
            .send()
            .await?;
        let response = Self::check(response, table).await?;

        Self::rows(response, table).await
    }

    /// Create a confirmed auth account through the admin API
    ///
    /// Returns `Conflict` when the email is already registered.
    pub async fn create_auth_user(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<Uuid, BackendError> {
        let url = format!("{}/auth/v1/admin/users", self.base_url);

        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "email_confirm": true,
            "user_metadata": metadata,
        });

        let response = self
            .authorize(self.client.post(&url), Credential::Service)
            .json(&payload)
            .send()
            .await?;
        let response = Self::check(response, "auth/admin/users").await?;

        let created: AuthUserRecord = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("Failed to parse auth user: {}", e)))?;

        tracing::debug!("Created auth user {} ({})", email, created.id);
        Ok(created.id)
    }

    /// Find an auth account by email through the admin API
    ///
    /// Walks the account list page by page. Profiles are not consulted, so
    /// an account whose profile was never written is still found.
    pub async fn find_auth_user(&self, email: &str) -> Result<Option<Uuid>, BackendError> {
        let url = format!("{}/auth/v1/admin/users", self.base_url);
        let mut page = 1usize;

        loop {
            let response = self
                .authorize(self.client.get(&url), Credential::Service)
                .query(&[("page", page.to_string()), ("per_page", AUTH_PAGE_SIZE.to_string())])
                .send()
                .await?;
            let response = Self::check(response, "auth/admin/users").await?;

            let listing: AuthUserPage = response
                .json()
                .await
                .map_err(|e| BackendError::InvalidResponse(format!("Failed to parse auth users: {}", e)))?;

            let found = listing
                .users
                .iter()
                .find(|u| u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)));
            if let Some(user) = found {
                return Ok(Some(user.id));
            }

            if listing.users.len() < AUTH_PAGE_SIZE {
                return Ok(None);
            }
            page += 1;
        }
    }

    /// Health check for the hosted REST endpoint
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/rest/v1/", self.base_url);
        match self
            .authorize(self.client.get(&url), Credential::Anonymous)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("Backend health check failed: {}", e);
                false
            }
        }
    }
}
