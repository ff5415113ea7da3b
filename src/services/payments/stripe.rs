use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{CheckoutGateway, CheckoutIntent, CheckoutSession, GatewayKind, PaymentError};

/// Stripe Checkout: create a session server-side, redirect the browser to it
pub struct StripeGateway {
    api_base: String,
    secret_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

impl StripeGateway {
    pub fn new(api_base: String, secret_key: String, timeout: Duration) -> Result<Self, PaymentError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
            client,
        })
    }

    /// Form-encoded session parameters
    pub fn session_params(intent: &CheckoutIntent) -> Vec<(String, String)> {
        vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), intent.success_url.clone()),
            ("cancel_url".to_string(), intent.cancel_url.clone()),
            ("client_reference_id".to_string(), intent.txn_id.clone()),
            ("customer_email".to_string(), intent.customer_email.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                intent.plan.currency.to_lowercase(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                intent.plan.amount_minor.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                intent.plan.name.clone(),
            ),
            ("metadata[plan_id]".to_string(), intent.plan.id.clone()),
            ("metadata[txn_id]".to_string(), intent.txn_id.clone()),
        ]
    }
}

#[async_trait]
impl CheckoutGateway for StripeGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Stripe
    }

    async fn create_session(&self, intent: &CheckoutIntent) -> Result<CheckoutSession, PaymentError> {
        if self.secret_key.is_empty() {
            return Err(PaymentError::NotConfigured("stripe secret key"));
        }
        if intent.plan.amount_minor <= 0 {
            return Err(PaymentError::InvalidAmount(intent.plan.amount_minor.to_string()));
        }

        let url = format!("{}/v1/checkout/sessions", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&Self::session_params(intent))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Stripe session creation failed for {}: {} - {}", intent.txn_id, status, body);
            return Err(PaymentError::GatewayError {
                status: status.as_u16(),
                body,
            });
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(format!("Failed to parse session: {}", e)))?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::InvalidResponse(format!("Session {} has no url", session.id)))?;

        tracing::info!("Created Stripe session {} for {}", session.id, intent.txn_id);

        Ok(CheckoutSession::Redirect { url })
    }
}
