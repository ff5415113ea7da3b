//! Hosted checkout integrations.
//!
//! The service never touches card or bank data. It shapes an outbound
//! session request, then either hands the browser a gateway URL or an
//! auto-submitting form that posts to the gateway.

pub mod form;
pub mod payu;
pub mod stripe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::SubscriptionPlan;
use crate::models::PaymentMethod;

pub use form::render_autosubmit_form;
pub use payu::{PayuCallback, PayuGateway};
pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Gateway returned error {status}: {body}")]
    GatewayError { status: u16, body: String },

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Callback signature mismatch for transaction {0}")]
    SignatureMismatch(String),

    #[error("Gateway not configured: {0}")]
    NotConfigured(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    Stripe,
    Payu,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Stripe => "stripe",
            GatewayKind::Payu => "payu",
        }
    }

    /// Cards go to Stripe Checkout, Indian bank rails to PayU
    pub fn for_method(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Card => GatewayKind::Stripe,
            PaymentMethod::Upi | PaymentMethod::Netbanking => GatewayKind::Payu,
        }
    }
}

/// Everything a gateway needs to open a checkout session
#[derive(Debug, Clone)]
pub struct CheckoutIntent {
    pub txn_id: String,
    pub plan: SubscriptionPlan,
    pub method: PaymentMethod,
    pub customer_email: String,
    pub customer_name: String,
    /// Browser destination after a successful payment
    pub success_url: String,
    /// Browser destination after a cancelled or failed payment
    pub cancel_url: String,
}

/// What the browser should do next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckoutSession {
    Redirect { url: String },
    Form { action: String, fields: BTreeMap<String, String> },
}

#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    fn kind(&self) -> GatewayKind;

    async fn create_session(&self, intent: &CheckoutIntent) -> Result<CheckoutSession, PaymentError>;
}

/// The configured gateways, one per kind
#[derive(Clone)]
pub struct PaymentGateways {
    pub stripe: Arc<dyn CheckoutGateway>,
    pub payu: Arc<PayuGateway>,
}

impl PaymentGateways {
    pub fn for_method(&self, method: PaymentMethod) -> Arc<dyn CheckoutGateway> {
        match GatewayKind::for_method(method) {
            GatewayKind::Stripe => self.stripe.clone(),
            GatewayKind::Payu => self.payu.clone() as Arc<dyn CheckoutGateway>,
        }
    }
}

/// Minor units to a two-decimal major-unit string (`49900` -> `"499.00"`)
pub fn format_major_units(amount_minor: i64) -> Result<String, PaymentError> {
    if amount_minor <= 0 {
        return Err(PaymentError::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount_minor
        )));
    }
    Ok(format!("{}.{:02}", amount_minor / 100, amount_minor % 100))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_major_units() {
        assert_eq!(format_major_units(49900).unwrap(), "499.00");
        assert_eq!(format_major_units(5).unwrap(), "0.05");
        assert_eq!(format_major_units(123456).unwrap(), "1234.56");
        assert!(format_major_units(0).is_err());
        assert!(format_major_units(-100).is_err());
    }

    #[test]
    fn test_gateway_for_method() {
        assert_eq!(GatewayKind::for_method(PaymentMethod::Card), GatewayKind::Stripe);
        assert_eq!(GatewayKind::for_method(PaymentMethod::Upi), GatewayKind::Payu);
        assert_eq!(GatewayKind::for_method(PaymentMethod::Netbanking), GatewayKind::Payu);
    }

    #[test]
    fn test_session_wire_format() {
        let session = CheckoutSession::Redirect {
            url: "https://checkout.stripe.com/c/pay/cs_test".to_string(),
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["type"], "redirect");
        assert_eq!(json["url"], "https://checkout.stripe.com/c/pay/cs_test");
    }
}
