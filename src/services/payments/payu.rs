use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::collections::BTreeMap;

use super::{format_major_units, CheckoutGateway, CheckoutIntent, CheckoutSession, GatewayKind, PaymentError};
use crate::models::{PaymentMethod, PaymentStatus};

/// PayU hosted checkout: the browser posts a signed form to the gateway
pub struct PayuGateway {
    action_url: String,
    merchant_key: String,
    salt: String,
    /// Where PayU posts the result back to (surl/furl)
    callback_url: String,
}

/// Form body PayU posts to surl/furl
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayuCallback {
    pub key: String,
    pub txnid: String,
    pub amount: String,
    pub productinfo: String,
    pub firstname: String,
    pub email: String,
    pub status: String,
    pub hash: String,
    #[serde(default)]
    pub udf1: String,
    #[serde(default)]
    pub udf2: String,
    #[serde(default)]
    pub udf3: String,
    #[serde(default)]
    pub udf4: String,
    #[serde(default)]
    pub udf5: String,
    #[serde(default)]
    pub mihpayid: Option<String>,
}

fn sha512_hex(input: &str) -> String {
    format!("{:x}", Sha512::digest(input.as_bytes()))
}

impl PayuGateway {
    pub fn new(action_url: String, merchant_key: String, salt: String, callback_url: String) -> Self {
        Self {
            action_url,
            merchant_key,
            salt,
            callback_url,
        }
    }

    pub fn action_url(&self) -> &str {
        &self.action_url
    }

    /// `key|txnid|amount|productinfo|firstname|email|udf1..udf5||||||salt`
    pub fn request_hash(&self, fields: &BTreeMap<String, String>) -> String {
        let get = |name: &str| fields.get(name).map(String::as_str).unwrap_or("");

        let input = [
            self.merchant_key.as_str(),
            get("txnid"),
            get("amount"),
            get("productinfo"),
            get("firstname"),
            get("email"),
            get("udf1"),
            get("udf2"),
            get("udf3"),
            get("udf4"),
            get("udf5"),
            "",
            "",
            "",
            "",
            "",
            self.salt.as_str(),
        ]
        .join("|");

        sha512_hex(&input)
    }

    /// Reverse hash PayU sends back:
    /// `salt|status||||||udf5..udf1|email|firstname|productinfo|amount|txnid|key`
    pub fn response_hash(&self, callback: &PayuCallback) -> String {
        let input = [
            self.salt.as_str(),
            callback.status.as_str(),
            "",
            "",
            "",
            "",
            "",
            callback.udf5.as_str(),
            callback.udf4.as_str(),
            callback.udf3.as_str(),
            callback.udf2.as_str(),
            callback.udf1.as_str(),
            callback.email.as_str(),
            callback.firstname.as_str(),
            callback.productinfo.as_str(),
            callback.amount.as_str(),
            callback.txnid.as_str(),
            self.merchant_key.as_str(),
        ]
        .join("|");

        sha512_hex(&input)
    }

    /// Check a callback's signature and translate its status
    pub fn verify_callback(&self, callback: &PayuCallback) -> Result<PaymentStatus, PaymentError> {
        if callback.key != self.merchant_key {
            return Err(PaymentError::SignatureMismatch(callback.txnid.clone()));
        }

        let expected = self.response_hash(callback);
        if !expected.eq_ignore_ascii_case(callback.hash.trim()) {
            tracing::warn!("PayU callback hash mismatch for {}", callback.txnid);
            return Err(PaymentError::SignatureMismatch(callback.txnid.clone()));
        }

        Ok(match callback.status.to_lowercase().as_str() {
            "success" => PaymentStatus::Success,
            "pending" => PaymentStatus::Pending,
            _ => PaymentStatus::Failed,
        })
    }

    pub fn form_fields(&self, intent: &CheckoutIntent) -> Result<BTreeMap<String, String>, PaymentError> {
        let amount = format_major_units(intent.plan.amount_minor)?;

        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), self.merchant_key.clone());
        fields.insert("txnid".to_string(), intent.txn_id.clone());
        fields.insert("amount".to_string(), amount);
        fields.insert("productinfo".to_string(), intent.plan.name.clone());
        fields.insert("firstname".to_string(), intent.customer_name.clone());
        fields.insert("email".to_string(), intent.customer_email.clone());
        fields.insert("udf1".to_string(), intent.plan.id.clone());
        fields.insert("surl".to_string(), self.callback_url.clone());
        fields.insert("furl".to_string(), self.callback_url.clone());

        let paymethod = match intent.method {
            PaymentMethod::Upi => "upi",
            PaymentMethod::Netbanking => "netbanking",
            PaymentMethod::Card => "creditcard|debitcard",
        };
        fields.insert("enforce_paymethod".to_string(), paymethod.to_string());

        let hash = self.request_hash(&fields);
        fields.insert("hash".to_string(), hash);

        Ok(fields)
    }
}

#[async_trait]
impl CheckoutGateway for PayuGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Payu
    }

    async fn create_session(&self, intent: &CheckoutIntent) -> Result<CheckoutSession, PaymentError> {
        if self.merchant_key.is_empty() || self.salt.is_empty() {
            return Err(PaymentError::NotConfigured("payu merchant key/salt"));
        }

        let fields = self.form_fields(intent)?;
        tracing::info!("Prepared PayU form for {}", intent.txn_id);

        Ok(CheckoutSession::Form {
            action: self.action_url.clone(),
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubscriptionPlan;

    fn gateway() -> PayuGateway {
        PayuGateway::new(
            "https://test.payu.in/_payment".to_string(),
            "mkey".to_string(),
            "msalt".to_string(),
            "https://api.test/api/v1/payments/callback/payu".to_string(),
        )
    }

    fn intent() -> CheckoutIntent {
        CheckoutIntent {
            txn_id: "txn123".to_string(),
            plan: SubscriptionPlan {
                id: "pro".to_string(),
                name: "Pro".to_string(),
                amount_minor: 49900,
                currency: "INR".to_string(),
                interval: "month".to_string(),
            },
            method: PaymentMethod::Upi,
            customer_email: "a@b.test".to_string(),
            customer_name: "Ana".to_string(),
            success_url: "https://app.test/success".to_string(),
            cancel_url: "https://app.test/failure".to_string(),
        }
    }

    #[test]
    fn test_request_hash_layout() {
        let gw = gateway();
        let fields = gw.form_fields(&intent()).unwrap();

        let expected = sha512_hex("mkey|txn123|499.00|Pro|Ana|a@b.test|pro||||||||||msalt");
        assert_eq!(fields["hash"], expected);
        assert_eq!(fields["enforce_paymethod"], "upi");
        assert_eq!(fields["amount"], "499.00");
    }

    #[test]
    fn test_verify_callback_roundtrip() {
        let gw = gateway();
        let mut callback = PayuCallback {
            key: "mkey".to_string(),
            txnid: "txn123".to_string(),
            amount: "499.00".to_string(),
            productinfo: "Pro".to_string(),
            firstname: "Ana".to_string(),
            email: "a@b.test".to_string(),
            status: "success".to_string(),
            udf1: "pro".to_string(),
            ..Default::default()
        };
        callback.hash = gw.response_hash(&callback);

        assert_eq!(gw.verify_callback(&callback).unwrap(), PaymentStatus::Success);

        callback.amount = "1.00".to_string();
        assert!(matches!(gw.verify_callback(&callback), Err(PaymentError::SignatureMismatch(_))));
    }

    #[test]
    fn test_response_hash_layout() {
        let gw = gateway();
        let callback = PayuCallback {
            key: "mkey".to_string(),
            txnid: "t".to_string(),
            amount: "1.00".to_string(),
            productinfo: "P".to_string(),
            firstname: "F".to_string(),
            email: "e".to_string(),
            status: "failure".to_string(),
            udf1: "u1".to_string(),
            ..Default::default()
        };
        let expected = sha512_hex("msalt|failure||||||||||u1|e|F|P|1.00|t|mkey");
        assert_eq!(gw.response_hash(&callback), expected);
    }
}
