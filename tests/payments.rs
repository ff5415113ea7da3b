// Hosted checkout gateways

use casting_hub::config::SubscriptionPlan;
use casting_hub::models::PaymentMethod;
use casting_hub::services::payments::{
    render_autosubmit_form, CheckoutGateway, CheckoutIntent, CheckoutSession, GatewayKind, PaymentError,
    PaymentGateways, PayuGateway, StripeGateway,
};
use mockito::Matcher;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn intent(method: PaymentMethod) -> CheckoutIntent {
    CheckoutIntent {
        txn_id: "9f0c2b".to_string(),
        plan: SubscriptionPlan {
            id: "starter".to_string(),
            name: "Starter".to_string(),
            amount_minor: 99900,
            currency: "INR".to_string(),
            interval: "month".to_string(),
        },
        method,
        customer_email: "meera@casting-hub.test".to_string(),
        customer_name: "Meera".to_string(),
        success_url: "https://app.test/billing/success?txn=9f0c2b".to_string(),
        cancel_url: "https://app.test/billing/failure?txn=9f0c2b".to_string(),
    }
}

#[test]
fn test_stripe_session_redirects_to_hosted_page() {
    tokio_test::block_on(async {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/checkout/sessions")
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer sk_test")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client_reference_id".into(), "9f0c2b".into()),
                Matcher::UrlEncoded("line_items[0][price_data][currency]".into(), "inr".into()),
                Matcher::UrlEncoded("metadata[plan_id]".into(), "starter".into()),
            ]))
            .with_body(r#"{"id":"cs_1","url":"https://checkout.stripe.test/pay/cs_1"}"#)
            .create_async()
            .await;

        let gateway = StripeGateway::new(server.url(), "sk_test".to_string(), Duration::from_secs(5)).unwrap();
        let session = gateway.create_session(&intent(PaymentMethod::Card)).await.unwrap();

        assert_eq!(
            session,
            CheckoutSession::Redirect {
                url: "https://checkout.stripe.test/pay/cs_1".to_string()
            }
        );
        mock.assert_async().await;
    });
}

#[tokio::test]
async fn test_stripe_error_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/checkout/sessions")
        .match_query(Matcher::Any)
        .with_status(402)
        .with_body(r#"{"error":{"message":"Your card was declined"}}"#)
        .create_async()
        .await;

    let gateway = StripeGateway::new(server.url(), "sk_test".to_string(), Duration::from_secs(5)).unwrap();
    let err = gateway.create_session(&intent(PaymentMethod::Card)).await.unwrap_err();

    assert!(matches!(err, PaymentError::GatewayError { status: 402, .. }));
}

#[tokio::test]
async fn test_unconfigured_gateways_refuse() {
    let stripe = StripeGateway::new("http://127.0.0.1:1".to_string(), String::new(), Duration::from_secs(1)).unwrap();
    let err = stripe.create_session(&intent(PaymentMethod::Card)).await.unwrap_err();
    assert!(matches!(err, PaymentError::NotConfigured(_)));

    let payu = PayuGateway::new("https://test.payu.in/_payment".to_string(), String::new(), String::new(), String::new());
    let err = payu.create_session(&intent(PaymentMethod::Upi)).await.unwrap_err();
    assert!(matches!(err, PaymentError::NotConfigured(_)));
}

#[tokio::test]
async fn test_methods_route_to_gateways() {
    let stripe = StripeGateway::new("http://127.0.0.1:1".to_string(), "sk".to_string(), Duration::from_secs(1)).unwrap();
    let payu = PayuGateway::new(
        "https://test.payu.in/_payment".to_string(),
        "mkey".to_string(),
        "msalt".to_string(),
        "https://api.test/cb".to_string(),
    );
    let gateways = PaymentGateways {
        stripe: Arc::new(stripe),
        payu: Arc::new(payu),
    };

    assert_eq!(gateways.for_method(PaymentMethod::Card).kind(), GatewayKind::Stripe);
    assert_eq!(gateways.for_method(PaymentMethod::Netbanking).kind(), GatewayKind::Payu);

    let session = gateways
        .for_method(PaymentMethod::Netbanking)
        .create_session(&intent(PaymentMethod::Netbanking))
        .await
        .unwrap();
    match session {
        CheckoutSession::Form { action, fields } => {
            assert_eq!(action, "https://test.payu.in/_payment");
            assert_eq!(fields["enforce_paymethod"], "netbanking");
            assert_eq!(fields["surl"], "https://api.test/cb");
            assert_eq!(fields["hash"].len(), 128);
        }
        other => panic!("expected a form, got {:?}", other),
    }
}

#[test]
fn test_autosubmit_form_escapes_values() {
    let mut fields = BTreeMap::new();
    fields.insert("productinfo".to_string(), r#"Pro "Plus" <b>"#.to_string());

    let html = render_autosubmit_form("https://test.payu.in/_payment?a=1&b=2", &fields);

    assert!(html.contains(r#"action="https://test.payu.in/_payment?a=1&amp;b=2""#));
    assert!(html.contains("Pro &quot;Plus&quot; &lt;b&gt;"));
    assert!(html.contains("document.forms[0].submit()"));
}
