use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde_json::json;
use validator::Validate;

use super::auth::AuthUser;
use super::{AppState, AuditExt};
use crate::error::ApiError;
use crate::models::{CheckoutRequest, CheckoutResponse, NewPayment, Payment, PaymentStatus, UserProfile};
use crate::services::payments::{render_autosubmit_form, CheckoutIntent, CheckoutSession, GatewayKind, PayuCallback};
use crate::services::{Credential, TableQuery};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/plans", web::get().to(list_plans))
        .route("/payments/checkout", web::post().to(checkout))
        .route("/payments/callback/payu", web::post().to(payu_callback));
}

async fn list_plans(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.settings.plans)
}

fn wants_html(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html"))
        .unwrap_or(false)
}

fn return_url(state: &AppState, outcome: &str, txn_id: &str) -> String {
    format!(
        "{}/{}?txn={}",
        state.settings.payments.return_base_url.trim_end_matches('/'),
        outcome,
        urlencoding::encode(txn_id)
    )
}

/// Start a subscription checkout
///
/// POST /api/v1/payments/checkout
///
/// ```json
/// { "plan_id": "professional", "amount_minor": 249900, "method": "upi" }
/// ```
///
/// A pending payment row is written first so the gateway result always has
/// something to land on. Browsers (Accept: text/html) are sent straight to
/// the gateway; API clients get the session as JSON.
async fn checkout(
    state: web::Data<AppState>,
    user: AuthUser,
    http_req: HttpRequest,
    req: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let req = req.into_inner();

    let plan = state
        .settings
        .plan(&req.plan_id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Unknown plan '{}'", req.plan_id)))?;

    if plan.amount_minor != req.amount_minor {
        return Err(ApiError::Validation("Amount does not match plan price".to_string()));
    }

    let profile: Option<UserProfile> = state
        .backend
        .select(
            &state.tables().profiles,
            &TableQuery::new().eq("id", user.user_id()).limit(1),
            user.credential(),
        )
        .await?
        .pop();

    let customer_email = profile
        .as_ref()
        .map(|p| p.email.clone())
        .or_else(|| user.email.clone())
        .unwrap_or_default();
    let customer_name = profile
        .as_ref()
        .map(|p| p.full_name.clone())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "Customer".to_string());

    let gateway = state.gateways.for_method(req.method);
    let txn_id = uuid::Uuid::new_v4().simple().to_string();

    let payment = NewPayment {
        user_id: user.user_id(),
        plan_id: plan.id.clone(),
        amount_minor: plan.amount_minor,
        currency: plan.currency.clone(),
        method: req.method,
        gateway: gateway.kind().as_str().to_string(),
        txn_id: txn_id.clone(),
        status: PaymentStatus::Pending,
    };

    state
        .backend
        .insert::<Payment, _>(&state.tables().payments, &payment, user.credential())
        .await
        .audited(&state, Some(user.user_id()), "payment.create")?;

    let intent = CheckoutIntent {
        txn_id: txn_id.clone(),
        plan,
        method: req.method,
        customer_email,
        customer_name,
        success_url: return_url(&state, "success", &txn_id),
        cancel_url: return_url(&state, "failure", &txn_id),
    };

    let session = match gateway.create_session(&intent).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Checkout session for {} failed: {}", txn_id, e);
            mark_failed(&state, &txn_id).await;
            return Err::<HttpResponse, _>(e).audited(&state, Some(user.user_id()), "payment.session");
        }
    };

    tracing::info!(
        "Checkout {} opened with {} for plan {}",
        txn_id,
        gateway.kind().as_str(),
        intent.plan.id
    );

    if wants_html(&http_req) {
        return Ok(match session {
            CheckoutSession::Redirect { url } => HttpResponse::SeeOther()
                .insert_header((header::LOCATION, url))
                .finish(),
            CheckoutSession::Form { action, fields } => HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(render_autosubmit_form(&action, &fields)),
        });
    }

    Ok(HttpResponse::Ok().json(CheckoutResponse {
        txn_id,
        gateway: gateway.kind(),
        session,
    }))
}

/// Best-effort write when no session could be opened
async fn mark_failed(state: &AppState, txn_id: &str) {
    if let Err(e) = state
        .backend
        .update::<Payment, _>(
            &state.tables().payments,
            &TableQuery::new().eq("txn_id", txn_id),
            &json!({ "status": PaymentStatus::Failed }),
            Credential::Service,
        )
        .await
    {
        tracing::error!("Failed to mark payment {} as failed: {}", txn_id, e);
        state.audit(None, "payment.status", format!("txn={} status=failed error={}", txn_id, e));
    }
}

/// Move a pending payment to its final status
///
/// Returns false when the row had already left `pending`, which is how a
/// redelivered callback shows up.
async fn settle_payment(
    state: &AppState,
    txn_id: &str,
    status: PaymentStatus,
    gateway_ref: Option<String>,
) -> Result<bool, ApiError> {
    let mut body = json!({ "status": status });
    if let Some(reference) = gateway_ref {
        body["gateway_ref"] = json!(reference);
    }

    let updated: Vec<Payment> = state
        .backend
        .update(
            &state.tables().payments,
            &TableQuery::new()
                .eq("txn_id", txn_id)
                .eq("status", PaymentStatus::Pending.as_str()),
            &body,
            Credential::Service,
        )
        .await?;

    Ok(!updated.is_empty())
}

/// Keep every distinct result a gateway reported; failures are only logged
async fn record_callback(state: &AppState, txn_id: &str, status: PaymentStatus) {
    match state
        .postgres
        .claim_callback(GatewayKind::Payu.as_str(), txn_id, status.as_str())
        .await
    {
        Ok(true) => state.audit(
            None,
            "payment.callback",
            format!("gateway=payu txn={} status={}", txn_id, status.as_str()),
        ),
        Ok(false) => tracing::debug!("Repeated payu {} callback for {}", status.as_str(), txn_id),
        Err(e) => tracing::warn!("Failed to record payu callback for {}: {}", txn_id, e),
    }
}

/// PayU posts the browser back here (surl/furl) with a signed result
///
/// The payment row is written before anything else. When that write fails
/// the caller gets a 5xx so the result is delivered again.
async fn payu_callback(
    state: web::Data<AppState>,
    form: web::Form<PayuCallback>,
) -> Result<HttpResponse, ApiError> {
    let callback = form.into_inner();
    let status = state.gateways.payu.verify_callback(&callback)?;

    if status != PaymentStatus::Pending {
        let settled = settle_payment(&state, &callback.txnid, status, callback.mihpayid.clone())
            .await
            .audited(&state, None, "payment.settle")?;

        if settled {
            tracing::info!("Payment {} settled as {}", callback.txnid, status.as_str());
        } else {
            tracing::info!("Payment {} already settled, ignoring {} result", callback.txnid, status.as_str());
        }
    }

    record_callback(&state, &callback.txnid, status).await;

    let outcome = if status == PaymentStatus::Success { "success" } else { "failure" };
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, return_url(&state, outcome, &callback.txnid)))
        .finish())
}
