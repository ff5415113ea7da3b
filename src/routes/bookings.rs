use actix_web::{web, HttpResponse};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::auth::AuthUser;
use super::{AppState, AuditExt};
use crate::core::policy::{self, BookingActor};
use crate::core::{check_transition, commission_minor, validate_window};
use crate::error::ApiError;
use crate::models::{
    Agency, Booking, BookingStatus, Commission, CreateBookingRequest, ModelProfile, NewBooking, NewCommission,
    UpdateBookingStatusRequest,
};
use crate::services::query::in_list_literal;
use crate::services::{Credential, TableQuery};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/bookings", web::post().to(create_booking))
        .route("/bookings", web::get().to(list_bookings))
        .route("/bookings/{booking_id}/status", web::patch().to(update_status));
}

/// Request a model for a date range
///
/// POST /api/v1/bookings
///
/// The booking starts `pending` and the model is notified.
async fn create_booking(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<CreateBookingRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    if !policy::can_book(&user.viewer) {
        return Err(ApiError::Forbidden("Only brands and agencies can book models".to_string()));
    }

    let req = req.into_inner();
    validate_window(req.starts_at, req.ends_at, chrono::Utc::now())?;

    let model: ModelProfile = state
        .backend
        .select_one(&state.tables().models, TableQuery::new().eq("id", req.model_id), user.credential())
        .await?;

    if !model.is_available {
        return Err(ApiError::Conflict(format!("{} is not taking bookings", model.display_name)));
    }

    let booking = NewBooking {
        model_id: model.id,
        model_user_id: model.user_id,
        agency_id: model.agency_id,
        client_id: user.user_id(),
        starts_at: req.starts_at,
        ends_at: req.ends_at,
        location: req.location,
        fee_minor: req.fee_minor,
        currency: req.currency.to_uppercase(),
        notes: req.notes,
        status: BookingStatus::Pending,
    };

    let created = state
        .backend
        .insert::<Booking, _>(&state.tables().bookings, &booking, user.credential())
        .await
        .audited(&state, Some(user.user_id()), "booking.create")?;

    tracing::info!("Booking {} requested for model {} by {}", created.id, model.id, user.user_id());

    state
        .notify(
            model.user_id,
            "booking.requested",
            format!("New booking request starting {}", created.starts_at.format("%d %b %Y")),
            Some(format!("/bookings/{}", created.id)),
            Credential::Service,
        )
        .await;

    Ok(HttpResponse::Created().json(created))
}

/// Bookings the caller is party to; admins see everything
async fn list_bookings(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse, ApiError> {
    let owned = state.owned_agencies(&user).await?;
    let mut query = TableQuery::new();

    if !user.viewer.is_admin() {
        let me = user.user_id().to_string();
        let mut conditions = vec![("client_id", "eq", me.clone()), ("model_user_id", "eq", me)];
        if !owned.is_empty() {
            conditions.push(("agency_id", "in", in_list_literal(&owned)));
        }
        query = query.or_any(&conditions);
    }

    let bookings: Vec<Booking> = state
        .backend
        .select(&state.tables().bookings, &query.order("starts_at", false).limit(200), user.credential())
        .await?;

    let visible: Vec<Booking> = bookings
        .into_iter()
        .filter(|b| policy::can_view_booking(&user.viewer, b, &owned))
        .collect();

    Ok(HttpResponse::Ok().json(visible))
}

/// Move a booking through its lifecycle
///
/// PATCH /api/v1/bookings/{booking_id}/status
///
/// The write is guarded on the status we read, so two people acting on the
/// same booking cannot both win. Completing an agency booking records the
/// agency's commission.
async fn update_status(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<UpdateBookingStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let booking_id = path.into_inner();
    let target = req.status;

    let booking: Booking = state
        .backend
        .select_one(&state.tables().bookings, TableQuery::new().eq("id", booking_id), user.credential())
        .await?;

    let owned = state.owned_agencies(&user).await?;
    let actor = policy::booking_actor(&user.viewer, &booking, &owned)
        .ok_or_else(|| ApiError::Forbidden("You are not part of this booking".to_string()))?;

    check_transition(booking.status, target, actor)?;

    let mut updated = state
        .backend
        .update::<Booking, _>(
            &state.tables().bookings,
            &TableQuery::new()
                .eq("id", booking_id)
                .eq("status", booking.status.as_str()),
            &json!({ "status": target }),
            user.credential(),
        )
        .await
        .audited(&state, Some(user.user_id()), "booking.status")?;

    let updated = updated
        .pop()
        .ok_or_else(|| ApiError::Conflict("Booking was changed by someone else, reload and try again".to_string()))?;

    tracing::info!(
        "Booking {} moved {} -> {} by {} ({:?})",
        booking_id,
        booking.status,
        target,
        user.user_id(),
        actor
    );

    if target == BookingStatus::Completed {
        if let Some(agency_id) = updated.agency_id {
            record_commission(&state, &updated, agency_id, user.user_id()).await?;
        }
    }

    let body = format!("Booking {} is now {}", updated.id, target);
    let link = Some(format!("/bookings/{}", updated.id));
    let recipients: Vec<Uuid> = match actor {
        BookingActor::Client => vec![updated.model_user_id],
        BookingActor::ModelSide => vec![updated.client_id],
        BookingActor::Admin => vec![updated.client_id, updated.model_user_id],
    };
    for recipient in recipients.into_iter().filter(|id| *id != user.user_id()) {
        state
            .notify(recipient, "booking.status", body.clone(), link.clone(), Credential::Service)
            .await;
    }

    Ok(HttpResponse::Ok().json(updated))
}

/// Commissions are system-derived, so they are written with the service key
async fn record_commission(
    state: &AppState,
    booking: &Booking,
    agency_id: Uuid,
    actor: Uuid,
) -> Result<(), ApiError> {
    let agency: Agency = state
        .backend
        .select_one(&state.tables().agencies, TableQuery::new().eq("id", agency_id), Credential::Service)
        .await?;

    let commission = NewCommission {
        booking_id: booking.id,
        agency_id,
        amount_minor: commission_minor(booking.fee_minor, agency.commission_rate_bps),
        rate_bps: agency.commission_rate_bps,
        currency: booking.currency.clone(),
    };

    let created = state
        .backend
        .insert::<Commission, _>(&state.tables().commissions, &commission, Credential::Service)
        .await
        .audited(state, Some(actor), "commission.create")?;

    state.audit(
        Some(actor),
        "commission.create",
        format!("booking={} agency={} amount={}", booking.id, agency_id, created.amount_minor),
    );
    Ok(())
}
