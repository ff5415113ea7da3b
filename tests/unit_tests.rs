// Unit tests for the marketplace rules

use casting_hub::core::booking::MAX_BOOKING_DAYS;
use casting_hub::core::policy::{self, BookingActor, Viewer};
use casting_hub::core::{
    build_model_query, check_transition, commission_minor, compact_positions, cover_changes, next_position,
    plan_reorder, user_message, validate_window, BookingError, ReorderError,
};
use casting_hub::core::feedback::{MSG_CONNECTION, MSG_DUPLICATE, MSG_FORBIDDEN, MSG_SESSION};
use casting_hub::models::{Booking, BookingStatus, ModelProfile, ModelSearchQuery, PortfolioImage, Role};
use chrono::{Duration, Utc};
use uuid::Uuid;

fn portfolio(n: i32) -> Vec<PortfolioImage> {
    let model_id = Uuid::new_v4();
    (0..n)
        .map(|position| PortfolioImage {
            id: Uuid::new_v4(),
            model_id,
            url: format!("https://cdn.test/{}.jpg", position),
            caption: None,
            position,
            is_cover: position == 0,
            created_at: None,
        })
        .collect()
}

fn booking(client: Uuid, model_user: Uuid, agency: Option<Uuid>) -> Booking {
    let starts_at = Utc::now() + Duration::days(1);
    Booking {
        id: Uuid::new_v4(),
        model_id: Uuid::new_v4(),
        model_user_id: model_user,
        agency_id: agency,
        client_id: client,
        starts_at,
        ends_at: starts_at + Duration::hours(6),
        location: Some("Bandra studio".to_string()),
        fee_minor: 1_000_000,
        currency: "INR".to_string(),
        notes: None,
        status: BookingStatus::Pending,
        created_at: None,
    }
}

#[test]
fn test_booking_window_rules() {
    let now = Utc::now();
    let start = now + Duration::hours(2);

    assert!(validate_window(start, start + Duration::hours(8), now).is_ok());
    assert_eq!(validate_window(start, start, now), Err(BookingError::EmptyWindow));
    assert_eq!(
        validate_window(now - Duration::hours(1), now + Duration::hours(1), now),
        Err(BookingError::StartsInPast)
    );
    assert_eq!(
        validate_window(start, start + Duration::days(MAX_BOOKING_DAYS + 1), now),
        Err(BookingError::TooLong)
    );
}

#[test]
fn test_booking_lifecycle_happy_path() {
    use BookingStatus::*;

    assert!(check_transition(Pending, Confirmed, BookingActor::ModelSide).is_ok());
    assert!(check_transition(Confirmed, Completed, BookingActor::Client).is_ok());
}

#[test]
fn test_client_cannot_confirm_own_request() {
    let err = check_transition(BookingStatus::Pending, BookingStatus::Confirmed, BookingActor::Client).unwrap_err();
    assert!(matches!(err, BookingError::NotPermitted { .. }));
}

#[test]
fn test_terminal_states_are_final_even_for_admins() {
    use BookingStatus::*;

    for from in [Declined, Cancelled, Completed] {
        for to in [Pending, Confirmed, Declined, Cancelled, Completed] {
            assert!(
                matches!(check_transition(from, to, BookingActor::Admin), Err(BookingError::InvalidTransition { .. })),
                "{} -> {} should be rejected",
                from,
                to
            );
        }
    }
}

#[test]
fn test_commission_rounding() {
    // 15% of 12,345.67
    assert_eq!(commission_minor(1_234_567, 1500), 185_185);
    // 0.5 rounds up
    assert_eq!(commission_minor(1, 5000), 1);
    assert_eq!(commission_minor(100_000, 0), 0);
    assert_eq!(commission_minor(-5, 1000), 0);
}

#[test]
fn test_booking_actor_precedence() {
    let client = Uuid::new_v4();
    let model_user = Uuid::new_v4();
    let agency = Uuid::new_v4();
    let b = booking(client, model_user, Some(agency));

    let agency_owner = Viewer::new(Uuid::new_v4(), vec![Role::Agency]);
    assert_eq!(policy::booking_actor(&agency_owner, &b, &[agency]), Some(BookingActor::ModelSide));
    assert_eq!(policy::booking_actor(&agency_owner, &b, &[]), None);

    let admin = Viewer::new(client, vec![Role::Admin, Role::Brand]);
    assert_eq!(policy::booking_actor(&admin, &b, &[]), Some(BookingActor::Admin));

    let stranger = Viewer::new(Uuid::new_v4(), vec![Role::Brand]);
    assert!(!policy::can_view_booking(&stranger, &b, &[]));
}

#[test]
fn test_models_cannot_book() {
    assert!(!policy::can_book(&Viewer::new(Uuid::new_v4(), vec![Role::Model])));
    assert!(policy::can_book(&Viewer::new(Uuid::new_v4(), vec![Role::Brand])));
    assert!(policy::can_book(&Viewer::new(Uuid::new_v4(), vec![Role::Agency])));
}

#[test]
fn test_agency_manages_its_models_only() {
    let agency = Uuid::new_v4();
    let model: ModelProfile = serde_json::from_value(serde_json::json!({
        "id": Uuid::new_v4(),
        "user_id": Uuid::new_v4(),
        "agency_id": agency,
        "display_name": "Ria"
    }))
    .unwrap();

    let owner = Viewer::new(Uuid::new_v4(), vec![Role::Agency]);
    assert!(policy::can_manage_model(&owner, &model, &[agency]));
    assert!(!policy::can_manage_model(&owner, &model, &[Uuid::new_v4()]));
}

#[test]
fn test_reorder_moves_only_changed_rows() {
    let images = portfolio(5);
    let ids: Vec<Uuid> = images.iter().map(|i| i.id).collect();

    // Drag the last image to the front
    let mut order = ids.clone();
    let last = order.pop().unwrap();
    order.insert(0, last);

    let updates = plan_reorder(&images, &order).unwrap();
    assert_eq!(updates.len(), 5);
    assert_eq!(updates[0].image_id, last);
    assert_eq!(updates[0].position, 0);

    // Same order touches nothing
    assert!(plan_reorder(&images, &ids).unwrap().is_empty());
}

#[test]
fn test_reorder_rejects_bad_sequences() {
    let images = portfolio(3);
    let ids: Vec<Uuid> = images.iter().map(|i| i.id).collect();

    assert_eq!(plan_reorder(&images, &[ids[0], ids[0], ids[1]]), Err(ReorderError::Duplicate(ids[0])));
    assert_eq!(plan_reorder(&images, &ids[..2]), Err(ReorderError::Missing(1)));

    let stranger = Uuid::new_v4();
    assert_eq!(plan_reorder(&images, &[ids[0], ids[1], stranger]), Err(ReorderError::Unknown(stranger)));
}

#[test]
fn test_delete_cover_promotes_next_image() {
    let mut images = portfolio(4);
    let removed = images.remove(0);
    assert!(removed.is_cover);

    let moves = compact_positions(&images);
    assert_eq!(moves.len(), 3);
    assert!(moves.iter().all(|m| m.position >= 0 && m.position < 3));

    let covers = cover_changes(&images, None);
    assert_eq!(covers.len(), 1);
    assert_eq!(covers[0].image_id, images[0].id);
    assert!(covers[0].is_cover);

    assert_eq!(next_position(&images), 4);
    assert_eq!(next_position(&[]), 0);
}

#[test]
fn test_search_query_is_stable() {
    let search = ModelSearchQuery {
        city: Some("Delhi".to_string()),
        max_height_cm: Some(180),
        ..Default::default()
    };
    assert_eq!(
        build_model_query(&search).to_query_string(),
        build_model_query(&search.clone()).to_query_string()
    );
}

#[test]
fn test_user_messages() {
    assert_eq!(user_message("error trying to connect: tcp connect error"), MSG_CONNECTION);
    assert_eq!(user_message("Unauthorized (401): JWT expired"), MSG_SESSION);
    assert_eq!(user_message("permission denied for table bookings"), MSG_FORBIDDEN);
    assert_eq!(user_message("Conflict: duplicate key value"), MSG_DUPLICATE);
}
