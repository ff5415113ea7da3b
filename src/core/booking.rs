use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::core::policy::BookingActor;
use crate::models::BookingStatus;

/// Longest single booking we accept
pub const MAX_BOOKING_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("Booking must end after it starts")]
    EmptyWindow,

    #[error("Booking cannot start in the past")]
    StartsInPast,

    #[error("Booking cannot be longer than 30 days")]
    TooLong,

    #[error("Cannot move booking from {from} to {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },

    #[error("Not permitted to move booking from {from} to {to}")]
    NotPermitted { from: BookingStatus, to: BookingStatus },
}

/// Check a requested booking window against `now`
pub fn validate_window(
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    if ends_at <= starts_at {
        return Err(BookingError::EmptyWindow);
    }
    if starts_at < now {
        return Err(BookingError::StartsInPast);
    }
    if ends_at - starts_at > Duration::days(MAX_BOOKING_DAYS) {
        return Err(BookingError::TooLong);
    }
    Ok(())
}

/// Which actors may perform a given edge of the booking lifecycle
///
/// ```text
/// pending   -> confirmed | declined   (model side)
/// pending   -> cancelled              (client, model side)
/// confirmed -> cancelled              (client, model side)
/// confirmed -> completed              (client)
/// ```
/// Admins may take any edge. Terminal states have no outgoing edges.
fn allowed_actors(from: BookingStatus, to: BookingStatus) -> Option<&'static [BookingActor]> {
    use BookingStatus::*;

    const MODEL_SIDE: &[BookingActor] = &[BookingActor::ModelSide, BookingActor::Admin];
    const EITHER_PARTY: &[BookingActor] = &[BookingActor::Client, BookingActor::ModelSide, BookingActor::Admin];
    const CLIENT: &[BookingActor] = &[BookingActor::Client, BookingActor::Admin];

    match (from, to) {
        (Pending, Confirmed) | (Pending, Declined) => Some(MODEL_SIDE),
        (Pending, Cancelled) | (Confirmed, Cancelled) => Some(EITHER_PARTY),
        (Confirmed, Completed) => Some(CLIENT),
        _ => None,
    }
}

pub fn check_transition(
    from: BookingStatus,
    to: BookingStatus,
    actor: BookingActor,
) -> Result<(), BookingError> {
    match allowed_actors(from, to) {
        None => Err(BookingError::InvalidTransition { from, to }),
        Some(actors) if actors.contains(&actor) => Ok(()),
        Some(_) => Err(BookingError::NotPermitted { from, to }),
    }
}

/// Agency cut of a fee, rounded half-up to the nearest minor unit
pub fn commission_minor(fee_minor: i64, rate_bps: i32) -> i64 {
    if fee_minor <= 0 || rate_bps <= 0 {
        return 0;
    }
    (fee_minor * rate_bps as i64 + 5_000) / 10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_rules() {
        let now = Utc::now();
        let start = now + Duration::hours(2);

        assert_eq!(validate_window(start, start + Duration::hours(8), now), Ok(()));
        assert_eq!(validate_window(start, start, now), Err(BookingError::EmptyWindow));
        assert_eq!(
            validate_window(now - Duration::hours(1), now + Duration::hours(1), now),
            Err(BookingError::StartsInPast)
        );
        assert_eq!(
            validate_window(start, start + Duration::days(31), now),
            Err(BookingError::TooLong)
        );
    }

    #[test]
    fn test_transitions() {
        use BookingActor::*;
        use BookingStatus::*;

        assert!(check_transition(Pending, Confirmed, ModelSide).is_ok());
        assert_eq!(
            check_transition(Pending, Confirmed, Client),
            Err(BookingError::NotPermitted { from: Pending, to: Confirmed })
        );
        assert!(check_transition(Confirmed, Completed, Client).is_ok());
        assert!(check_transition(Confirmed, Completed, ModelSide).is_err());
        assert_eq!(
            check_transition(Completed, Cancelled, Admin),
            Err(BookingError::InvalidTransition { from: Completed, to: Cancelled })
        );
        assert!(check_transition(Pending, Pending, Admin).is_err());
    }

    #[test]
    fn test_commission_rounding() {
        assert_eq!(commission_minor(100_000, 2_000), 20_000);
        assert_eq!(commission_minor(333, 1_500), 50); // 49.95 rounds up
        assert_eq!(commission_minor(100_000, 0), 0);
    }
}
