// Core marketplace rules, free of I/O
pub mod booking;
pub mod feedback;
pub mod policy;
pub mod portfolio;
pub mod search;

pub use booking::{check_transition, commission_minor, validate_window, BookingError};
pub use feedback::user_message;
pub use policy::{BookingActor, Viewer};
pub use portfolio::{compact_positions, cover_changes, next_position, plan_reorder, CoverChange, PositionUpdate, ReorderError};
pub use search::build_model_query;
