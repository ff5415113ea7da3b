//! Casting Hub - backend for a fashion-model casting marketplace
//!
//! Models, agencies, brands and admins share one service: discovery,
//! bookings, messaging, portfolio management and subscription checkout.
//! Marketplace records live in a hosted backend; this crate adds typed
//! access, role checks, booking rules and payment hand-off on top.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;

// Re-export commonly used types
pub use config::Settings;
pub use error::ApiError;
pub use routes::{configure_routes, AppState};
pub use services::{BackendClient, CacheManager, PostgresClient, TableQuery};
