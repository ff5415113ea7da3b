// Service exports
pub mod backend;
pub mod cache;
pub mod payments;
pub mod postgres;
pub mod query;

pub use backend::{BackendClient, BackendError, Credential};
pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use payments::{CheckoutGateway, PaymentError, PaymentGateways};
pub use postgres::{AuditEntry, PostgresClient, PostgresError};
pub use query::TableQuery;
