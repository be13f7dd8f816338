//! Blocking database connection manager.
//!
//! One [`DatabaseManager`] owns at most one backend session and serializes every call
//! against it. Query results come back as [`ValueContainer`]s with one embedded container
//! per row under the `"row"` field.
//!
//! Only PostgreSQL has a session implementation (the `postgres` feature, on by default).

pub mod container;
pub mod error;
pub mod helpers;
pub mod manager;
pub mod prelude;
pub mod session;
pub mod test_utils;
pub mod transaction;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use container::{ROW_FIELD, Value, ValueContainer, ValueType};
pub use error::DbError;
pub use helpers::redact_connection_string;
pub use manager::DatabaseManager;
pub use session::{BackendSession, BuiltinSessionFactory, SessionFactory};
pub use transaction::TransactionCoordinator;
pub use types::{BackendKind, TransactionState};

#[cfg(feature = "postgres")]
pub use postgres::PgSession;
