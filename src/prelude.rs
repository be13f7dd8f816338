//! Convenient imports for common functionality.

pub use crate::container::{ROW_FIELD, Value, ValueContainer, ValueType};
pub use crate::error::DbError;
pub use crate::manager::DatabaseManager;
pub use crate::session::{BackendSession, SessionFactory};
pub use crate::types::{BackendKind, TransactionState};

#[cfg(feature = "postgres")]
pub use crate::postgres::PgSession;
