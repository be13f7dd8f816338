use std::sync::atomic::{AtomicU64, Ordering};

use crate::container::ValueContainer;
use crate::error::DbError;
use crate::types::BackendKind;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique session id.
#[must_use]
pub fn next_session_id() -> u64 {
    NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
}

/// One live physical connection to a backend.
///
/// Implementations are used by a single caller at a time; the manager serializes access.
pub trait BackendSession: Send {
    fn kind(&self) -> BackendKind;

    /// Process-unique id, stable for the lifetime of the session.
    fn id(&self) -> u64;

    /// The connection string the session was opened with.
    fn connection_string(&self) -> &str;

    /// Run one or more statements without returning rows.
    ///
    /// # Errors
    /// Returns an error if the backend rejects any statement.
    fn execute_batch(&mut self, sql: &str) -> Result<(), DbError>;

    /// Run a single statement and return the affected row count.
    ///
    /// # Errors
    /// Returns an error if the backend rejects the statement.
    fn execute(&mut self, sql: &str) -> Result<u64, DbError>;

    /// Run a single query and materialize its rows.
    ///
    /// # Errors
    /// Returns an error if the backend rejects the query or a value cannot be
    /// materialized.
    fn query(&mut self, sql: &str) -> Result<ValueContainer, DbError>;

    /// Round-trip a trivial statement.
    ///
    /// # Errors
    /// Returns an error if the connection is unusable.
    fn ping(&mut self) -> Result<(), DbError>;

    /// Close the connection and release every resource the session holds.
    ///
    /// # Errors
    /// Returns an error if the backend reported a failure while shutting down; the
    /// resources are released either way.
    fn close(self: Box<Self>) -> Result<(), DbError>;
}

/// Opens sessions for the kinds it supports.
pub trait SessionFactory: Send + Sync {
    fn supports(&self, kind: BackendKind) -> bool;

    /// Open a new session.
    ///
    /// # Errors
    /// Returns `DbError::UnsupportedBackend` for kinds the factory cannot open, or the
    /// backend's connection failure.
    fn open(
        &self,
        kind: BackendKind,
        connection_string: &str,
    ) -> Result<Box<dyn BackendSession>, DbError>;
}

/// Factory for the backends compiled into this build.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinSessionFactory;

impl SessionFactory for BuiltinSessionFactory {
    fn supports(&self, kind: BackendKind) -> bool {
        kind.is_supported()
    }

    fn open(
        &self,
        kind: BackendKind,
        connection_string: &str,
    ) -> Result<Box<dyn BackendSession>, DbError> {
        match kind {
            #[cfg(feature = "postgres")]
            BackendKind::Postgres => Ok(Box::new(crate::postgres::PgSession::open(
                connection_string,
            )?)),
            BackendKind::None => Err(DbError::NoBackendSelected),
            other => {
                let _ = connection_string;
                Err(DbError::UnsupportedBackend(other))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        let a = next_session_id();
        let b = next_session_id();
        assert_ne!(a, b);
    }

    #[test]
    fn builtin_factory_refuses_reserved_kinds() {
        let factory = BuiltinSessionFactory;
        assert!(!factory.supports(BackendKind::Oracle));
        assert!(matches!(
            factory.open(BackendKind::Oracle, "host=localhost"),
            Err(DbError::UnsupportedBackend(BackendKind::Oracle))
        ));
        assert!(matches!(
            factory.open(BackendKind::None, "host=localhost"),
            Err(DbError::NoBackendSelected)
        ));
    }

    #[test]
    fn opened_sessions_report_their_kind_and_string() {
        let factory = crate::test_utils::MemorySessionFactory::new();
        let session = factory.open(BackendKind::Postgres, "host=memory").unwrap();
        assert_eq!(session.kind(), BackendKind::Postgres);
        assert_eq!(session.connection_string(), "host=memory");
        session.close().unwrap();
    }
}
