use thiserror::Error;

use crate::types::BackendKind;

#[derive(Debug, Error)]
pub enum DbError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("SQL execution error: {0}")]
    Execution(String),

    #[error("no connection")]
    NotConnected,

    #[error("already connected; disconnect first")]
    AlreadyConnected,

    #[error("no backend selected; call set_mode first")]
    NoBackendSelected,

    #[error("no session implementation for backend {0:?}")]
    UnsupportedBackend(BackendKind),

    #[error("no connection string recorded; connect first")]
    NoConnectionString,

    #[error("a transaction is already active")]
    TransactionAlreadyActive,

    #[error("no active transaction")]
    NoActiveTransaction,

    #[error("transaction aborted by an earlier failure and was rolled back")]
    TransactionAborted,
}

impl DbError {
    /// True for failures caused by calling an operation in the wrong manager state
    /// (as opposed to the backend rejecting the work).
    #[must_use]
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            DbError::NotConnected
                | DbError::AlreadyConnected
                | DbError::NoBackendSelected
                | DbError::NoConnectionString
                | DbError::TransactionAlreadyActive
                | DbError::NoActiveTransaction
        )
    }

    /// True when the backend itself rejected a statement.
    ///
    /// Only these put an open transaction block into the aborted state; a value that fails
    /// to decode on the client was produced by a statement the server accepted.
    #[must_use]
    pub fn is_backend_rejection(&self) -> bool {
        matches!(self, DbError::Execution(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_errors_are_classified() {
        assert!(DbError::NotConnected.is_state_error());
        assert!(DbError::NoActiveTransaction.is_state_error());
        assert!(!DbError::Execution("syntax error".into()).is_state_error());
        assert!(!DbError::TransactionAborted.is_state_error());
    }

    #[test]
    fn only_execution_errors_are_backend_rejections() {
        assert!(DbError::Execution("duplicate key".into()).is_backend_rejection());
        let decode = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        assert!(!DbError::Serialization(decode).is_backend_rejection());
        assert!(!DbError::NotConnected.is_backend_rejection());
    }

    #[test]
    fn unsupported_backend_names_the_kind() {
        let msg = DbError::UnsupportedBackend(BackendKind::Mysql).to_string();
        assert!(msg.contains("Mysql"), "{msg}");
    }
}
