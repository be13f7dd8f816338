use clap::ValueEnum;

/// The backend a manager talks to.
///
/// Only `Postgres` ships a session implementation; the other named kinds are reserved so
/// callers can already select them from configuration and get a clean refusal.
/// ```rust
/// use pg_session_manager::prelude::*;
///
/// assert!(BackendKind::Postgres.is_supported());
/// assert!(!BackendKind::Mysql.is_supported());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum BackendKind {
    /// No backend selected yet
    #[default]
    None,
    /// `PostgreSQL` database
    Postgres,
    /// Reserved
    Mysql,
    /// Reserved
    Sqlite,
    /// Reserved
    Oracle,
    /// Reserved
    #[value(name = "mongodb")]
    MongoDb,
}

impl BackendKind {
    /// Whether this build carries a session implementation for the kind.
    #[must_use]
    pub fn is_supported(self) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            BackendKind::Postgres => true,
            _ => false,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::None => "none",
            BackendKind::Postgres => "postgres",
            BackendKind::Mysql => "mysql",
            BackendKind::Sqlite => "sqlite",
            BackendKind::Oracle => "oracle",
            BackendKind::MongoDb => "mongodb",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction state tracked by the manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionState {
    #[default]
    Idle,
    Active,
}
