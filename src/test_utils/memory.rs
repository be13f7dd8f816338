//! In-memory session factory for exercising the manager without a server.
//!
//! Sessions record every statement they are handed (including ones made to fail) in a
//! log shared with the factory, so tests can assert on exactly what reached the
//! "backend".

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::container::{ROW_FIELD, Value, ValueContainer};
use crate::error::DbError;
use crate::session::{BackendSession, SessionFactory, next_session_id};
use crate::types::BackendKind;

#[derive(Debug, Default)]
struct Shared {
    statements: Mutex<Vec<String>>,
    fail_patterns: Mutex<Vec<String>>,
    undecodable_patterns: Mutex<Vec<String>>,
    rows: Mutex<Vec<ValueContainer>>,
    affected_rows: AtomicU64,
    refuse_connections: AtomicBool,
    unhealthy: AtomicBool,
    opened: AtomicU64,
    closed: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Factory handing out [`MemorySession`]s for the `Postgres` kind.
#[derive(Debug, Clone)]
pub struct MemorySessionFactory {
    shared: Arc<Shared>,
}

impl Default for MemorySessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionFactory {
    #[must_use]
    pub fn new() -> Self {
        let shared = Shared::default();
        shared.affected_rows.store(1, Ordering::Relaxed);
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Every statement sent so far, in order, across all sessions.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        lock(&self.shared.statements).clone()
    }

    /// Make any statement containing `pattern` fail.
    pub fn fail_statements_containing(&self, pattern: impl Into<String>) {
        lock(&self.shared.fail_patterns).push(pattern.into());
    }

    /// Make any query containing `pattern` succeed on the "server" but fail while its
    /// rows are decoded.
    pub fn fail_decoding_containing(&self, pattern: impl Into<String>) {
        lock(&self.shared.undecodable_patterns).push(pattern.into());
    }

    /// Rows returned by every query.
    pub fn set_rows(&self, rows: Vec<ValueContainer>) {
        *lock(&self.shared.rows) = rows;
    }

    /// Affected row count reported by every successful `execute`.
    pub fn set_affected_rows(&self, count: u64) {
        self.shared.affected_rows.store(count, Ordering::Relaxed);
    }

    /// Refuse new connections, as an unreachable server would.
    pub fn refuse_connections(&self, refuse: bool) {
        self.shared.refuse_connections.store(refuse, Ordering::Relaxed);
    }

    /// Make pings fail, as a dropped connection would.
    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.shared.unhealthy.store(unhealthy, Ordering::Relaxed);
    }

    #[must_use]
    pub fn opened_sessions(&self) -> u64 {
        self.shared.opened.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn closed_sessions(&self) -> u64 {
        self.shared.closed.load(Ordering::Relaxed)
    }
}

impl SessionFactory for MemorySessionFactory {
    fn supports(&self, kind: BackendKind) -> bool {
        kind == BackendKind::Postgres
    }

    fn open(
        &self,
        kind: BackendKind,
        connection_string: &str,
    ) -> Result<Box<dyn BackendSession>, DbError> {
        if !self.supports(kind) {
            return Err(DbError::UnsupportedBackend(kind));
        }
        if self.shared.refuse_connections.load(Ordering::Relaxed) {
            return Err(DbError::Connection("connection refused".into()));
        }
        self.shared.opened.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemorySession {
            id: next_session_id(),
            connection_string: connection_string.to_string(),
            shared: Arc::clone(&self.shared),
        }))
    }
}

/// Session produced by [`MemorySessionFactory`].
#[derive(Debug)]
pub struct MemorySession {
    id: u64,
    connection_string: String,
    shared: Arc<Shared>,
}

impl MemorySession {
    fn record(&self, sql: &str) -> Result<(), DbError> {
        lock(&self.shared.statements).push(sql.to_string());
        let failing = lock(&self.shared.fail_patterns)
            .iter()
            .any(|pattern| sql.contains(pattern.as_str()));
        if failing {
            return Err(DbError::Execution(format!("statement rejected: {sql}")));
        }
        Ok(())
    }
}

impl BackendSession for MemorySession {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn connection_string(&self) -> &str {
        &self.connection_string
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), DbError> {
        self.record(sql)
    }

    fn execute(&mut self, sql: &str) -> Result<u64, DbError> {
        self.record(sql)?;
        Ok(self.shared.affected_rows.load(Ordering::Relaxed))
    }

    fn query(&mut self, sql: &str) -> Result<ValueContainer, DbError> {
        self.record(sql)?;
        let undecodable = lock(&self.shared.undecodable_patterns)
            .iter()
            .any(|pattern| sql.contains(pattern.as_str()));
        if undecodable {
            return ValueContainer::from_bytes(b"{\"truncated\":");
        }
        let rows = lock(&self.shared.rows)
            .iter()
            .map(ValueContainer::embed)
            .collect::<Result<Vec<_>, _>>()?;
        let mut result = ValueContainer::new();
        result.set(ROW_FIELD, Value::Sequence(rows));
        Ok(result)
    }

    fn ping(&mut self) -> Result<(), DbError> {
        if self.shared.unhealthy.load(Ordering::Relaxed) {
            return Err(DbError::Connection("connection lost".into()));
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), DbError> {
        self.shared.closed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
