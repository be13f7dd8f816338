use std::sync::{LazyLock, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::container::ValueContainer;
use crate::error::DbError;
use crate::helpers::redact_connection_string;
use crate::session::{BackendSession, BuiltinSessionFactory, SessionFactory};
use crate::transaction::TransactionCoordinator;
use crate::types::{BackendKind, TransactionState};

static GLOBAL: LazyLock<DatabaseManager> = LazyLock::new(DatabaseManager::new);

#[derive(Default)]
struct ManagerState {
    kind: BackendKind,
    session: Option<Box<dyn BackendSession>>,
    transaction: TransactionCoordinator,
    last_connection_string: Option<String>,
}

/// Connection and query facade over a single backend session.
///
/// Every operation locks one mutex for its whole duration, so the session never sees two
/// statements at once. Calls block the invoking thread for the backend round trip.
///
/// Operations come in two forms: `try_*` returns the precise [`DbError`], while the plain
/// form logs the error and returns a sentinel (`false`, `0` or `None`).
/// ```rust
/// use pg_session_manager::prelude::*;
///
/// let db = DatabaseManager::new();
/// assert!(db.set_mode(BackendKind::Postgres));
/// assert!(!db.disconnect()); // nothing to disconnect
/// assert_eq!(db.insert_query("INSERT INTO t VALUES (1)"), 0);
/// assert!(db.select_query("SELECT 1").is_none());
/// assert!(matches!(db.try_select_query("SELECT 1"), Err(DbError::NotConnected)));
/// ```
pub struct DatabaseManager {
    state: Mutex<ManagerState>,
    factory: Box<dyn SessionFactory>,
}

impl std::fmt::Debug for DatabaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("DatabaseManager")
            .field("kind", &state.kind)
            .field("session", &state.session.as_ref().map(|s| s.id()))
            .field("transaction", &state.transaction.state())
            .finish_non_exhaustive()
    }
}

impl Default for DatabaseManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DatabaseManager {
    fn drop(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(session) = state.session.take() {
            let id = session.id();
            if let Err(e) = session.close() {
                warn!(session = id, error = %e, "error closing session on drop");
            }
        }
    }
}

fn sentinel<T>(op: &'static str, result: Result<T, DbError>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(op, error = %e, "database operation failed");
            fallback
        }
    }
}

impl DatabaseManager {
    /// The process-wide manager, built on first use.
    ///
    /// Racing first calls from many threads still construct exactly one instance.
    #[must_use]
    pub fn handle() -> &'static DatabaseManager {
        &GLOBAL
    }

    /// A standalone manager using the backends compiled into this build.
    #[must_use]
    pub fn new() -> Self {
        Self::with_factory(BuiltinSessionFactory)
    }

    /// A standalone manager opening sessions through `factory`.
    #[must_use]
    pub fn with_factory(factory: impl SessionFactory + 'static) -> Self {
        Self {
            state: Mutex::new(ManagerState::default()),
            factory: Box::new(factory),
        }
    }

    // A panic mid-operation cannot leave the state half-updated: every field is assigned
    // after the fallible backend call returns.
    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Run `op` against the live session, marking an active transaction aborted when the
    /// backend rejects the statement.
    fn dispatch<T>(
        &self,
        op: &'static str,
        sql: &str,
        run: impl FnOnce(&mut dyn BackendSession, &str) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let mut state = self.lock();
        if state.kind == BackendKind::None {
            return Err(DbError::NotConnected);
        }
        let ManagerState {
            session,
            transaction,
            ..
        } = &mut *state;
        let session = session.as_deref_mut().ok_or(DbError::NotConnected)?;

        debug!(op, session = session.id(), "dispatching statement");
        let result = run(session, sql);
        if result.as_ref().is_err_and(DbError::is_backend_rejection) {
            transaction.note_failure();
        }
        result
    }

    // ----- mode -----------------------------------------------------------------------

    /// Record the backend kind used by the next `connect`.
    ///
    /// # Errors
    /// `DbError::UnsupportedBackend` for kinds without a session implementation, and
    /// `DbError::AlreadyConnected` when switching kinds while connected.
    pub fn try_set_mode(&self, kind: BackendKind) -> Result<(), DbError> {
        if !self.factory.supports(kind) {
            return Err(DbError::UnsupportedBackend(kind));
        }
        let mut state = self.lock();
        if state.session.is_some() && state.kind != kind {
            return Err(DbError::AlreadyConnected);
        }
        state.kind = kind;
        debug!(%kind, "backend mode set");
        Ok(())
    }

    pub fn set_mode(&self, kind: BackendKind) -> bool {
        sentinel("set_mode", self.try_set_mode(kind).map(|()| true), false)
    }

    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.lock().kind
    }

    // ----- connection lifecycle -------------------------------------------------------

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lock().session.is_some()
    }

    /// Id of the live session, if any. Changes on every successful connect.
    #[must_use]
    pub fn session_id(&self) -> Option<u64> {
        self.lock().session.as_ref().map(|s| s.id())
    }

    /// Open a session for the current mode.
    ///
    /// # Errors
    /// `DbError::AlreadyConnected` (the live session is untouched),
    /// `DbError::NoBackendSelected`, or the backend's connection failure.
    pub fn try_connect(&self, connection_string: &str) -> Result<(), DbError> {
        let mut state = self.lock();
        if state.session.is_some() {
            return Err(DbError::AlreadyConnected);
        }
        if state.kind == BackendKind::None {
            return Err(DbError::NoBackendSelected);
        }

        let session = self.factory.open(state.kind, connection_string)?;
        info!(
            session = session.id(),
            kind = %session.kind(),
            server = %redact_connection_string(connection_string),
            "connected"
        );
        state.session = Some(session);
        state.transaction.reset();
        state.last_connection_string = Some(connection_string.to_string());
        Ok(())
    }

    pub fn connect(&self, connection_string: &str) -> bool {
        sentinel(
            "connect",
            self.try_connect(connection_string).map(|()| true),
            false,
        )
    }

    /// Close and release the live session.
    ///
    /// # Errors
    /// `DbError::NotConnected` when there is no session, so a second call fails.
    pub fn try_disconnect(&self) -> Result<(), DbError> {
        let mut state = self.lock();
        let session = state.session.take().ok_or(DbError::NotConnected)?;
        if state.transaction.is_active() {
            debug!(session = session.id(), "disconnecting with an open transaction");
        }
        state.transaction.reset();

        let id = session.id();
        // The session is released whatever close reports.
        if let Err(e) = session.close() {
            warn!(session = id, error = %e, "error while closing session");
        }
        info!(session = id, "disconnected");
        Ok(())
    }

    pub fn disconnect(&self) -> bool {
        sentinel("disconnect", self.try_disconnect().map(|()| true), false)
    }

    /// Close the live session (if any) and connect again with the last connection string.
    ///
    /// # Errors
    /// `DbError::NoConnectionString` if no connect ever succeeded, or the close/open
    /// failure. On error the manager is disconnected.
    pub fn try_reconnect(&self) -> Result<(), DbError> {
        let mut state = self.lock();
        let connection_string = state
            .session
            .as_ref()
            .map(|s| s.connection_string().to_string())
            .or_else(|| state.last_connection_string.clone())
            .ok_or(DbError::NoConnectionString)?;

        if let Some(old) = state.session.take() {
            debug_assert_eq!(old.kind(), state.kind, "mode changed under a live session");
            state.transaction.reset();
            let id = old.id();
            old.close()?;
            debug!(session = id, "closed session for reconnect");
        }

        let session = self.factory.open(state.kind, &connection_string)?;
        info!(session = session.id(), "reconnected");
        state.session = Some(session);
        state.transaction.reset();
        Ok(())
    }

    pub fn reconnect(&self) -> bool {
        sentinel("reconnect", self.try_reconnect().map(|()| true), false)
    }

    /// Round-trip a trivial statement. Does not change any state.
    ///
    /// # Errors
    /// `DbError::NotConnected` or the backend failure.
    pub fn try_test_connection(&self) -> Result<(), DbError> {
        let mut state = self.lock();
        let session = state.session.as_deref_mut().ok_or(DbError::NotConnected)?;
        session.ping()
    }

    pub fn test_connection(&self) -> bool {
        match self.try_test_connection() {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "connection test failed");
                false
            }
        }
    }

    // ----- statements -----------------------------------------------------------------

    /// Run DDL or control statements; several may be separated by `;`.
    ///
    /// # Errors
    /// `DbError::NotConnected` or the backend failure.
    pub fn try_create_query(&self, sql: &str) -> Result<(), DbError> {
        self.dispatch("create", sql, |session, sql| session.execute_batch(sql))
    }

    pub fn create_query(&self, sql: &str) -> bool {
        sentinel("create", self.try_create_query(sql).map(|()| true), false)
    }

    /// # Errors
    /// `DbError::NotConnected` or the backend failure.
    pub fn try_insert_query(&self, sql: &str) -> Result<u64, DbError> {
        self.dispatch("insert", sql, |session, sql| session.execute(sql))
    }

    /// Rows inserted; 0 on failure.
    pub fn insert_query(&self, sql: &str) -> u64 {
        sentinel("insert", self.try_insert_query(sql), 0)
    }

    /// # Errors
    /// `DbError::NotConnected` or the backend failure.
    pub fn try_update_query(&self, sql: &str) -> Result<u64, DbError> {
        self.dispatch("update", sql, |session, sql| session.execute(sql))
    }

    /// Rows updated; 0 on failure or when nothing matched.
    pub fn update_query(&self, sql: &str) -> u64 {
        sentinel("update", self.try_update_query(sql), 0)
    }

    /// # Errors
    /// `DbError::NotConnected` or the backend failure.
    pub fn try_delete_query(&self, sql: &str) -> Result<u64, DbError> {
        self.dispatch("delete", sql, |session, sql| session.execute(sql))
    }

    /// Rows deleted; 0 on failure or when nothing matched.
    pub fn delete_query(&self, sql: &str) -> u64 {
        sentinel("delete", self.try_delete_query(sql), 0)
    }

    /// Run a query and materialize its rows under `"row"`.
    ///
    /// # Errors
    /// `DbError::NotConnected`, the backend failure, or a materialization failure.
    pub fn try_select_query(&self, sql: &str) -> Result<ValueContainer, DbError> {
        self.dispatch("select", sql, |session, sql| session.query(sql))
    }

    /// The materialized rows, or `None` on any failure. A query matching nothing gives
    /// `Some` with an empty `"row"` sequence.
    pub fn select_query(&self, sql: &str) -> Option<ValueContainer> {
        sentinel("select", self.try_select_query(sql).map(Some), None)
    }

    // ----- transactions ---------------------------------------------------------------

    /// # Errors
    /// `DbError::NotConnected`, `DbError::TransactionAlreadyActive`, or the backend
    /// failure; the state is unchanged on error.
    pub fn try_begin_transaction(&self) -> Result<(), DbError> {
        let mut state = self.lock();
        let ManagerState {
            session,
            transaction,
            ..
        } = &mut *state;
        let session = session.as_deref_mut().ok_or(DbError::NotConnected)?;
        transaction.begin(session)
    }

    pub fn begin_transaction(&self) -> bool {
        sentinel("begin", self.try_begin_transaction().map(|()| true), false)
    }

    /// # Errors
    /// `DbError::NotConnected`, `DbError::NoActiveTransaction`,
    /// `DbError::TransactionAborted` (rolled back instead), or the backend failure.
    pub fn try_commit_transaction(&self) -> Result<(), DbError> {
        let mut state = self.lock();
        let ManagerState {
            session,
            transaction,
            ..
        } = &mut *state;
        let session = session.as_deref_mut().ok_or(DbError::NotConnected)?;
        transaction.commit(session)
    }

    pub fn commit_transaction(&self) -> bool {
        sentinel("commit", self.try_commit_transaction().map(|()| true), false)
    }

    /// # Errors
    /// `DbError::NotConnected`, `DbError::NoActiveTransaction`, or the backend failure.
    pub fn try_rollback_transaction(&self) -> Result<(), DbError> {
        let mut state = self.lock();
        let ManagerState {
            session,
            transaction,
            ..
        } = &mut *state;
        let session = session.as_deref_mut().ok_or(DbError::NotConnected)?;
        transaction.rollback(session)
    }

    pub fn rollback_transaction(&self) -> bool {
        sentinel("rollback", self.try_rollback_transaction().map(|()| true), false)
    }

    #[must_use]
    pub fn is_in_transaction(&self) -> bool {
        self.lock().transaction.is_active()
    }

    #[must_use]
    pub fn transaction_state(&self) -> TransactionState {
        self.lock().transaction.state()
    }
}
