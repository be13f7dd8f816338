use crate::error::DbError;
use crate::session::BackendSession;
use crate::types::TransactionState;

/// Two-state transaction tracker for the manager's single session.
///
/// Only one level of transaction exists; savepoints would be a new state and are not
/// modeled. A statement failing while a transaction is active marks it aborted: the
/// backend refuses further work in the block, so a later commit rolls back instead and
/// reports [`DbError::TransactionAborted`].
#[derive(Debug, Default)]
pub struct TransactionCoordinator {
    state: TransactionState,
    aborted: bool,
}

impl TransactionCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// True when a statement failed inside the active transaction.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Issue `BEGIN` and move to active.
    ///
    /// # Errors
    /// `DbError::TransactionAlreadyActive` when active (nothing is sent), or the backend
    /// error if `BEGIN` fails (state stays idle).
    pub fn begin(&mut self, session: &mut dyn BackendSession) -> Result<(), DbError> {
        if self.is_active() {
            return Err(DbError::TransactionAlreadyActive);
        }
        session.execute_batch("BEGIN")?;
        self.state = TransactionState::Active;
        self.aborted = false;
        tracing::debug!(session = session.id(), "transaction started");
        Ok(())
    }

    /// Issue `COMMIT` and return to idle.
    ///
    /// # Errors
    /// `DbError::NoActiveTransaction` when idle (nothing is sent).
    /// `DbError::TransactionAborted` when an earlier statement failed; `ROLLBACK` is sent
    /// instead. If `COMMIT` itself fails a best-effort `ROLLBACK` follows and the commit
    /// error is returned. The state is idle afterwards in every case but the first.
    pub fn commit(&mut self, session: &mut dyn BackendSession) -> Result<(), DbError> {
        if !self.is_active() {
            return Err(DbError::NoActiveTransaction);
        }

        if self.aborted {
            let rolled_back = session.execute_batch("ROLLBACK");
            self.reset();
            tracing::debug!(session = session.id(), "aborted transaction rolled back on commit");
            rolled_back?;
            return Err(DbError::TransactionAborted);
        }

        let committed = session.execute_batch("COMMIT");
        if committed.is_err() {
            let _ = session.execute_batch("ROLLBACK");
        }
        self.reset();
        committed?;
        tracing::debug!(session = session.id(), "transaction committed");
        Ok(())
    }

    /// Issue `ROLLBACK` and return to idle.
    ///
    /// # Errors
    /// `DbError::NoActiveTransaction` when idle (nothing is sent), or the backend error if
    /// `ROLLBACK` fails; the state is idle either way since the backend discards the
    /// block when the session ends.
    pub fn rollback(&mut self, session: &mut dyn BackendSession) -> Result<(), DbError> {
        if !self.is_active() {
            return Err(DbError::NoActiveTransaction);
        }
        let rolled_back = session.execute_batch("ROLLBACK");
        self.reset();
        rolled_back?;
        tracing::debug!(session = session.id(), "transaction rolled back");
        Ok(())
    }

    /// Record that a statement failed on the session.
    pub fn note_failure(&mut self) {
        if self.is_active() {
            self.aborted = true;
        }
    }

    /// Forget any transaction, e.g. because the session was closed or replaced.
    pub fn reset(&mut self) {
        self.state = TransactionState::Idle;
        self.aborted = false;
    }
}
