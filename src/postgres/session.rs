use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};

use super::config::{describe, parse_connection_string};
use super::query::build_result_container;
use crate::container::ValueContainer;
use crate::error::DbError;
use crate::session::{BackendSession, next_session_id};
use crate::types::BackendKind;

/// One blocking `PostgreSQL` connection.
///
/// The client is driven by a private current-thread runtime: the connection task only
/// makes progress while a call is blocked on that runtime, so no thread is spawned. Do
/// not call into a session from inside another async runtime; use `spawn_blocking`.
pub struct PgSession {
    id: u64,
    connection_string: String,
    // dropped before the runtime so the connection sees its client go away first
    client: Client,
    driver: JoinHandle<()>,
    runtime: Runtime,
}

impl std::fmt::Debug for PgSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgSession")
            .field("id", &self.id)
            .field("closed", &self.client.is_closed())
            .finish_non_exhaustive()
    }
}

impl PgSession {
    /// Connect using a libpq-style key/value string or URL.
    ///
    /// # Errors
    /// Returns `DbError::Config` for an unparseable string and `DbError::Connection` when
    /// the server is unreachable or rejects the credentials.
    pub fn open(connection_string: &str) -> Result<Self, DbError> {
        let config = parse_connection_string(connection_string)?;
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::Connection(format!("postgres runtime error: {e}")))?;

        let debug = std::env::var_os("PG_SESSION_DEBUG").is_some();
        if debug {
            eprintln!("[pg-session] connect start {}", describe(&config));
        }
        let (client, connection) = runtime
            .block_on(config.connect(NoTls))
            .map_err(|e| DbError::Connection(format!("postgres connect error: {e}")))?;
        if debug {
            eprintln!("[pg-session] connect established");
        }

        let driver = runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(error = %e, "postgres connection ended with error");
            }
        });

        let id = next_session_id();
        tracing::debug!(session = id, server = %describe(&config), "postgres session opened");

        Ok(Self {
            id,
            connection_string: connection_string.to_string(),
            client,
            driver,
            runtime,
        })
    }
}

impl BackendSession for PgSession {
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
        self.runtime
            .block_on(self.client.batch_execute(sql))
            .map_err(|e| DbError::Execution(format!("postgres batch error: {e}")))
    }

    fn execute(&mut self, sql: &str) -> Result<u64, DbError> {
        self.runtime
            .block_on(self.client.execute(sql, &[]))
            .map_err(|e| DbError::Execution(format!("postgres execute error: {e}")))
    }

    fn query(&mut self, sql: &str) -> Result<ValueContainer, DbError> {
        let rows = self
            .runtime
            .block_on(self.client.query(sql, &[]))
            .map_err(|e| DbError::Execution(format!("postgres select error: {e}")))?;
        build_result_container(&rows)
    }

    fn ping(&mut self) -> Result<(), DbError> {
        if self.client.is_closed() {
            return Err(DbError::Connection("postgres connection is closed".into()));
        }
        // An empty query is answered even inside an aborted transaction block, where
        // `SELECT 1` would be refused.
        self.runtime
            .block_on(self.client.simple_query(""))
            .map(|_| ())
            .map_err(|e| DbError::Connection(format!("postgres ping error: {e}")))
    }

    fn close(self: Box<Self>) -> Result<(), DbError> {
        let PgSession {
            id,
            client,
            driver,
            runtime,
            ..
        } = *self;

        // Dropping the last client handle makes the connection send Terminate and finish.
        drop(client);
        let joined = runtime.block_on(driver);
        drop(runtime);
        tracing::debug!(session = id, "postgres session closed");

        joined.map_err(|e| DbError::Connection(format!("postgres connection task failed: {e}")))
    }
}
