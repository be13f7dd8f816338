use postgresql_embedded::PostgreSQL;

use super::super::SHARED_RUNTIME;
use crate::postgres::PgSession;
use crate::session::BackendSession;

/// Represents a running embedded `PostgreSQL` instance.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub port: u16,
    /// Key/value connection string for the created database, credentials included
    pub connection_string: String,
}

/// Set up an embedded `PostgreSQL` instance with a fresh database named `db_name`.
///
/// # Errors
/// Returns an error if the embedded server cannot be set up or started, if the database
/// cannot be created, or if the post-start connectivity check fails.
pub fn setup_postgres_embedded(
    db_name: &str,
) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    let (postgresql, port, connection_string) = SHARED_RUNTIME.block_on(async {
        let mut postgresql = PostgreSQL::default();

        // Setup PostgreSQL binaries (bundled, so no download conflicts)
        postgresql.setup().await?;
        postgresql.start().await?;

        let settings = postgresql.settings();
        let port = settings.port;
        let connection_string = format!(
            "host={} port={port} dbname={db_name} user={} password='{}'",
            settings.host, settings.username, settings.password
        );

        postgresql.create_database(db_name).await?;
        Ok::<_, Box<dyn std::error::Error>>((postgresql, port, connection_string))
    })?;

    // Quick connection test, outside the shared runtime: sessions block on their own.
    let mut session = PgSession::open(&connection_string)?;
    session.ping()?;
    Box::new(session).close()?;
    println!("PostgreSQL started on port {port}");

    Ok(EmbeddedPostgres {
        postgresql,
        port,
        connection_string,
    })
}

/// Stop a previously started embedded `PostgreSQL` instance.
pub fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    SHARED_RUNTIME.block_on(async move {
        let _ = postgresql.stop().await;
    });
}
