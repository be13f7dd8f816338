use std::str::FromStr;
use tokio_postgres::config::Host;

use crate::error::DbError;

/// Parse a libpq-style key/value string or `postgres://` URL.
///
/// Validation is left entirely to `tokio_postgres`; the error message never includes the
/// input.
///
/// # Errors
/// Returns `DbError::Config` if the string cannot be parsed.
pub fn parse_connection_string(connection_string: &str) -> Result<tokio_postgres::Config, DbError> {
    tokio_postgres::Config::from_str(connection_string)
        .map_err(|e| DbError::Config(format!("invalid postgres connection string: {e}")))
}

/// Short human description (`user@host:port/db`) of a parsed config.
#[must_use]
pub fn describe(config: &tokio_postgres::Config) -> String {
    let host = config
        .get_hosts()
        .first()
        .map_or_else(
            || "localhost".to_string(),
            |h| match h {
                Host::Tcp(name) => name.clone(),
                #[cfg(unix)]
                Host::Unix(path) => path.display().to_string(),
            },
        );
    let port = config.get_ports().first().copied().unwrap_or(5432);
    format!(
        "{}@{host}:{port}/{}",
        config.get_user().unwrap_or("<default>"),
        config.get_dbname().unwrap_or("<default>")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_strings() {
        let cfg = parse_connection_string(
            "host=localhost port=5433 dbname=testdb user=testuser password=testpass",
        )
        .unwrap();
        assert_eq!(cfg.get_dbname(), Some("testdb"));
        assert_eq!(cfg.get_ports(), &[5433]);
        assert_eq!(describe(&cfg), "testuser@localhost:5433/testdb");
    }

    #[test]
    fn parses_urls() {
        let cfg = parse_connection_string("postgres://u:p@db.example:6000/app").unwrap();
        assert_eq!(describe(&cfg), "u@db.example:6000/app");
    }

    #[test]
    fn rejects_garbage_without_echoing_it() {
        let err = parse_connection_string("host=localhost port=notaport password=hunter2")
            .unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
        assert!(!err.to_string().contains("hunter2"));
    }
}
