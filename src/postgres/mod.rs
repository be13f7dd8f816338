// PostgreSQL module - the one backend with a session implementation
//
// - config: connection string parsing and log-safe descriptions
// - numeric: NUMERIC wire decoding
// - query: row materialization into value containers
// - session: the blocking connection itself
// - temporal: timestamp/date decoding that tolerates infinities

pub mod config;
pub mod numeric;
pub mod query;
pub mod session;
pub mod temporal;

pub use config::parse_connection_string;
pub use query::{ColumnKind, build_result_container, build_row_container, extract_value};
pub use session::PgSession;
