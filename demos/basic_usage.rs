//! Connection manager walkthrough against a running PostgreSQL server.
//!
//! Run with:
//! cargo run --example basic_usage -- --host localhost --dbname postgres --user postgres --password secret
//!
//! Set `RUST_LOG=debug` for per-statement logging and `PG_SESSION_DEBUG=1` for connect
//! diagnostics.

use clap::Parser;
use pg_session_manager::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Exercise the blocking database manager")]
struct Args {
    #[arg(long, value_enum, default_value_t = BackendKind::Postgres)]
    backend: BackendKind,

    /// Full connection string; overrides the individual settings below
    #[arg(long)]
    connection_string: Option<String>,

    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(long, default_value_t = 5432)]
    port: u16,

    #[arg(long, default_value = "postgres")]
    dbname: String,

    #[arg(long, default_value = "postgres")]
    user: String,

    #[arg(long, env = "PGPASSWORD", default_value = "")]
    password: String,
}

impl Args {
    fn connection_string(&self) -> String {
        self.connection_string.clone().unwrap_or_else(|| {
            format!(
                "host={} port={} dbname={} user={} password='{}'",
                self.host, self.port, self.dbname, self.user, self.password
            )
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let db = DatabaseManager::handle();

    db.try_set_mode(args.backend)?;
    db.try_connect(&args.connection_string())?;
    println!("connected (session {:?})", db.session_id());
    println!("healthy: {}", db.test_connection());

    db.try_create_query(
        "DROP TABLE IF EXISTS demo_people;
         CREATE TABLE demo_people (id SERIAL PRIMARY KEY, name VARCHAR(32), age INT)",
    )?;

    let inserted = db.insert_query("INSERT INTO demo_people(name, age) VALUES ('A', 10), ('B', 20)");
    println!("inserted {inserted} rows");

    let updated = db.update_query("UPDATE demo_people SET age = age + 1 WHERE name = 'Nonexistent'");
    println!("updated {updated} rows");

    if let Some(result) = db.select_query("SELECT * FROM demo_people ORDER BY id") {
        for row in result.rows()? {
            println!("{row}");
        }
    }

    // A rolled back insert is invisible afterwards
    db.try_begin_transaction()?;
    db.try_insert_query("INSERT INTO demo_people(name, age) VALUES ('C', 30)")?;
    db.try_rollback_transaction()?;

    // so is everything in a block where a statement failed
    db.try_begin_transaction()?;
    db.insert_query("INSERT INTO demo_people(name, age) VALUES ('D', 40)");
    db.insert_query("INSERT INTO demo_people(id, name) VALUES (1, 'duplicate')");
    match db.try_commit_transaction() {
        Err(DbError::TransactionAborted) => println!("aborted block was rolled back"),
        other => println!("unexpected commit outcome: {other:?}"),
    }

    let result = db.try_select_query("SELECT count(*) AS n FROM demo_people")?;
    println!("row count: {}", result.rows()?[0].get("n").map_or(0, Value::to_int));

    db.try_reconnect()?;
    println!("reconnected (session {:?})", db.session_id());

    db.try_create_query("DROP TABLE demo_people")?;
    db.try_disconnect()?;
    println!("disconnected; healthy: {}", db.test_connection());
    Ok(())
}
