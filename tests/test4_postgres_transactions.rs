#![cfg(feature = "test-utils")]

use pg_session_manager::prelude::*;
use pg_session_manager::test_utils::postgres::{setup_postgres_embedded, stop_postgres_embedded};

fn count(db: &DatabaseManager) -> i64 {
    let result = db.select_query("SELECT count(*) AS n FROM tx").unwrap();
    result.rows().unwrap()[0].get("n").unwrap().to_int()
}

#[test]
fn test4_postgres_commit_and_rollback() -> Result<(), Box<dyn std::error::Error>> {
    let pg = setup_postgres_embedded("tx_db")?;
    let db = DatabaseManager::new();
    assert!(db.set_mode(BackendKind::Postgres));
    assert!(db.connect(&pg.connection_string));
    assert!(db.create_query("CREATE TABLE tx (id INT PRIMARY KEY)"));

    assert!(db.begin_transaction());
    assert!(!db.begin_transaction());
    assert_eq!(db.insert_query("INSERT INTO tx VALUES (1)"), 1);
    assert!(db.rollback_transaction());
    assert_eq!(count(&db), 0);

    assert!(db.begin_transaction());
    assert_eq!(db.insert_query("INSERT INTO tx VALUES (1), (2)"), 2);
    assert!(db.commit_transaction());
    assert_eq!(count(&db), 2);

    assert!(!db.commit_transaction());
    assert!(!db.rollback_transaction());

    assert!(db.disconnect());
    stop_postgres_embedded(pg);
    Ok(())
}

#[test]
fn test4_postgres_failed_statement_aborts_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let pg = setup_postgres_embedded("tx_abort_db")?;
    let db = DatabaseManager::new();
    assert!(db.set_mode(BackendKind::Postgres));
    assert!(db.connect(&pg.connection_string));
    assert!(db.create_query("CREATE TABLE tx (id INT PRIMARY KEY)"));

    assert!(db.begin_transaction());
    assert_eq!(db.insert_query("INSERT INTO tx VALUES (1)"), 1);
    assert_eq!(db.insert_query("INSERT INTO tx VALUES (1)"), 0);
    // the block is aborted but the connection itself is healthy
    assert!(db.test_connection());
    assert!(db.is_in_transaction());
    assert!(matches!(
        db.try_commit_transaction(),
        Err(DbError::TransactionAborted)
    ));
    assert_eq!(db.transaction_state(), TransactionState::Idle);

    // the session is usable again and nothing from the block survived
    assert_eq!(count(&db), 0);

    assert!(db.begin_transaction());
    assert_eq!(db.insert_query("INSERT INTO tx VALUES (5)"), 1);
    assert!(db.disconnect(), "disconnect drops the open transaction");
    assert!(db.connect(&pg.connection_string));
    assert!(!db.is_in_transaction());
    assert_eq!(count(&db), 0);

    assert!(db.disconnect());
    stop_postgres_embedded(pg);
    Ok(())
}
