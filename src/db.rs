//! Creates the application's database schema.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{auth::create_user_table, transaction::create_transaction_table};

/// Create the tables for the domain models if they do not exist yet.
///
/// All tables are created in a single exclusive transaction, so either every
/// table exists afterwards or none of them were added.
///
/// # Errors
/// Returns an error if a table cannot be created or there is some other SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod initialize_tests {
    use rusqlite::Connection;

    use super::initialize;

    fn table_names(connection: &Connection) -> Vec<String> {
        connection
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn creates_tables() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        let tables = table_names(&connection);
        assert!(tables.contains(&"user".to_owned()), "got tables {tables:?}");
        assert!(
            tables.contains(&"transaction".to_owned()),
            "got tables {tables:?}"
        );
    }

    #[test]
    fn can_run_twice() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        assert!(initialize(&connection).is_ok());
    }
}
