//! Defines the core data models and database queries for transactions.

use rusqlite::{Connection, Row};
use time::PrimitiveDateTime;

use crate::{Error, anomaly::AnomalyReason, auth::UserID, database_id::TransactionId};

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build] and [create_transaction].
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// When the transaction happened.
    pub date: PrimitiveDateTime,
    /// The amount of money spent or earned in this transaction.
    pub amount: f64,
    /// A label for what kind of transaction this is, e.g. "Groceries".
    pub category: Option<String>,
    /// A text description of what the transaction was for.
    pub description: String,
    /// Who the money was paid to or received from.
    pub recipient: Option<String>,
    /// Whether the transaction was flagged as unusual.
    pub is_anomaly: bool,
    /// Why the transaction was flagged, if it was.
    pub anomaly_reason: Option<AnomalyReason>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [NewTransaction] for discoverability.
    pub fn build(user_id: UserID, amount: f64, date: PrimitiveDateTime) -> NewTransaction {
        NewTransaction {
            user_id,
            date,
            amount,
            category: None,
            description: String::new(),
            recipient: None,
        }
    }

    /// Mark the transaction as an anomaly, replacing any previous reason.
    pub fn flag(&mut self, reason: AnomalyReason) {
        self.is_anomaly = true;
        self.anomaly_reason = Some(reason);
    }

    /// Remove the anomaly flag and reason.
    pub fn clear_anomaly(&mut self) {
        self.is_anomaly = false;
        self.anomaly_reason = None;
    }
}

/// A transaction that has not been saved to the database yet.
///
/// # Examples
///
/// ```ignore
/// use time::macros::datetime;
///
/// let transaction = Transaction::build(user_id, -45.99, datetime!(2025-01-15 0:00))
///     .category("Coffee")
///     .recipient("Birdy Bytes");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The user that owns the transaction.
    pub user_id: UserID,

    /// When the transaction happened.
    ///
    /// CSV imports without a time of day are stored at midnight.
    pub date: PrimitiveDateTime,

    /// The monetary amount of the transaction.
    ///
    /// Must be finite. Positive and negative values are both accepted and are
    /// treated the same way by the charts and the anomaly detector.
    pub amount: f64,

    /// A label for what kind of transaction this is, e.g. "Groceries".
    pub category: Option<String>,

    /// A human-readable description of the transaction.
    pub description: String,

    /// Who the money was paid to or received from.
    pub recipient: Option<String>,
}

impl NewTransaction {
    /// Set the category of the transaction.
    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_owned());
        self
    }

    /// Set the description of the transaction.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Set the recipient of the transaction.
    pub fn recipient(mut self, recipient: &str) -> Self {
        self.recipient = Some(recipient.to_owned());
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const INSERT_TRANSACTION_SQL: &str = "INSERT INTO \"transaction\"
        (user_id, date, amount, category, description, recipient)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     RETURNING id, user_id, date, amount, category, description, recipient, is_anomaly, anomaly_reason";

/// Create a new transaction in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error,
/// e.g. the user does not exist.
pub fn create_transaction(
    transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(INSERT_TRANSACTION_SQL)?
        .query_row(
            (
                transaction.user_id.as_i64(),
                transaction.date,
                transaction.amount,
                transaction.category,
                transaction.description,
                transaction.recipient,
            ),
            map_transaction_row,
        )
        .map_err(|error| error.into())
}

/// Insert many transactions at once.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn import_transactions(
    transactions: Vec<NewTransaction>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    // Prepare the insert statement once for reuse
    let mut stmt = connection.prepare(INSERT_TRANSACTION_SQL)?;
    let mut imported = Vec::with_capacity(transactions.len());

    for transaction in transactions {
        let transaction = stmt.query_row(
            (
                transaction.user_id.as_i64(),
                transaction.date,
                transaction.amount,
                transaction.category,
                transaction.description,
                transaction.recipient,
            ),
            map_transaction_row,
        )?;

        imported.push(transaction);
    }

    Ok(imported)
}

/// Get all of the transactions belonging to `user_id`, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_transactions_by_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, date, amount, category, description, recipient, is_anomaly, anomaly_reason
             FROM \"transaction\"
             WHERE user_id = :user_id
             ORDER BY date ASC, id ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| error.into())
}

/// Delete all of the transactions belonging to `user_id`.
///
/// Returns the number of deleted transactions.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn delete_transactions_by_user(user_id: UserID, connection: &Connection) -> Result<usize, Error> {
    connection
        .execute(
            "DELETE FROM \"transaction\" WHERE user_id = ?1",
            (user_id.as_i64(),),
        )
        .map_err(|error| error.into())
}

/// Save the anomaly flag and reason of each transaction in `transactions`.
///
/// Only the anomaly columns are written, the rest of the row is left as is.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn save_anomalies(transactions: &[Transaction], connection: &Connection) -> Result<(), Error> {
    let mut stmt = connection.prepare(
        "UPDATE \"transaction\" SET is_anomaly = ?1, anomaly_reason = ?2 WHERE id = ?3",
    )?;

    for transaction in transactions {
        stmt.execute((
            transaction.is_anomaly,
            transaction.anomaly_reason,
            transaction.id,
        ))?;
    }

    Ok(())
}

/// Get the number of transactions belonging to `user_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(user_id: UserID, connection: &Connection) -> Result<usize, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM \"transaction\" WHERE user_id = ?1;",
        (user_id.as_i64(),),
        |row| row.get(0),
    )?;

    // COUNT is never negative.
    Ok(count as usize)
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT,
                description TEXT NOT NULL DEFAULT '',
                recipient TEXT,
                is_anomaly INTEGER NOT NULL DEFAULT 0,
                anomaly_reason TEXT,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        date: row.get(2)?,
        amount: row.get(3)?,
        category: row.get(4)?,
        description: row.get(5)?,
        recipient: row.get(6)?,
        is_anomaly: row.get(7)?,
        anomaly_reason: row.get(8)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
