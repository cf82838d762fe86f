//! Transactions: the model, its database table, CSV parsing and the endpoints
//! for uploading and clearing a user's transactions.

mod clear_endpoint;
mod core;
mod csv_import;
mod upload;

pub use clear_endpoint::clear_transactions;
pub use core::{
    NewTransaction, Transaction, count_transactions, create_transaction, create_transaction_table,
    delete_transactions_by_user, get_transactions_by_user, import_transactions, save_anomalies,
};
pub use csv_import::{DEFAULT_CATEGORY, DEFAULT_RECIPIENT, parse_transactions_csv};
pub use upload::upload_transactions;
