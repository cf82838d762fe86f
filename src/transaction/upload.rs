//! The endpoint for uploading a CSV file of transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error,
    anomaly::detect_anomalies,
    auth::UserID,
    transaction::{
        NewTransaction, get_transactions_by_user, import_transactions,
        parse_transactions_csv, save_anomalies,
    },
};

/// The name of the multipart form field that holds the CSV file.
const FILE_FIELD: &str = "file";

/// The state needed for uploading transactions.
#[derive(Debug, Clone)]
pub struct UploadState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UploadState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The outcome of a successful upload.
#[derive(Debug, PartialEq)]
struct UploadSummary {
    /// How many rows were added from the file.
    imported: usize,
    /// How many of the user's transactions are flagged after the upload.
    anomalies: usize,
}

/// Route handler for uploading a CSV file of transactions.
///
/// The rows are stored and then all of the user's transactions are checked
/// for anomalies again, since new rows change the statistics of the whole set.
pub async fn upload_transactions(
    State(state): State<UploadState>,
    Extension(user_id): Extension<UserID>,
    multipart: Multipart,
) -> Response {
    let start_time = std::time::Instant::now();

    let csv_text = match read_csv_field(multipart).await {
        Ok(text) => text,
        Err(error) => return error.into_json_response(),
    };

    let result = parse_transactions_csv(&csv_text, user_id)
        .inspect_err(|error| tracing::debug!("Failed to parse CSV: {error}"))
        .and_then(|transactions| store_and_annotate(transactions, user_id, &state));

    match result {
        Ok(summary) => {
            tracing::info!(
                "Imported {} transactions for user {user_id} in {}ms, {} anomalies",
                summary.imported,
                start_time.elapsed().as_millis(),
                summary.anomalies
            );

            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": "Data uploaded successfully",
                    "imported": summary.imported,
                    "anomalies": summary.anomalies,
                })),
            )
                .into_response()
        }
        Err(error) => error.into_json_response(),
    }
}

/// Read the text of the file field from `multipart`.
///
/// # Errors
/// Returns [Error::NoFileUploaded] if there is no file field,
/// [Error::NoFileSelected] if the field has no file name, or
/// [Error::MultipartError] if the form cannot be read.
async fn read_csv_field(mut multipart: Multipart) -> Result<String, Error> {
    while let Some(field) = multipart.next_field().await.map_err(|error| {
        tracing::error!("Could not read multipart form field: {error}");
        Error::MultipartError(error.to_string())
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        match field.file_name() {
            None | Some("") => return Err(Error::NoFileSelected),
            Some(file_name) => tracing::debug!("Reading uploaded file {file_name}"),
        }

        return field.text().await.map_err(|error| {
            tracing::error!("Could not read data from multipart form field: {error}");
            Error::MultipartError(error.to_string())
        });
    }

    Err(Error::NoFileUploaded)
}

/// Insert `transactions` and re-run the anomaly detector over all of the
/// transactions of `user_id`, as one SQL transaction.
fn store_and_annotate(
    transactions: Vec<NewTransaction>,
    user_id: UserID,
    state: &UploadState,
) -> Result<UploadSummary, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let sql_transaction = connection
        .unchecked_transaction()
        .inspect_err(|error| tracing::error!("could not start transaction: {error}"))?;

    let imported = import_transactions(transactions, &sql_transaction)?.len();

    let mut existing = get_transactions_by_user(user_id, &sql_transaction)?;
    existing.iter_mut().for_each(|transaction| transaction.clear_anomaly());
    let annotated = detect_anomalies(existing);
    save_anomalies(&annotated, &sql_transaction)?;

    sql_transaction
        .commit()
        .inspect_err(|error| tracing::error!("could not commit transaction: {error}"))?;

    Ok(UploadSummary {
        imported,
        anomalies: annotated.iter().filter(|t| t.is_anomaly).count(),
    })
}
