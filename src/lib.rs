//! Fintrack is a web app for tracking personal finances.
//!
//! Users upload their transactions as CSV files, and the server stores them,
//! flags unusual transactions and renders charts of where the money went.
//!
//! This library provides a REST API that serves HTML pages and JSON documents.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod anomaly;
mod app_state;
mod auth;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod html;
mod internal_server_error;
mod logging;
mod not_found;
mod report;
mod routing;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use anomaly::{AnomalyReason, Statistics, detect_anomalies, population_statistics};
pub use app_state::AppState;
pub use auth::{PasswordHash, User, UserID, ValidatedPassword, create_user};
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use routing::build_router;
pub use transaction::{
    NewTransaction, Transaction, count_transactions, create_transaction, get_transactions_by_user,
    import_transactions, save_anomalies,
};

use crate::{internal_server_error::InternalServerError, not_found::get_404_not_found_response};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The email and password combination did not match a registered user.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The email address is already used by another user.
    #[error("Email already registered")]
    DuplicateEmail,

    /// The password and its confirmation did not match during registration.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// A required form field was left empty.
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    /// Either the user ID or expiry cookie is missing from the cookie jar in
    /// the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    #[error("could not read or create the cookie expiry date")]
    CookieDateError,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The multipart form could not be read.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form did not contain a field named "file".
    #[error("No file uploaded")]
    NoFileUploaded,

    /// The file field was present but no file was chosen.
    #[error("No file selected")]
    NoFileSelected,

    /// The CSV had issues that prevented it from being parsed.
    #[error("Could not parse the CSV file: {0}")]
    InvalidCSV(String),

    /// A chart or report was requested but the user has no transactions.
    #[error("No transaction data available")]
    NoTransactionData,

    /// The body of a JSON request could not be read.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The requested chart ID is not one of the supported charts.
    #[error("Unknown chart \"{0}\"")]
    UnknownChart(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Whether the error was caused by the request rather than the server.
    fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidCredentials
                | Error::DuplicateEmail
                | Error::PasswordMismatch
                | Error::EmptyField(_)
                | Error::TooWeak(_)
                | Error::MultipartError(_)
                | Error::NoFileUploaded
                | Error::NoFileSelected
                | Error::InvalidCSV(_)
                | Error::NoTransactionData
                | Error::InvalidRequest(_)
                | Error::UnknownChart(_)
        )
    }

    /// Convert the error into a JSON response for the API endpoints.
    ///
    /// Client errors are returned with their message and a 400 status code.
    /// Everything else is logged and replaced with a generic message and a 500 status code.
    fn into_json_response(self) -> Response {
        let (status, message) = match self {
            Error::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            error if error.is_client_error() => (StatusCode::BAD_REQUEST, error.to_string()),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred, check the server logs for more details."
                        .to_owned(),
                )
            }
        };

        (status, Json(json!({ "error": message, "status": "error" }))).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::http::StatusCode;

    use crate::Error;

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn client_error_keeps_message() {
        let response = Error::NoTransactionData.into_json_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "No transaction data available");
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn internal_error_hides_details() {
        let response = Error::DatabaseLockError.into_json_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_ne!(body["error"], Error::DatabaseLockError.to_string());
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        assert_eq!(
            Error::from(rusqlite::Error::QueryReturnedNoRows),
            Error::NotFound
        );
    }
}
