//! The endpoint for deleting all of a user's transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{AppState, Error, auth::UserID, transaction::delete_transactions_by_user};

/// The state needed for clearing transactions.
#[derive(Debug, Clone)]
pub struct ClearState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ClearState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Route handler that deletes every transaction belonging to the user.
pub async fn clear_transactions(
    State(state): State<ClearState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let result = state
        .db_connection
        .lock()
        .map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
        .and_then(|connection| delete_transactions_by_user(user_id, &connection));

    match result {
        Ok(deleted) => {
            tracing::info!("Deleted {deleted} transactions for user {user_id}");
            Json(json!({ "success": true, "deleted": deleted })).into_response()
        }
        Err(error) => error.into_json_response(),
    }
}
