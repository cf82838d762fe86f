//! JSON reports over a user's transactions.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Form, Json,
    extract::{FromRef, State, rejection::FormRejection},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error,
    anomaly::AnomalyReason,
    auth::UserID,
    dashboard::category_totals,
    transaction::{Transaction, get_transactions_by_user},
};

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The state needed for generating reports.
#[derive(Debug, Clone)]
pub struct ReportState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form for requesting a report.
#[derive(Debug, Default, Deserialize)]
pub struct ReportForm {
    /// One of "summary" or "anomalies", defaults to "summary".
    #[serde(default)]
    pub report_type: Option<String>,
}

/// A flagged transaction as listed in the anomaly report.
#[derive(Debug, PartialEq, Serialize)]
struct AnomalyEntry {
    date: String,
    amount: f64,
    recipient: Option<String>,
    reason: Option<AnomalyReason>,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
enum Report {
    #[serde(rename = "Summary Report")]
    Summary {
        total_transactions: usize,
        total_amount: f64,
        average_amount: f64,
        categories: BTreeMap<String, f64>,
        anomalies_count: usize,
    },
    #[serde(rename = "Anomaly Report")]
    Anomalies { anomalies: Vec<AnomalyEntry> },
    #[serde(rename = "Custom Report")]
    Custom { message: &'static str },
}

impl Report {
    fn build(report_type: &str, transactions: &[Transaction]) -> Self {
        match report_type {
            "summary" => summary_report(transactions),
            "anomalies" => Report::Anomalies {
                anomalies: transactions
                    .iter()
                    .filter(|t| t.is_anomaly)
                    .map(|t| AnomalyEntry {
                        date: t.date.date().format(DATE_FORMAT).unwrap_or_default(),
                        amount: t.amount,
                        recipient: t.recipient.clone(),
                        reason: t.anomaly_reason,
                    })
                    .collect(),
            },
            _ => Report::Custom {
                message: "Custom report generated",
            },
        }
    }
}

fn summary_report(transactions: &[Transaction]) -> Report {
    let total_amount: f64 = transactions.iter().map(|t| t.amount).sum();
    let average_amount = if transactions.is_empty() {
        0.0
    } else {
        total_amount / transactions.len() as f64
    };

    Report::Summary {
        total_transactions: transactions.len(),
        total_amount,
        average_amount,
        categories: category_totals(transactions),
        anomalies_count: transactions.iter().filter(|t| t.is_anomaly).count(),
    }
}

/// Route handler that generates the report named by the `report_type` form field.
pub async fn generate_report(
    State(state): State<ReportState>,
    Extension(user_id): Extension<UserID>,
    form: Result<Form<ReportForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return Error::InvalidRequest(rejection.body_text()).into_json_response(),
    };
    let report_type = form.report_type.as_deref().unwrap_or("summary");

    let transactions = state
        .db_connection
        .lock()
        .map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
        .and_then(|connection| get_transactions_by_user(user_id, &connection));

    match transactions {
        Ok(transactions) => {
            tracing::debug!("Generating {report_type} report for user {user_id}");
            Json(Report::build(report_type, &transactions)).into_response()
        }
        Err(error) => error.into_json_response(),
    }
}
