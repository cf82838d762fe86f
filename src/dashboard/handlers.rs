//! Dashboard HTTP handlers and view rendering.
//!
//! This module contains:
//! - The route handler for displaying the dashboard
//! - HTML view functions for rendering the dashboard UI
//! - The state shared by the dashboard handlers

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    dashboard::{
        aggregation::summarize,
        cards::summary_cards_view,
        charts::{
            ChartId, ChartType, DashboardChart, build_chart, charts_script, charts_view,
            transactions_chart,
        },
        tables::transactions_table,
    },
    endpoints,
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        HeadElement, PAGE_CONTAINER_STYLE, base, link,
    },
    transaction::{Transaction, get_transactions_by_user},
};

/// The state needed for the dashboard page and its JSON endpoints.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

impl DashboardState {
    /// Get all of the transactions of `user_id`, oldest first.
    pub(super) fn transactions(&self, user_id: UserID) -> Result<Vec<Transaction>, Error> {
        let connection = self
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_transactions_by_user(user_id, &connection)
            .inspect_err(|error| tracing::error!("could not get transactions: {error}"))
    }
}

/// Display a page with an overview of the user's transactions.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let transactions = state.transactions(user_id)?;

    if transactions.is_empty() {
        return Ok(dashboard_no_data_view().into_response());
    }

    let charts = build_dashboard_charts(&transactions);
    Ok(dashboard_view(&transactions, &charts).into_response())
}

/// Creates the dashboard charts from transaction data.
///
/// The transactions chart comes first, followed by every chart that can be
/// requested by ID with the default chart type.
fn build_dashboard_charts(transactions: &[Transaction]) -> Vec<DashboardChart> {
    let mut charts = vec![DashboardChart {
        id: "transactions-chart".to_owned(),
        options: transactions_chart(transactions).to_string(),
    }];

    charts.extend(ChartId::ALL.into_iter().map(|chart_id| DashboardChart {
        id: format!("{}-chart", chart_id.as_str()),
        options: build_chart(chart_id, ChartType::default(), transactions).to_string(),
    }));

    charts
}

fn page_header() -> Markup {
    html! {
        header class="w-full flex justify-between items-baseline mb-6" {
            h1 class="text-2xl font-bold" { "Dashboard" }
            (link(endpoints::LOG_OUT, "Log out"))
        }
    }
}

/// The form for uploading a CSV file, submitted by `dashboard.js`.
fn upload_form() -> Markup {
    html! {
        section class="w-full mb-8" {
            h3 class="text-xl font-semibold mb-4" { "Upload Transactions" }

            form
                id="upload-form"
                data-endpoint=(endpoints::UPLOAD)
                enctype="multipart/form-data"
                class="flex flex-col sm:flex-row gap-4 items-end"
            {
                div class="w-full" {
                    label for="file" class=(FORM_LABEL_STYLE) { "CSV file" }
                    input
                        type="file"
                        name="file"
                        id="file"
                        accept=".csv,text/csv"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                button type="submit" class={(BUTTON_PRIMARY_STYLE) " sm:w-auto"} { "Upload" }
            }

            p id="upload-status" class="mt-2 text-sm" {}
        }
    }
}

/// Buttons for the report, download and clear endpoints, handled by `dashboard.js`.
fn actions_view() -> Markup {
    html! {
        section class="w-full mb-8" {
            h3 class="text-xl font-semibold mb-4" { "Reports" }

            div class="flex flex-col sm:flex-row gap-4 items-end" {
                form id="report-form" data-endpoint=(endpoints::REPORT) class="flex gap-2 items-end" {
                    div {
                        label for="report-type" class=(FORM_LABEL_STYLE) { "Report type" }
                        select id="report-type" name="report_type" class=(FORM_TEXT_INPUT_STYLE) {
                            option value="summary" selected { "Summary" }
                            option value="anomalies" { "Anomalies" }
                        }
                    }

                    button type="submit" class={(BUTTON_PRIMARY_STYLE) " w-auto"} { "Generate" }
                }

                button
                    id="download-report"
                    type="button"
                    data-endpoint=(endpoints::DOWNLOAD_REPORT)
                    class={(BUTTON_PRIMARY_STYLE) " sm:w-auto"}
                {
                    "Download Charts"
                }

                button
                    id="clear-transactions"
                    type="button"
                    data-endpoint=(endpoints::TRANSACTIONS_API)
                    class=(BUTTON_DELETE_STYLE)
                {
                    "Delete all transactions"
                }
            }

            pre id="report-output" class="mt-4 text-sm overflow-x-auto hidden" {}
        }
    }
}

/// Renders the dashboard page when the user has no transactions.
fn dashboard_no_data_view() -> Markup {
    let content = html!(
        div class=(PAGE_CONTAINER_STYLE)
        {
            (page_header())

            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p class="mb-8"
            {
                "Charts will show up here once you upload some transactions."
            }

            (upload_form())
        }
    );

    let scripts = [HeadElement::ScriptLink("/static/dashboard.js".to_owned())];

    base("Dashboard", &scripts, &content)
}

/// Renders the main dashboard page with cards, charts and the transactions table.
fn dashboard_view(transactions: &[Transaction], charts: &[DashboardChart]) -> Markup {
    let content = html!(
        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            (page_header())
            (summary_cards_view(&summarize(transactions)))
            (upload_form())
            (charts_view(charts))
            (actions_view())
            (transactions_table(transactions))
        }
    );

    let scripts = [
        HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
        HeadElement::ScriptLink("/static/dashboard.js".to_owned()),
        charts_script(charts),
    ];

    base("Dashboard", &scripts, &content)
}
