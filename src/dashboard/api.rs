//! JSON endpoints for the dashboard summary and charts.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::{
    Error,
    auth::UserID,
    dashboard::{
        aggregation::summarize,
        charts::{ChartId, ChartType, build_chart, chart_to_json, transactions_chart},
        handlers::DashboardState,
    },
};

/// The body of a request for a single chart.
#[derive(Debug, Deserialize)]
pub struct VisualizeRequest {
    #[serde(default)]
    pub chart_id: String,
    #[serde(default)]
    pub chart_type: ChartType,
}

/// Get the dashboard totals and the chart of all transactions.
pub async fn get_dashboard_data(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let result = state.transactions(user_id).and_then(|transactions| {
        let summary = summarize(&transactions);
        let chart = chart_to_json(&transactions_chart(&transactions))?;

        Ok(json!({
            "transaction_count": summary.transaction_count,
            "total_amount": summary.total_amount,
            "anomaly_count": summary.anomaly_count,
            "chart": chart,
        }))
    });

    match result {
        Ok(body) => Json(body).into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// Get the ECharts options for one chart.
pub async fn visualize(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    request: Result<Json<VisualizeRequest>, JsonRejection>,
) -> Response {
    let result = request
        .map_err(|rejection| Error::InvalidRequest(rejection.body_text()))
        .and_then(|Json(request)| {
            let transactions = state.transactions(user_id)?;

            if transactions.is_empty() {
                return Err(Error::NoTransactionData);
            }

            let chart_id: ChartId = request.chart_id.parse()?;
            chart_to_json(&build_chart(chart_id, request.chart_type, &transactions))
        });

    match result {
        Ok(chart) => Json(json!({ "chart": chart, "status": "success" })).into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// Get the options for every chart at once, with `null` for charts without data.
pub async fn download_report(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let result = state.transactions(user_id).and_then(|transactions| {
        let mut charts = Map::new();

        for chart_id in ChartId::ALL {
            let chart = if transactions.is_empty() {
                Value::Null
            } else {
                chart_to_json(&build_chart(chart_id, ChartType::default(), &transactions))?
            };

            charts.insert(chart_id.as_str().replace('-', "_"), chart);
        }

        Ok(charts)
    });

    match result {
        Ok(charts) => Json(json!({ "success": true, "charts": charts })).into_response(),
        Err(error) => error.into_json_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Router, middleware::from_fn, routing::post};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};
    use time::macros::datetime;

    use crate::{
        PasswordHash, UserID,
        auth::create_user,
        db::initialize,
        endpoints,
        transaction::{Transaction, import_transactions},
    };

    use super::{DashboardState, download_report, get_dashboard_data, visualize};

    fn get_state_and_user() -> (DashboardState, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            "Test User",
            "test@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .unwrap();

        (
            DashboardState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            user.id,
        )
    }

    fn add_transactions(state: &DashboardState, user_id: UserID) {
        let mut transactions: Vec<_> = (1..=6)
            .map(|day| {
                Transaction::build(
                    user_id,
                    10.0,
                    datetime!(2025-01-01 9:00) + time::Duration::days(day),
                )
                .category("Food")
                .recipient("Cafe")
            })
            .collect();
        transactions.push(
            Transaction::build(user_id, 1000.0, datetime!(2025-01-10 18:30))
                .category("Rent")
                .recipient("Landlord"),
        );

        let connection = state.db_connection.lock().unwrap();
        let imported = import_transactions(transactions, &connection).unwrap();
        let annotated = crate::detect_anomalies(imported);
        crate::save_anomalies(&annotated, &connection).unwrap();
    }

    fn get_test_server(state: DashboardState, user_id: UserID) -> TestServer {
        let app = Router::new()
            .route(endpoints::DASHBOARD_DATA, axum::routing::get(get_dashboard_data))
            .route(endpoints::VISUALIZE, post(visualize))
            .route(endpoints::DOWNLOAD_REPORT, post(download_report))
            .layer(Extension(user_id))
            .layer(from_fn(crate::logging_middleware))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn dashboard_data_with_no_transactions() {
        let (state, user_id) = get_state_and_user();
        let server = get_test_server(state, user_id);

        let response = server.get(endpoints::DASHBOARD_DATA).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["transaction_count"], 0);
        assert_eq!(body["total_amount"], 0.0);
        assert_eq!(body["anomaly_count"], 0);
        assert_eq!(body["chart"]["title"][0]["text"], "No Data Available");
    }

    #[tokio::test]
    async fn dashboard_data_with_transactions() {
        let (state, user_id) = get_state_and_user();
        add_transactions(&state, user_id);
        let server = get_test_server(state, user_id);

        let response = server.get(endpoints::DASHBOARD_DATA).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["transaction_count"], 7);
        assert_eq!(body["total_amount"], 1060.0);
        // The six transactions to Cafe are frequent and the rent is a high amount.
        assert_eq!(body["anomaly_count"], 7);
        assert_eq!(body["chart"]["title"][0]["text"], "Your Transactions");
    }

    #[tokio::test]
    async fn visualize_returns_requested_chart() {
        let (state, user_id) = get_state_and_user();
        add_transactions(&state, user_id);
        let server = get_test_server(state, user_id);

        let response = server
            .post(endpoints::VISUALIZE)
            .json(&json!({ "chart_id": "top-items", "chart_type": "bar" }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "success");
        assert_eq!(body["chart"]["series"][0]["type"], "bar");
        assert_eq!(body["chart"]["xAxis"]["data"], json!(["Rent", "Food"]));
    }

    #[tokio::test]
    async fn visualize_defaults_to_line() {
        let (state, user_id) = get_state_and_user();
        add_transactions(&state, user_id);
        let server = get_test_server(state, user_id);

        let response = server
            .post(endpoints::VISUALIZE)
            .json(&json!({ "chart_id": "revenue" }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["chart"]["series"][0]["type"], "line");
    }

    #[tokio::test]
    async fn visualize_fails_without_transactions() {
        let (state, user_id) = get_state_and_user();
        let server = get_test_server(state, user_id);

        let response = server
            .post(endpoints::VISUALIZE)
            .json(&json!({ "chart_id": "revenue", "chart_type": "line" }))
            .await;

        response.assert_status_bad_request();
        response.assert_json(&json!({
            "error": "No transaction data available",
            "status": "error",
        }));
    }

    #[tokio::test]
    async fn visualize_fails_on_unknown_chart() {
        let (state, user_id) = get_state_and_user();
        add_transactions(&state, user_id);
        let server = get_test_server(state, user_id);

        let response = server
            .post(endpoints::VISUALIZE)
            .json(&json!({ "chart_id": "menu-items" }))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().unwrap().contains("menu-items"));
    }

    #[tokio::test]
    async fn visualize_fails_on_invalid_chart_type() {
        let (state, user_id) = get_state_and_user();
        add_transactions(&state, user_id);
        let server = get_test_server(state, user_id);

        let response = server
            .post(endpoints::VISUALIZE)
            .json(&json!({ "chart_id": "revenue", "chart_type": "scatter" }))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn download_report_has_null_charts_without_data() {
        let (state, user_id) = get_state_and_user();
        let server = get_test_server(state, user_id);

        let response = server.post(endpoints::DOWNLOAD_REPORT).await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "success": true,
            "charts": {
                "revenue": null,
                "top_items": null,
                "heatmap": null,
                "payment_methods": null,
            },
        }));
    }

    #[tokio::test]
    async fn download_report_has_every_chart() {
        let (state, user_id) = get_state_and_user();
        add_transactions(&state, user_id);
        let server = get_test_server(state, user_id);

        let response = server.post(endpoints::DOWNLOAD_REPORT).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        for key in ["revenue", "top_items", "heatmap", "payment_methods"] {
            assert!(body["charts"][key].is_object(), "want chart {key}");
        }
    }
}
