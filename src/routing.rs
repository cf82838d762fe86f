//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{delete, get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_api, get_log_in_page, get_log_out, get_register_page, post_log_in,
        register_user,
    },
    dashboard::{download_report, get_dashboard_data, get_dashboard_page, visualize},
    endpoints,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    report::generate_report,
    transaction::{clear_transactions, upload_transactions},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // The JSON endpoints answer with a JSON error instead of redirecting to the log-in page.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::UPLOAD, post(upload_transactions))
            .route(endpoints::TRANSACTIONS_API, delete(clear_transactions))
            .route(endpoints::DASHBOARD_DATA, get(get_dashboard_data))
            .route(endpoints::VISUALIZE, post(visualize))
            .route(endpoints::DOWNLOAD_REPORT, post(download_report))
            .route(endpoints::REPORT, post(generate_report))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_api)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}
