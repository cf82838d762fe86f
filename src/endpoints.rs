//! The API endpoints URIs.

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/log_out";
/// The route to access users.
pub const USERS: &str = "/api/users";
/// The route to access the current user's transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to upload CSV files of transactions.
pub const UPLOAD: &str = "/upload";
/// The route for the summary numbers and the transactions chart.
pub const DASHBOARD_DATA: &str = "/dashboard-data";
/// The route for generating a single chart.
pub const VISUALIZE: &str = "/visualize";
/// The route for generating all charts at once.
pub const DOWNLOAD_REPORT: &str = "/download-report";
/// The route for generating a JSON report.
pub const REPORT: &str = "/report";

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ROOT);
        assert_endpoint_is_valid_uri(endpoints::DASHBOARD_VIEW);
        assert_endpoint_is_valid_uri(endpoints::REGISTER_VIEW);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN_VIEW);
        assert_endpoint_is_valid_uri(endpoints::INTERNAL_ERROR_VIEW);
        assert_endpoint_is_valid_uri(endpoints::STATIC);

        assert_endpoint_is_valid_uri(endpoints::LOG_IN_API);
        assert_endpoint_is_valid_uri(endpoints::LOG_OUT);
        assert_endpoint_is_valid_uri(endpoints::USERS);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS_API);
        assert_endpoint_is_valid_uri(endpoints::UPLOAD);
        assert_endpoint_is_valid_uri(endpoints::DASHBOARD_DATA);
        assert_endpoint_is_valid_uri(endpoints::VISUALIZE);
        assert_endpoint_is_valid_uri(endpoints::DOWNLOAD_REPORT);
        assert_endpoint_is_valid_uri(endpoints::REPORT);
    }
}
