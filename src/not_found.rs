//! The page shown when a route or resource does not exist.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

/// Route handler for requests that do not match any route.
pub async fn get_404_not_found() -> Response {
    get_404_not_found_response()
}

/// The 404 page as a response, for handlers that find nothing to show.
pub fn get_404_not_found_response() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(
            error_view(
                "Not Found",
                "404",
                "Something's missing.",
                "Sorry, we can't find that page. You'll find lots to explore on the home page.",
            )
            .into_string(),
        ),
    )
        .into_response()
}
