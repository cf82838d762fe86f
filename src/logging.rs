//! Middleware for logging requests and responses.

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Bodies longer than this many characters are truncated in the `info` logs.
const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The largest request body, in bytes, that is buffered for logging.
///
/// Matches the default body limit of axum's extractors.
const REQUEST_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Form fields whose values must never be written to the logs.
const REDACTED_FIELDS: [&str; 2] = ["password", "confirm_password"];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] characters, it is
/// truncated and the full body is logged at the `debug` level.
/// Password fields in form bodies are redacted and multipart bodies, i.e.
/// uploaded files, are not logged.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, REQUEST_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!("Rejected request body: {error}");
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body is too large or could not be read",
            )
                .into_response();
        }
    };

    let display_text = request_display_text(&parts.headers, &body_bytes);
    log_body("Received request", &parts, &display_text);

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    log_body("Sending response", &parts, &String::from_utf8_lossy(&body_bytes));

    Response::from_parts(parts, Body::from(body_bytes))
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

fn request_display_text(headers: &HeaderMap, body: &[u8]) -> String {
    let content_type = content_type(headers);

    if content_type.starts_with("multipart/form-data") {
        format!("<multipart body, {} bytes>", body.len())
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        redact_form(body)
    } else {
        String::from_utf8_lossy(body).to_string()
    }
}

/// Replace the values of the password fields in a URL encoded form.
fn redact_form(form: &[u8]) -> String {
    let Ok(fields) = serde_urlencoded::from_bytes::<Vec<(String, String)>>(form) else {
        return "<malformed form body>".to_owned();
    };

    let redacted: Vec<(String, String)> = fields
        .into_iter()
        .map(|(key, value)| {
            if REDACTED_FIELDS.contains(&key.as_str()) {
                (key, "********".to_owned())
            } else {
                (key, value)
            }
        })
        .collect();

    serde_urlencoded::to_string(redacted).unwrap_or_default()
}

fn log_body(message: &str, parts: &impl std::fmt::Debug, body: &str) {
    if body.chars().count() > LOG_BODY_LENGTH_LIMIT {
        let truncated: String = body.chars().take(LOG_BODY_LENGTH_LIMIT).collect();
        tracing::info!("{message}: {parts:#?}\nbody: {truncated}...");
        tracing::debug!("Full body: {body:?}");
    } else {
        tracing::info!("{message}: {parts:#?}\nbody: {body:?}");
    }
}
