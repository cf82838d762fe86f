//! Authentication middleware that validates cookies, extends sessions, and handles redirects.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use serde_json::json;
use time::Duration;

use crate::{
    AppState,
    auth::cookie::{
        DEFAULT_COOKIE_DURATION, extend_auth_cookie_duration_if_needed,
        get_user_id_from_auth_cookie,
    },
    endpoints,
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// What to send back when a request does not carry a valid auth cookie.
#[derive(Debug, Clone, Copy)]
enum Unauthenticated {
    /// Redirect page requests to the log-in page.
    RedirectToLogIn,
    /// Answer API requests with a 401 JSON error.
    JsonError,
}

impl IntoResponse for Unauthenticated {
    fn into_response(self) -> Response {
        match self {
            Unauthenticated::RedirectToLogIn => Redirect::to(endpoints::LOG_IN_VIEW).into_response(),
            Unauthenticated::JsonError => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Not logged in", "status": "error" })),
            )
                .into_response(),
        }
    }
}

/// Check the auth cookie, run the request with the user ID as an extension
/// and extend the cookie on the way out.
async fn guard(
    state: AuthState,
    request: Request,
    next: Next,
    on_unauthenticated: Unauthenticated,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Rejecting request.");
            return on_unauthenticated.into_response();
        }
    };

    let Ok(user_id) = get_user_id_from_auth_cookie(&jar) else {
        tracing::debug!("Rejected {} {}: not logged in", parts.method, parts.uri);
        return on_unauthenticated.into_response();
    };

    parts.extensions.insert(user_id);
    let mut response = next.run(Request::from_parts(parts, body)).await;

    let jar = extend_auth_cookie_duration_if_needed(jar.clone(), DEFAULT_COOKIE_DURATION)
        .unwrap_or_else(|err| {
            tracing::error!("Error extending cookie duration: {err:?}. Rolling back cookie jar.");
            jar
        });
    copy_set_cookie_headers(jar, &mut response);

    response
}

/// Append the `Set-Cookie` headers produced by `jar` to `response`.
fn copy_set_cookie_headers(jar: PrivateCookieJar, response: &mut Response) {
    let jar_response = jar.into_response();

    for value in jar_response.headers().get_all(SET_COOKIE) {
        response.headers_mut().append(SET_COOKIE, value.to_owned());
    }
}

/// Middleware function that checks for a valid authorization cookie.
/// The user ID is placed into request and then the request executed normally if the cookie is valid, otherwise a redirect to the log-in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    guard(state, request, next, Unauthenticated::RedirectToLogIn).await
}

/// Middleware function that checks for a valid authorization cookie on JSON endpoints.
/// A 401 JSON error is returned instead of a redirect when the cookie is missing or invalid.
pub async fn auth_guard_api(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    guard(state, request, next, Unauthenticated::JsonError).await
}
