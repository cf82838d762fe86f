//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The cookie module handles the lower level cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        User, invalidate_auth_cookie, set_auth_cookie, user::get_user_by_email,
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, base, link, loading_spinner, log_in_register, password_input,
        text_input,
    },
};

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The message shown when the email or password is wrong.
pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Invalid email or password";

/// The notice shown on the log-in page after registering.
const REGISTERED_NOTICE: &str = "Registration successful! Please log in.";

fn log_in_form(email: &str, error_message: Option<&str>, notice: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(notice) = notice {
                div class="p-3 text-sm text-green-800 rounded bg-green-50 dark:bg-gray-700 dark:text-green-400"
                {
                    (notice)
                }
            }

            (text_input("email", "Email", "email", email, None))
            (password_input("", 0, error_message))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Don't have an account? "
                (link(endpoints::REGISTER_VIEW, "Register here"))
            }
        }
    }
}

/// The query parameters accepted by the log-in page.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LogInQuery {
    /// Set after a successful registration to show a notice.
    pub registered: Option<bool>,
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<LogInQuery>) -> Response {
    let notice = query.registered.unwrap_or(false).then_some(REGISTERED_NOTICE);
    let log_in_form = log_in_form("", None, notice);
    let content = log_in_register("Log in to your account", &log_in_form);
    base("Log In", &[], &content).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw data entered by the user in the log-in form.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the password in the database, which has been verified.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Email entered during log-in.
    pub email: String,

    /// Password entered during log-in.
    pub password: String,

    /// Whether to extend the initial auth cookie duration.
    ///
    /// This value comes from a checkbox, so it either has a string value or is not set
    /// (see the [MDN docs](https://developer.mozilla.org/en-US/docs/Web/HTML/Element/input/checkbox#value_2)).
    /// The `Some` variant should be interpreted as `true` irregardless of the
    /// string value, and the `None` variant should be interpreted as `false`.
    pub remember_me: Option<String>,
}

/// The message shown when log-in fails for a reason other than bad credentials.
const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";

/// Look up the user with `email` and check `password` against their stored hash.
///
/// # Errors
///
/// Returns [Error::InvalidCredentials] if there is no user with `email` or the
/// password does not match. Other errors are from the database or the hashing library.
fn authenticate(email: &str, password: &str, state: &LoginState) -> Result<User, Error> {
    let user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        match get_user_by_email(email, &connection) {
            Err(Error::NotFound) => return Err(Error::InvalidCredentials),
            result => result?,
        }
    };

    let is_password_valid = user
        .password_hash
        .verify(password)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if is_password_valid {
        Ok(user)
    } else {
        Err(Error::InvalidCredentials)
    }
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the auth cookie set and the client is redirected to the dashboard page.
/// Otherwise, the form is returned with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let email = user_data.email.trim();

    let user = match authenticate(email, &user_data.password, &state) {
        Ok(user) => user,
        Err(Error::InvalidCredentials) => {
            tracing::info!("Failed log-in attempt for {email}");
            return log_in_form(email, Some(INVALID_CREDENTIALS_ERROR_MSG), None).into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return log_in_form(email, Some(INTERNAL_ERROR_MSG), None).into_response();
        }
    };

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    match set_auth_cookie(jar.clone(), user.id, cookie_duration) {
        Ok(updated_jar) => {
            tracing::info!("User {} logged in", user.id);
            (
                StatusCode::SEE_OTHER,
                HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
                updated_jar,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("Error setting auth cookie: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod log_in_page_tests {
    use axum::{extract::Query, http::StatusCode};

    use crate::{
        endpoints,
        test_utils::{
            assert_content_type, assert_form_input, assert_hx_endpoint, assert_valid_html,
            must_get_form, parse_html_document,
        },
    };

    use super::{LogInQuery, REGISTERED_NOTICE, get_log_in_page};

    #[tokio::test]
    async fn log_in_page_displays_form() {
        let response = get_log_in_page(Query(LogInQuery::default())).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/html; charset=utf-8");

        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::LOG_IN_API, "hx-post");
        assert_form_input(&form, "email", "email");
        assert_form_input(&form, "password", "password");

        let link_selector = scraper::Selector::parse("a[href]").unwrap();
        let links = form.select(&link_selector).collect::<Vec<_>>();
        assert_eq!(links.len(), 1, "want 1 link, got {}", links.len());
        assert_eq!(
            links[0].value().attr("href"),
            Some(endpoints::REGISTER_VIEW)
        );
    }

    #[tokio::test]
    async fn log_in_page_shows_registered_notice() {
        let response = get_log_in_page(Query(LogInQuery {
            registered: Some(true),
        }))
        .await;

        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let text = document.root_element().text().collect::<String>();
        assert!(
            text.contains(REGISTERED_NOTICE),
            "want page to contain {REGISTERED_NOTICE:?}"
        );
    }
}

#[cfg(test)]
mod log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Form, Router,
        body::Body,
        extract::State,
        http::{Response, StatusCode, header::SET_COOKIE},
        routing::post,
    };
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key},
    };
    use axum_test::TestServer;
    use rusqlite::Connection;
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use crate::{
        auth::{
            PasswordHash, ValidatedPassword,
            cookie::{COOKIE_USER_ID, DEFAULT_COOKIE_DURATION},
            create_user,
            user::create_user_table,
        },
        endpoints,
        test_utils::{assert_hx_redirect, assert_valid_html, parse_html_fragment},
    };

    use super::{
        INVALID_CREDENTIALS_ERROR_MSG, LogInData, LoginState, REMEMBER_ME_COOKIE_DURATION,
        post_log_in,
    };

    const TEST_EMAIL: &str = "test@example.com";
    const TEST_PASSWORD: &str = "test";

    fn get_test_state() -> LoginState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_user_table(&connection).expect("Could not create user table");
        create_user(
            "Test User",
            TEST_EMAIL,
            PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD), 4)
                .expect("Could not hash password"),
            &connection,
        )
        .expect("Could not create test user");

        LoginState {
            cookie_key: Key::from(&Sha512::digest("foobar")),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn log_in_data(email: &str, password: &str, remember_me: bool) -> LogInData {
        LogInData {
            email: email.to_owned(),
            password: password.to_owned(),
            remember_me: remember_me.then(|| "on".to_owned()),
        }
    }

    async fn new_log_in_request(state: LoginState, form: LogInData) -> Response<Body> {
        let jar = PrivateCookieJar::new(state.cookie_key.clone());
        post_log_in(State(state), jar, Form(form)).await
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let response =
            new_log_in_request(get_test_state(), log_in_data(TEST_EMAIL, TEST_PASSWORD, false))
                .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
        assert_set_cookie_expires_in(&response, DEFAULT_COOKIE_DURATION);
    }

    #[tokio::test]
    async fn remember_me_extends_cookie_duration() {
        let response =
            new_log_in_request(get_test_state(), log_in_data(TEST_EMAIL, TEST_PASSWORD, true))
                .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_set_cookie_expires_in(&response, REMEMBER_ME_COOKIE_DURATION);
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let response = new_log_in_request(
            get_test_state(),
            log_in_data(TEST_EMAIL, "wrongpassword", false),
        )
        .await;

        assert_error_message(response, INVALID_CREDENTIALS_ERROR_MSG).await;
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email() {
        let response = new_log_in_request(
            get_test_state(),
            log_in_data("nobody@example.com", TEST_PASSWORD, false),
        )
        .await;

        assert_error_message(response, INVALID_CREDENTIALS_ERROR_MSG).await;
    }

    #[tokio::test]
    async fn log_in_via_form_sets_cookies() {
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .with_state(get_test_state());
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&log_in_data(TEST_EMAIL, TEST_PASSWORD, false))
            .await;

        response.assert_status_see_other();
        assert!(response.cookies().get(COOKIE_USER_ID).is_some());
    }

    #[track_caller]
    fn assert_set_cookie_expires_in(response: &Response<Body>, duration: Duration) {
        let want = OffsetDateTime::now_utc() + duration;
        let mut found = false;

        for cookie_header in response.headers().get_all(SET_COOKIE) {
            let cookie = Cookie::parse(cookie_header.to_str().unwrap()).unwrap();
            if cookie.name() != COOKIE_USER_ID {
                continue;
            }

            found = true;
            let expires = cookie.expires_datetime().unwrap();
            assert!(
                (expires - want).abs() < Duration::seconds(5),
                "got expiry {expires:?}, want {want:?}"
            );
        }

        assert!(found, "want a {COOKIE_USER_ID} cookie to be set");
    }

    async fn assert_error_message(response: Response<Body>, want: &str) {
        assert_eq!(response.status(), StatusCode::OK);

        let fragment = parse_html_fragment(response).await;
        assert_valid_html(&fragment);
        let error_selector = scraper::Selector::parse("p.text-red-500").unwrap();
        let errors = fragment
            .select(&error_selector)
            .map(|p| p.text().collect::<String>())
            .collect::<Vec<_>>();

        assert_eq!(errors, vec![want.to_owned()]);
    }
}
