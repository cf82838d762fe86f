//! The registration page and the handler for creating new user accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::{PasswordHash, ValidatedPassword, create_user},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, link,
        loading_spinner, log_in_register, password_input, text_input,
    },
};

/// The minimum number of characters the password should have to be considered valid on the client side (server-side validation is done on top of this validation).
const PASSWORD_INPUT_MIN_LENGTH: u8 = 8;

fn confirm_password_input(min_length: u8, error_message: Option<&str>) -> Markup {
    html! {
        div
        {
            label
                for="confirm-password"
                class=(FORM_LABEL_STYLE)
            {
                "Confirm Password"
            }

            input
                type="password"
                name="confirm_password"
                id="confirm-password"
                placeholder="••••••••"
                class=(FORM_TEXT_INPUT_STYLE)
                required
                minlength=(min_length)
                autofocus[error_message.is_some()]
            ;

            @if let Some(error_message) = error_message
            {
                p class="text-red-500 text-base" { (error_message) }
            }
        }
    }
}

/// The error messages to show next to each field of the registration form.
#[derive(Default)]
struct RegistrationErrors<'a> {
    name: Option<&'a str>,
    email: Option<&'a str>,
    password: Option<&'a str>,
    confirm_password: Option<&'a str>,
}

fn registration_form(name: &str, email: &str, errors: RegistrationErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("name", "Name", "text", name, errors.name))
            (text_input("email", "Email", "email", email, errors.email))
            (password_input("", PASSWORD_INPUT_MIN_LENGTH, errors.password))
            (confirm_password_input(PASSWORD_INPUT_MIN_LENGTH, errors.confirm_password))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Create Account"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                (link(endpoints::LOG_IN_VIEW, "Log in here"))
            }
        }
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let registration_form = registration_form("", "", RegistrationErrors::default());
    let content = log_in_register("Create Account", &registration_form);
    base("Register", &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The database connection for storing users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The data entered in the registration form.
#[derive(Serialize, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Handler for registration requests.
///
/// On success the client is redirected to the log-in page with a notice,
/// otherwise the form is returned with an error message next to the field
/// with the problem.
pub async fn register_user(
    State(state): State<RegistrationState>,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let name = user_data.name.trim();
    let email = user_data.email.trim();
    let render_error =
        |errors: RegistrationErrors<'_>| registration_form(name, email, errors).into_response();

    if name.is_empty() {
        return render_error(RegistrationErrors {
            name: Some(&Error::EmptyField("Name").to_string()),
            ..Default::default()
        });
    }

    if email.is_empty() {
        return render_error(RegistrationErrors {
            email: Some(&Error::EmptyField("Email").to_string()),
            ..Default::default()
        });
    }

    if user_data.password != user_data.confirm_password {
        return render_error(RegistrationErrors {
            confirm_password: Some(&Error::PasswordMismatch.to_string()),
            ..Default::default()
        });
    }

    let validated_password = match ValidatedPassword::new(&user_data.password, &[name, email]) {
        Ok(password) => password,
        Err(error) => {
            return render_error(RegistrationErrors {
                password: Some(&error.to_string()),
                ..Default::default()
            });
        }
    };

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                (),
            )
                .into_response();
        }
    };

    let result = match state.db_connection.lock() {
        Ok(connection) => create_user(name, email, password_hash, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match result {
        Ok(user) => {
            tracing::info!("Registered user {}", user.id);
            let query = serde_urlencoded::to_string([("registered", "true")])
                .unwrap_or_else(|_| "registered=true".to_owned());

            (
                StatusCode::SEE_OTHER,
                HxRedirect(format!("{}?{}", endpoints::LOG_IN_VIEW, query)),
                (),
            )
                .into_response()
        }
        Err(Error::DuplicateEmail) => render_error(RegistrationErrors {
            email: Some(&Error::DuplicateEmail.to_string()),
            ..Default::default()
        }),
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                (),
            )
                .into_response()
        }
    }
}
