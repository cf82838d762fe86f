//! User accounts and authentication: registration, logging in and out, and
//! the middleware that protects the pages and APIs that need a signed-in user.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod register_user;
mod user;

pub use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{auth_guard, auth_guard_api};
pub use password::{PasswordHash, ValidatedPassword};
pub use register_user::{get_register_page, register_user};
pub use user::{User, UserID, create_user, create_user_table};
