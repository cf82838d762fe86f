//! Defines functions for handling user authentication with cookies.

use std::{cmp::max, num::ParseIntError};

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{
    Duration, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::{Error, auth::UserID};

pub(crate) const COOKIE_USER_ID: &str = "user_id";
pub(crate) const COOKIE_EXPIRY: &str = "expiry";
/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(5);

/// Date time format for the cookie expiry, e.g. "2021-01-01 00:00:00.000000 +00:00:00".
const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
         sign:mandatory]:[offset_minute]:[offset_second]"
);

/// Build an encrypted, HTTP-only cookie that is only sent to this site over HTTPS.
fn auth_cookie(name: &'static str, value: String, expiry: OffsetDateTime) -> Cookie<'static> {
    Cookie::build((name, value))
        .expires(expiry)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .build()
}

/// Add the auth cookies to the cookie jar, indicating that a user is logged in and authenticated.
///
/// Sets the initial expiry of the cookies to `duration` from the current time.
/// You can use [DEFAULT_COOKIE_DURATION] for the default duration.
///
/// # Errors
///
/// Returns an [Error::CookieDateError] if the expiry time cannot be formatted.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let expiry = OffsetDateTime::now_utc() + duration;
    // `format` always writes two digit hours, `to_string` does not.
    let expiry_string = expiry
        .format(DATE_TIME_FORMAT)
        .map_err(|_| Error::CookieDateError)?;

    Ok(jar
        .add(auth_cookie(COOKIE_USER_ID, user_id.to_string(), expiry))
        .add(auth_cookie(COOKIE_EXPIRY, expiry_string, expiry)))
}

/// Overwrite the auth cookies with expired placeholders so the browser deletes them.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    let expired = |name| {
        let mut cookie = auth_cookie(name, "deleted".to_owned(), OffsetDateTime::UNIX_EPOCH);
        cookie.set_max_age(Duration::ZERO);
        cookie
    };

    jar.add(expired(COOKIE_USER_ID)).add(expired(COOKIE_EXPIRY))
}

/// Set the expiry of the auth cookies in `jar` to the latest of UTC now
/// plus `duration` and the cookies' current expiry.
///
/// # Errors
///
/// The cookie jar is not modified if an error is returned.
///
/// Returns:
/// - [Error::CookieMissing] if the auth cookie or expiry cookie are not in the cookie jar.
/// - [Error::CookieDateError] if the expiry cookie cannot be parsed, extending
///   it by `duration` would overflow, or the new expiry cannot be formatted.
pub(crate) fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let expiry_cookie = jar.get(COOKIE_EXPIRY).ok_or(Error::CookieMissing)?;
    let current_expiry = extract_date_time(&expiry_cookie).map_err(|_| Error::CookieDateError)?;

    let new_expiry = OffsetDateTime::now_utc()
        .checked_add(duration)
        .ok_or(Error::CookieDateError)?;

    let expiry = max(current_expiry, new_expiry);

    set_auth_cookie_expiry(jar, expiry)
}

/// Re-issue the auth cookie and the expiry cookie in `jar` so both expire at
/// `expiry`.
///
/// # Errors
///
/// If an error is returned, the cookie jar is not modified.
///
/// Returns a:
/// - [Error::CookieMissing] if the auth cookie or expiry cookie are not in the cookie jar.
/// - [Error::CookieDateError] if the new expiry date time cannot be formatted.
fn set_auth_cookie_expiry(
    jar: PrivateCookieJar,
    expiry: OffsetDateTime,
) -> Result<PrivateCookieJar, Error> {
    let expiry_string = expiry
        .format(DATE_TIME_FORMAT)
        .map_err(|_| Error::CookieDateError)?;

    // Cookies sent by the browser only carry a name and value, so both are
    // rebuilt to keep their security attributes.
    let user_id = jar
        .get(COOKIE_USER_ID)
        .ok_or(Error::CookieMissing)?
        .value_trimmed()
        .to_owned();
    if jar.get(COOKIE_EXPIRY).is_none() {
        return Err(Error::CookieMissing);
    }

    Ok(jar
        .add(auth_cookie(COOKIE_USER_ID, user_id, expiry))
        .add(auth_cookie(COOKIE_EXPIRY, expiry_string, expiry)))
}

/// Read the logged in user's ID from the auth cookie.
///
/// # Errors
///
/// Returns an [Error::CookieMissing] if the cookie is missing, could not be
/// decrypted or does not hold a user ID.
pub(crate) fn get_user_id_from_auth_cookie(jar: &PrivateCookieJar) -> Result<UserID, Error> {
    let user_id_cookie = jar.get(COOKIE_USER_ID).ok_or(Error::CookieMissing)?;

    extract_user_id(&user_id_cookie).map_err(|_| Error::CookieMissing)
}

fn extract_date_time(cookie: &Cookie) -> Result<OffsetDateTime, time::error::Parse> {
    OffsetDateTime::parse(cookie.value_trimmed(), DATE_TIME_FORMAT)
}

fn extract_user_id(cookie: &Cookie) -> Result<UserID, ParseIntError> {
    let id: i64 = cookie.value_trimmed().parse()?;

    Ok(UserID::new(id))
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key, SameSite},
    };
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime, UtcOffset, macros::datetime};

    use crate::{
        Error,
        auth::{
            UserID,
            cookie::{
                COOKIE_EXPIRY, COOKIE_USER_ID, DATE_TIME_FORMAT, DEFAULT_COOKIE_DURATION,
                extract_date_time, extract_user_id, get_user_id_from_auth_cookie,
            },
        },
    };

    use super::{
        extend_auth_cookie_duration_if_needed, invalidate_auth_cookie, set_auth_cookie,
        set_auth_cookie_expiry,
    };

    #[test]
    fn can_extract_date_time() {
        let want = OffsetDateTime::now_utc() + Duration::minutes(5);
        let date_time_string = want.format(DATE_TIME_FORMAT).unwrap();
        let cookie = Cookie::build((COOKIE_EXPIRY, date_time_string)).build();

        let got = extract_date_time(&cookie).unwrap();

        assert_eq!(got, want, "got date time {:?}, want {:?}", got, want);
    }

    #[test]
    fn can_extract_date_time_at_midnight() {
        let want = datetime!(2021-01-01 00:00:00).assume_offset(UtcOffset::UTC);
        let date_time_string = want.format(DATE_TIME_FORMAT).unwrap();
        let cookie = Cookie::build((COOKIE_EXPIRY, date_time_string)).build();

        let got = extract_date_time(&cookie).unwrap();

        assert_eq!(got, want, "got date time {:?}, want {:?}", got, want);
    }

    #[test]
    fn can_extract_user_id() {
        let user_id = UserID::new(1);
        let cookie = Cookie::build((COOKIE_USER_ID, user_id.as_i64().to_string())).build();

        let got = extract_user_id(&cookie).unwrap();

        assert_eq!(got, user_id);
    }

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"foobar");
        let key = Key::from(&hash);

        PrivateCookieJar::new(key)
    }

    /// Assert that two date times are within one second of each other.
    ///
    /// A macro so that failures point at the caller rather than the helper.
    macro_rules! assert_date_time_close {
        ($left:expr, $right:expr) => {
            assert!(
                ($left - $right).abs() < Duration::seconds(1),
                "got date time {:?}, want {:?}",
                $left,
                $right
            );
        };
    }

    #[test]
    fn can_set_cookie() {
        let user_id = UserID::new(1);

        let jar = set_auth_cookie(get_jar(), user_id, DEFAULT_COOKIE_DURATION).unwrap();
        let user_id_cookie = jar.get(COOKIE_USER_ID).unwrap();
        let expiry_cookie = jar.get(COOKIE_EXPIRY).unwrap();

        assert_eq!(extract_user_id(&user_id_cookie).unwrap(), user_id);
        assert_date_time_close!(
            extract_date_time(&expiry_cookie).unwrap(),
            OffsetDateTime::now_utc() + Duration::minutes(5)
        );
    }

    #[test]
    fn get_user_id_from_cookie_succeeds() {
        let user_id = UserID::new(1);
        let jar = set_auth_cookie(get_jar(), user_id, DEFAULT_COOKIE_DURATION).unwrap();

        assert_eq!(get_user_id_from_auth_cookie(&jar), Ok(user_id));
    }

    #[test]
    fn get_user_id_from_empty_jar_fails() {
        assert_eq!(
            get_user_id_from_auth_cookie(&get_jar()),
            Err(Error::CookieMissing)
        );
    }

    #[test]
    fn can_set_cookie_expires() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), DEFAULT_COOKIE_DURATION).unwrap();

        let want = OffsetDateTime::now_utc() + Duration::days(10);
        let updated_jar = set_auth_cookie_expiry(jar, want).unwrap();
        let id_cookie = updated_jar.get(COOKIE_USER_ID).unwrap();
        let expiry_cookie = updated_jar.get(COOKIE_EXPIRY).unwrap();

        assert_eq!(id_cookie.expires_datetime().unwrap(), want);
        assert_eq!(expiry_cookie.expires_datetime().unwrap(), want);
        assert_eq!(extract_user_id(&id_cookie).unwrap(), UserID::new(1));
        assert_eq!(extract_date_time(&expiry_cookie).unwrap(), want);
    }

    #[test]
    fn can_extend_cookie_duration() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), DEFAULT_COOKIE_DURATION).unwrap();
        let initial_cookie = jar.get(COOKIE_EXPIRY).unwrap();
        let want = extract_date_time(&initial_cookie)
            .unwrap()
            .checked_add(Duration::minutes(5))
            .unwrap();

        let jar = extend_auth_cookie_duration_if_needed(jar, Duration::minutes(10)).unwrap();
        let got_id_cookie = jar.get(COOKIE_USER_ID).unwrap();
        let got_expiry_cookie = jar.get(COOKIE_EXPIRY).unwrap();

        assert_date_time_close!(extract_date_time(&got_expiry_cookie).unwrap(), want);
        assert_date_time_close!(got_id_cookie.expires_datetime().unwrap(), want);
        assert_date_time_close!(got_expiry_cookie.expires_datetime().unwrap(), want);
    }

    #[test]
    fn cookie_duration_does_not_shrink() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), DEFAULT_COOKIE_DURATION).unwrap();
        let want = jar.get(COOKIE_USER_ID).unwrap().expires_datetime();

        // The cookie already expires in 5 minutes, so extending it to 5 seconds from now is a no-op.
        let jar = extend_auth_cookie_duration_if_needed(jar, Duration::seconds(5)).unwrap();

        assert_eq!(jar.get(COOKIE_USER_ID).unwrap().expires_datetime(), want);
    }

    #[test]
    fn extend_fails_without_cookies() {
        let result = extend_auth_cookie_duration_if_needed(get_jar(), DEFAULT_COOKIE_DURATION);

        assert!(matches!(result, Err(Error::CookieMissing)));
    }

    #[test]
    fn invalidate_auth_cookie_succeeds() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), DEFAULT_COOKIE_DURATION).unwrap();

        let jar = invalidate_auth_cookie(jar);
        let cookie = jar.get(COOKIE_USER_ID).unwrap();

        assert_eq!(cookie.value(), "deleted");
        assert_eq!(cookie.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(
            get_user_id_from_auth_cookie(&jar),
            Err(Error::CookieMissing)
        );
    }

    #[test]
    fn extending_cookies_sent_by_browser_keeps_security_attributes() {
        // A browser only sends back the name and value of each cookie.
        let expiry = OffsetDateTime::now_utc() + Duration::minutes(1);
        let jar = get_jar()
            .add(Cookie::new(COOKIE_USER_ID, "7"))
            .add(Cookie::new(
                COOKIE_EXPIRY,
                expiry.format(DATE_TIME_FORMAT).unwrap(),
            ));

        let jar = extend_auth_cookie_duration_if_needed(jar, DEFAULT_COOKIE_DURATION).unwrap();

        for name in [COOKIE_USER_ID, COOKIE_EXPIRY] {
            let cookie = jar.get(name).unwrap();
            assert_eq!(cookie.http_only(), Some(true), "{name} should be http-only");
            assert_eq!(cookie.secure(), Some(true), "{name} should be secure");
            assert_eq!(
                cookie.same_site(),
                Some(SameSite::Strict),
                "{name} should be same-site strict"
            );
        }
        assert_eq!(get_user_id_from_auth_cookie(&jar), Ok(UserID::new(7)));
    }
}
