use axum::{
    body::Body,
    http::header::{CONTENT_TYPE, HeaderName},
    response::Response,
};
use axum_htmx::HX_REDIRECT;

#[track_caller]
fn header_str<'a>(response: &'a Response<Body>, name: &HeaderName) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Headers missing {name}"))
        .to_str()
        .expect("Could not convert header to str")
}

#[track_caller]
pub(crate) fn assert_content_type(response: &Response<Body>, content_type: &str) {
    assert_eq!(header_str(response, &CONTENT_TYPE), content_type);
}

#[track_caller]
pub(crate) fn assert_hx_redirect(response: &Response<Body>, endpoint: &str) {
    assert_eq!(header_str(response, &HX_REDIRECT), endpoint);
}
