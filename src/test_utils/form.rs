use scraper::{ElementRef, Html, Selector};

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|error| panic!("invalid selector {css:?}: {error}"))
}

#[track_caller]
pub(crate) fn must_get_form(html: &Html) -> ElementRef<'_> {
    html.select(&selector("form"))
        .next()
        .expect("No form found")
}

/// Assert that the HTMX `attribute` of `form`, e.g. "hx-post", points at `endpoint`.
#[track_caller]
pub(crate) fn assert_hx_endpoint(form: &ElementRef<'_>, endpoint: &str, attribute: &str) {
    let got = form.value().attr(attribute);

    assert_eq!(
        got,
        Some(endpoint),
        "want form with attribute {attribute}=\"{endpoint}\", got {got:?}"
    );
}

/// Assert that `form` has a required input called `name` with the HTML type `type_`.
#[track_caller]
pub(crate) fn assert_form_input(form: &ElementRef<'_>, name: &str, type_: &str) {
    let input = form
        .select(&selector("input"))
        .find(|input| input.value().attr("name") == Some(name))
        .unwrap_or_else(|| panic!("No input found with name \"{name}\""));

    let input_type = input.value().attr("type").unwrap_or_default();
    assert_eq!(
        input_type, type_,
        "want input {name} with type \"{type_}\", got {input_type:?}"
    );
    assert!(
        input.value().attr("required").is_some(),
        "want input with name {name} to have the required attribute but got none"
    );
}

#[track_caller]
pub(crate) fn assert_form_submit_button(form: &ElementRef<'_>) {
    let has_submit_button = form
        .select(&selector("button"))
        .any(|button| button.value().attr("type") == Some("submit"));

    assert!(has_submit_button, "want a button with type=\"submit\"");
}
