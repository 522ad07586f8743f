use paramforge::{render_text, Context, Error, RenderError};
use serde_json::json;

fn render(template: &str, params: serde_json::Value) -> Result<String, Error> {
    render_text(template, &Context::from(params))
}

#[test]
fn test_join_with_separator() {
    let out = render("{{ skills|join(', ') }}", json!({"skills": ["Go", "Rust", "Zig"]})).unwrap();
    assert_eq!(out, "Go, Rust, Zig");
}

#[test]
fn test_join_rejects_non_strings() {
    let err = render("{{ xs|join(',') }}", json!({"xs": ["a", 2]})).unwrap_err();
    assert!(matches!(
        err,
        Error::Render(RenderError::TypeError { ref operation, ref value_kind })
            if operation == "join" && value_kind == "int"
    ));
}

#[test]
fn test_filters_apply_left_to_right() {
    let out = render("{{ name|trim|upper }}", json!({"name": "  ana  "})).unwrap();
    assert_eq!(out, "ANA");
    let out = render("{{ tags|unique|join('/')|title }}", json!({"tags": ["ai", "ml", "ai"]})).unwrap();
    assert_eq!(out, "Ai/Ml");
}

#[test]
fn test_thousands_suffix_and_filter_agree() {
    let params = json!({"big": 1234567, "price": 9876.5, "neg": -1000});
    assert_eq!(render("{{big:,}}", params.clone()).unwrap(), "1,234,567");
    assert_eq!(render("{{ big|thousands }}", params.clone()).unwrap(), "1,234,567");
    assert_eq!(render("{{price:,}}", params.clone()).unwrap(), "9,876.5");
    assert_eq!(render("{{ neg : , }}", params).unwrap(), "-1,000");
}

#[test]
fn test_thousands_on_non_number_fails() {
    let err = render("{{name:,}}", json!({"name": "Ana"})).unwrap_err();
    assert!(matches!(
        err,
        Error::Render(RenderError::TypeError { ref value_kind, .. }) if value_kind == "string"
    ));
}

#[test]
fn test_length_in_conditions() {
    let template = "{% if items|length > 2 %}many{% else %}few{% endif %}";
    assert_eq!(render(template, json!({"items": [1, 2, 3]})).unwrap(), "many");
    assert_eq!(render(template, json!({"items": [1]})).unwrap(), "few");
    assert_eq!(render("{{ 'héllo'|length }}", json!({})).unwrap(), "5");
}

#[test]
fn test_string_filters() {
    let params = json!({"s": "hello wORLD"});
    assert_eq!(render("{{ s|lower }}", params.clone()).unwrap(), "hello world");
    assert_eq!(render("{{ s|capitalize }}", params.clone()).unwrap(), "Hello world");
    assert_eq!(render("{{ s|replace('o', '0') }}", params).unwrap(), "hell0 wORLD");
}

#[test]
fn test_first_and_last() {
    let params = json!({"xs": ["a", "b", "c"]});
    assert_eq!(render("{{ xs|first }}{{ xs|last }}", params).unwrap(), "ac");
}
