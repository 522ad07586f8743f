use paramforge::{render_text, Context, Error, ParseError, RenderError, Template};
use serde_json::json;

fn parse_err(source: &str) -> ParseError {
    Template::parse(source).expect_err("template should not parse")
}

#[test]
fn test_unterminated_expression_marker() {
    let err = parse_err("Hello {{ name");
    assert_eq!((err.line, err.column), (1, 7));
    assert!(err.message.contains("unterminated"), "{}", err.message);
}

#[test]
fn test_unterminated_block_marker_on_later_line() {
    let err = parse_err("a\nb\n  {% if x ");
    assert_eq!((err.line, err.column), (3, 3));
}

#[test]
fn test_unterminated_string_literal() {
    let err = parse_err("{{ 'oops }}");
    assert!(err.message.contains("unterminated string"), "{}", err.message);
}

#[test]
fn test_block_structure_errors() {
    assert!(parse_err("{% for x in xs %}").message.contains("endfor"));
    assert!(parse_err("{% if a %}{% else %}{% else %}{% endif %}").message.contains("else"));
    assert!(parse_err("{% endfor %}").message.contains("without matching `for`"));
    assert!(parse_err("{% elif a %}").message.contains("outside an open `if`"));
    assert!(parse_err("{% macro m() %}").message.contains("unknown block keyword"));
    assert!(parse_err("{% if %}x{% endif %}").message.contains("expected an expression"));
    assert!(parse_err("{{ a b }}").message.contains("expected `}}`"));
}

#[test]
fn test_filter_arity_checked_at_parse_time() {
    let err = parse_err("{{ xs|join(',', ';') }}");
    assert!(err.message.contains("filter `join`"), "{}", err.message);
    let err = parse_err("{{ xs|join(sep) }}");
    assert!(err.message.contains("expected an expression"), "{}", err.message);
}

#[test]
fn test_undefined_is_checked_lazily() {
    // `ghost` sits in a branch that never runs.
    let ctx = Context::from(json!({"flag": false}));
    let out = render_text("{% if flag %}{{ ghost }}{% endif %}ok", &ctx).unwrap();
    assert_eq!(out, "ok");
}

#[test]
fn test_nested_undefined_names_first_missing_segment() {
    let ctx = Context::from(json!({"a": {"b": {}}}));
    let err = render_text("{{ a.b.c.d }}", &ctx).unwrap_err();
    assert!(matches!(err, Error::Render(RenderError::Undefined { ref path }) if path == "a.b.c"));
}

#[test]
fn test_type_errors() {
    let ctx = Context::from(json!({"n": 3, "s": "x", "xs": [1], "m": {"k": 1}}));
    let kind_of = |source: &str| match render_text(source, &ctx) {
        Err(Error::Render(RenderError::TypeError { value_kind, .. })) => value_kind,
        other => panic!("{source}: expected TypeError, got {other:?}"),
    };
    assert_eq!(kind_of("{% if n > s %}{% endif %}"), "int and string");
    assert_eq!(kind_of("{% for c in n %}{% endfor %}"), "int");
    assert_eq!(kind_of("{{ xs }}"), "sequence");
    assert_eq!(kind_of("{{ m }}"), "mapping");
    assert_eq!(kind_of("{% for k, v in xs %}{% endfor %}"), "int");
}

#[test]
fn test_hand_built_filter_call_with_wrong_arity() {
    use paramforge::ast::{Expr, FilterCall};
    use paramforge::expression::evaluate;

    let expr = Expr::Filter {
        target: Box::new(Expr::Literal(paramforge::Value::from("abc"))),
        call: FilterCall {
            name: "replace".into(),
            args: vec![],
        },
    };
    let err = evaluate(&expr, &Context::new()).unwrap_err();
    assert!(matches!(err, RenderError::TypeError { ref value_kind, .. } if value_kind == "string"));
}
