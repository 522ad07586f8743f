use paramforge::{render_text, Context, Template, Value};
use proptest::prelude::*;

proptest! {
    #[test]
    fn literal_text_renders_unchanged(text in "[^{]*") {
        let out = render_text(&text, &Context::new()).unwrap();
        prop_assert_eq!(out, text);
    }

    #[test]
    fn interpolated_strings_pass_through(value in "[^{}]*") {
        let ctx = Context::new().with("v", value.clone());
        let out = render_text("<{{ v }}>", &ctx).unwrap();
        prop_assert_eq!(out, format!("<{value}>"));
    }

    #[test]
    fn rendering_is_repeatable(xs in prop::collection::vec(any::<i64>(), 0..8)) {
        let template = Template::parse("{% for x in xs %}{{x}}:{{x:,}} {% endfor %}").unwrap();
        let ctx = Context::new().with("xs", xs);
        let first = template.render(&ctx).unwrap();
        let second = template.render(&ctx).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn loop_index_counts_from_one(n in 0usize..30) {
        let ctx = Context::new().with("xs", vec![Value::Null; n]);
        let out = render_text("{% for x in xs %}{{loop.index}},{% endfor %}", &ctx).unwrap();
        let expected: String = (1..=n).map(|i| format!("{i},")).collect();
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn thousands_only_inserts_separators(n in any::<i64>()) {
        let ctx = Context::new().with("n", n);
        let out = render_text("{{n:,}}", &ctx).unwrap();
        prop_assert_eq!(out.replace(',', ""), n.to_string());
        let digits = out.trim_start_matches('-');
        let groups: Vec<&str> = digits.split(',').collect();
        prop_assert!(groups[0].len() >= 1 && groups[0].len() <= 3);
        prop_assert!(groups[1..].iter().all(|g| g.len() == 3));
    }
}
