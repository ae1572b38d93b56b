use proptest::prelude::*;
use serde_json::json;
use template_interpreter as tmpl;

fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec![
            "{{", "}}", "{%", "%}", "{#", "#}",
            "{% if a %}", "{% else %}", "{% endif %}",
            "{% for x in xs %}", "{% endfor %}",
            "{{ x }}", "{{ a.b | upper }}", "{% if not a.b or x %}",
        ])
        .prop_map(str::to_string),
        "[a-z ]{0,4}",
        "\\PC{0,3}",
    ]
}

proptest! {
    #[test]
    fn tag_soup_never_panics(parts in prop::collection::vec(fragment(), 0..24)) {
        let src = parts.concat();
        let ctx = json!({"a": {"b": "q"}, "xs": [1, {"k": 2}], "x": null});
        let _ = tmpl::render(&src, &ctx);
    }

    #[test]
    fn arbitrary_text_never_panics(src in "\\PC*") {
        let _ = tmpl::render(&src, &json!({}));
    }

    #[test]
    fn text_without_braces_renders_verbatim(src in "[^{]*") {
        prop_assert_eq!(tmpl::render(&src, &json!({"a": 1})), src);
    }

    #[test]
    fn loop_renders_every_element(xs in prop::collection::vec(0i64..1000, 0..20)) {
        let expected: String = xs.iter().map(|x| format!("{x},")).collect();
        let out = tmpl::render("{% for x in xs %}{{ x }},{% endfor %}", &json!({ "xs": xs }));
        prop_assert_eq!(out, expected);
    }
}
