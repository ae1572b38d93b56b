use pretty_assertions::assert_eq;
use serde_json::json;
use template_interpreter as tmpl;

#[test]
fn test_literal_text() {
    assert_eq!(tmpl::evaluate(&tmpl::parse("literal"), &json!({})), "literal");
}

#[test]
fn test_nested_variable() {
    let expr = tmpl::parse("{{ a.b }}");
    assert_eq!(tmpl::evaluate(&expr, &json!({"a": {"b": "x"}})), "x");
    assert_eq!(tmpl::evaluate(&expr, &json!({"a": {}})), "");
    assert_eq!(tmpl::evaluate(&expr, &json!({})), "");
    assert_eq!(tmpl::evaluate(&expr, &json!({"a": "not a mapping"})), "");
}

#[test]
fn test_if_else() {
    let expr = tmpl::parse("{% if a %}Y{% else %}N{% endif %}");
    assert_eq!(tmpl::evaluate(&expr, &json!({"a": true})), "Y");
    assert_eq!(tmpl::evaluate(&expr, &json!({"a": false})), "N");
}

#[test]
fn test_falsy_conditions() {
    let expr = tmpl::parse("{% if a %}Y{% else %}N{% endif %}");
    for falsy in [json!({}), json!({"a": null}), json!({"a": 0}), json!({"a": ""})] {
        assert_eq!(tmpl::evaluate(&expr, &falsy), "N", "context {falsy}");
    }
    for truthy in [json!({"a": 1}), json!({"a": "no"}), json!({"a": [0]})] {
        assert_eq!(tmpl::evaluate(&expr, &truthy), "Y", "context {truthy}");
    }
}

#[test]
fn test_if_without_else() {
    let expr = tmpl::parse("[{% if a %}Y{% endif %}]");
    assert_eq!(tmpl::evaluate(&expr, &json!({"a": false})), "[]");
}

#[test]
fn test_for_loop() {
    let expr = tmpl::parse("{% for i in xs %}{{ i }}{% endfor %}");
    assert_eq!(tmpl::evaluate(&expr, &json!({"xs": ["a", "b"]})), "ab");
    assert_eq!(tmpl::evaluate(&expr, &json!({})), "");
    assert_eq!(tmpl::evaluate(&expr, &json!({"xs": 7})), "");
}

#[test]
fn test_same_tree_different_contexts() {
    let expr = tmpl::parse("{% for u in users %}{{ u.name }}{% if u.admin %}*{% endif %};{% endfor %}");
    let first = json!({"users": [{"name": "ann", "admin": true}, {"name": "bo"}]});
    let second = json!({"users": [{"name": "cy"}]});
    assert_eq!(tmpl::evaluate(&expr, &first), "ann*;bo;");
    assert_eq!(tmpl::evaluate(&expr, &second), "cy;");
    assert_eq!(tmpl::evaluate(&expr, &first), "ann*;bo;");
}

#[test]
fn test_full_page() {
    let src = "\
Hello {{ user.name | default('guest') }}!
{% if cart.items %}You have {{ cart.items | length }} items:
{% for item in cart.items %}- {{ item.title }} x{{ item.qty }}{% if not loop.last %}
{% endif %}{% endfor %}{% else %}Your cart is empty.{% endif %}";
    let ctx = json!({
        "user": {"name": "Ada"},
        "cart": {"items": [
            {"title": "pen", "qty": 2},
            {"title": "ink", "qty": 1}
        ]}
    });
    assert_eq!(
        tmpl::render(src, &ctx),
        "Hello Ada!\nYou have 2 items:\n- pen x2\n- ink x1"
    );
    assert_eq!(
        tmpl::render(src, &json!({"cart": {"items": []}})),
        "Hello guest!\nYour cart is empty."
    );
}
