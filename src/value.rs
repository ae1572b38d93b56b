use serde_json::Value;
use std::cmp::Ordering;

/// Compare two values and hand the ordering (-1, 0, 1) to `pred_on_ord`.
pub fn cmp_values<F>(a: &Value, b: &Value, pred_on_ord: F) -> bool
where
    F: Fn(i32) -> bool,
{
    match (a, b) {
        (Value::String(sa), Value::String(sb)) => pred_on_ord(sa.cmp(sb) as i32),
        (Value::Number(na), Value::Number(nb)) => match (na.as_f64(), nb.as_f64()) {
            (Some(da), Some(db)) => pred_on_ord(float_ord(da, db)),
            _ => pred_on_ord(0) && na == nb,
        },
        (Value::Bool(ba), Value::Bool(bb)) => pred_on_ord((*ba as i32) - (*bb as i32)),
        (Value::Number(na), Value::String(sb)) => match (na.as_f64(), sb.trim().parse::<f64>()) {
            (Some(da), Ok(db)) => pred_on_ord(float_ord(da, db)),
            _ => pred_on_ord(a.to_string().cmp(&b.to_string()) as i32),
        },
        (Value::String(sa), Value::Number(nb)) => match (sa.trim().parse::<f64>(), nb.as_f64()) {
            (Ok(da), Some(db)) => pred_on_ord(float_ord(da, db)),
            _ => pred_on_ord(a.to_string().cmp(&b.to_string()) as i32),
        },
        _ => pred_on_ord(a.to_string().cmp(&b.to_string()) as i32),
    }
}

fn float_ord(da: f64, db: f64) -> i32 {
    match da.partial_cmp(&db) {
        Some(Ordering::Less) => -1,
        Some(Ordering::Greater) => 1,
        _ => 0,
    }
}

/// Null, false, zero, and empty strings, sequences or mappings are falsy.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Text form of a value as it appears in rendered output.
pub fn render_value(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => v.to_string(),
    }
}

/// Walk `segments` from `root`: keys through mappings, numeric segments
/// through sequences. `None` as soon as a segment does not resolve.
pub fn lookup<'a, S: AsRef<str>>(root: &'a Value, segments: &[S]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |node, seg| {
        let seg = seg.as_ref();
        match node {
            Value::Object(map) => map.get(seg),
            Value::Array(arr) => seg.parse::<usize>().ok().and_then(|i| arr.get(i)),
            _ => None,
        }
    })
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn falsy_values() {
        for v in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert!(!truthy(&v), "{v} should be falsy");
        }
        for v in [json!(true), json!(1), json!("0"), json!([0]), json!({"a": null})] {
            assert!(truthy(&v), "{v} should be truthy");
        }
    }

    #[test]
    fn numeric_string_compares_numerically() {
        assert!(cmp_values(&json!(10), &json!("9"), |o| o > 0));
        assert!(cmp_values(&json!("2.0"), &json!(2), |o| o == 0));
        assert!(cmp_values(&json!("abc"), &json!("abd"), |o| o < 0));
    }

    #[test]
    fn tiny_floats_are_not_collapsed() {
        assert!(cmp_values(&json!(1e-17), &json!(2e-17), |o| o < 0));
        assert!(!cmp_values(&json!(1e-17), &json!(2e-17), |o| o == 0));
        assert!(cmp_values(&json!(2e-17), &json!("2e-17"), |o| o == 0));
    }

    #[test]
    fn lookup_through_maps_and_sequences() {
        let data = json!({"a": {"items": [{"n": "x"}, {"n": "y"}]}});
        assert_eq!(lookup(&data, &["a", "items", "1", "n"]), Some(&json!("y")));
        assert_eq!(lookup(&data, &["a", "items", "7", "n"]), None);
        assert_eq!(lookup(&data, &["a", "items", "n"]), None);
        assert_eq!(lookup(&data, &["a", "missing"]), None);
    }

    #[test]
    fn renders_scalars_and_containers() {
        assert_eq!(render_value(&json!(null)), "");
        assert_eq!(render_value(&json!(false)), "false");
        assert_eq!(render_value(&json!(3)), "3");
        assert_eq!(render_value(&json!("hi")), "hi");
        assert_eq!(render_value(&json!([1, "a"])), r#"[1,"a"]"#);
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<a href='x'>&</a>"), "&lt;a href=&#x27;x&#x27;&gt;&amp;&lt;/a&gt;");
    }
}
