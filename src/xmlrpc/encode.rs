//! Method-call serialization
//!
//! Value mapping: null becomes `<nil/>`, booleans `<boolean>`, integers
//! `<int>`, floats `<double>`, strings `<string>`, arrays `<array><data>`
//! and objects `<struct><member>`. Integers outside the i64 range fall back
//! to `<double>`, matching what the 32/64-bit-agnostic servers accept.

use serde_json::Value;

/// Serialize a complete `<methodCall>` document.
pub fn method_call(method: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(256);
    out.push_str("<?xml version=\"1.0\"?>");
    out.push_str("<methodCall><methodName>");
    escape_into(method, &mut out);
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(param, &mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

fn write_value(value: &Value, out: &mut String) {
    out.push_str("<value>");
    match value {
        Value::Null => out.push_str("<nil/>"),
        Value::Bool(b) => {
            out.push_str("<boolean>");
            out.push(if *b { '1' } else { '0' });
            out.push_str("</boolean>");
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str("<int>");
                out.push_str(&i.to_string());
                out.push_str("</int>");
            } else {
                let f = n.as_f64().unwrap_or(0.0);
                out.push_str("<double>");
                out.push_str(&f.to_string());
                out.push_str("</double>");
            }
        }
        Value::String(s) => {
            out.push_str("<string>");
            escape_into(s, out);
            out.push_str("</string>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(item, out);
            }
            out.push_str("</data></array>");
        }
        Value::Object(map) => {
            out.push_str("<struct>");
            for (name, member) in map {
                out.push_str("<member><name>");
                escape_into(name, out);
                out.push_str("</name>");
                write_value(member, out);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_scalars() {
        let body = method_call("ping", &[json!(42), json!(true), json!("hi"), json!(1.5)]);
        assert!(body.contains("<methodName>ping</methodName>"));
        assert!(body.contains("<value><int>42</int></value>"));
        assert!(body.contains("<value><boolean>1</boolean></value>"));
        assert!(body.contains("<value><string>hi</string></value>"));
        assert!(body.contains("<value><double>1.5</double></value>"));
    }

    #[test]
    fn encodes_null_as_nil() {
        let body = method_call("ping", &[Value::Null]);
        assert!(body.contains("<value><nil/></value>"));
    }

    #[test]
    fn encodes_nested_array_and_struct() {
        let body = method_call(
            "execute_kw",
            &[json!([["name", "=", "Azure"]]), json!({"limit": 5})],
        );
        let domain = concat!(
            "<array><data><value><array><data>",
            "<value><string>name</string></value>",
            "<value><string>=</string></value>",
            "<value><string>Azure</string></value>",
            "</data></array></value></data></array>"
        );
        assert!(body.contains(domain), "body was: {body}");
        assert!(body.contains(
            "<struct><member><name>limit</name><value><int>5</int></value></member></struct>"
        ));
    }

    #[test]
    fn escapes_markup_in_strings() {
        let body = method_call("echo", &[json!("a < b && c > \"d\"")]);
        assert!(body.contains("<string>a &lt; b &amp;&amp; c &gt; &quot;d&quot;</string>"));
    }
}
