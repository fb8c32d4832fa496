//! Method-response parsing
//!
//! A hand-rolled recursive-descent reader for `<methodResponse>` documents.
//! The grammar is closed and tiny, so the reader matches tags directly
//! instead of going through a generic XML event stream. Attributes are
//! tolerated and ignored; comments and the XML prolog are skipped.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Outcome of one XML-RPC round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The `<params>` payload of a successful call.
    Success(Value),
    /// A `<fault>` raised by the remote method.
    Fault { code: i64, message: String },
}

#[derive(Error, Debug)]
#[error("invalid XML-RPC response at byte {offset}: {message}")]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

/// Parse a complete `<methodResponse>` document.
pub fn parse_response(xml: &str) -> Result<Response, ParseError> {
    let mut reader = Reader::new(xml);
    reader.skip_misc();
    reader.expect_open("methodResponse")?;
    reader.skip_misc();

    let response = if reader.at_open("params") {
        reader.expect_open("params")?;
        reader.skip_misc();
        reader.expect_open("param")?;
        reader.skip_misc();
        let value = reader.parse_value()?;
        reader.skip_misc();
        reader.expect_close("param")?;
        reader.skip_misc();
        reader.expect_close("params")?;
        Response::Success(value)
    } else if reader.at_open("fault") {
        reader.expect_open("fault")?;
        reader.skip_misc();
        let value = reader.parse_value()?;
        reader.skip_misc();
        reader.expect_close("fault")?;
        fault_from_value(value)
    } else {
        return Err(reader.error("expected <params> or <fault>"));
    };

    reader.skip_misc();
    reader.expect_close("methodResponse")?;
    Ok(response)
}

fn fault_from_value(value: Value) -> Response {
    let code = value
        .get("faultCode")
        .and_then(Value::as_i64)
        .unwrap_or_default();
    let message = match value.get("faultString") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => value.to_string(),
    };
    Response::Fault { code, message }
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    /// Skip whitespace, the XML prolog and comments.
    fn skip_misc(&mut self) {
        loop {
            let trimmed = self.rest().trim_start();
            self.pos = self.src.len() - trimmed.len();
            if let Some(after) = trimmed.strip_prefix("<?") {
                match after.find("?>") {
                    Some(end) => self.pos += 2 + end + 2,
                    None => self.pos = self.src.len(),
                }
            } else if let Some(after) = trimmed.strip_prefix("<!--") {
                match after.find("-->") {
                    Some(end) => self.pos += 4 + end + 3,
                    None => self.pos = self.src.len(),
                }
            } else {
                return;
            }
        }
    }

    /// Whether the next markup is an opening `<tag ...>` for `tag`.
    fn at_open(&self, tag: &str) -> bool {
        let rest = self.rest();
        rest.strip_prefix('<')
            .and_then(|r| r.strip_prefix(tag))
            .map(|r| r.starts_with('>') || r.starts_with('/') || r.starts_with(char::is_whitespace))
            .unwrap_or(false)
    }

    fn at_close(&self, tag: &str) -> bool {
        let rest = self.rest();
        rest.strip_prefix("</")
            .and_then(|r| r.strip_prefix(tag))
            .map(|r| r.trim_start().starts_with('>'))
            .unwrap_or(false)
    }

    /// Consume `<tag ...>`; returns true when the tag was self-closing.
    fn expect_open_any(&mut self) -> Result<(&'a str, bool), ParseError> {
        if !self.rest().starts_with('<') {
            return Err(self.error("expected an opening tag"));
        }
        let inner_start = self.pos + 1;
        let close = self.rest()[1..]
            .find('>')
            .ok_or_else(|| self.error("unterminated tag"))?;
        let inner = &self.src[inner_start..inner_start + close];
        self.pos = inner_start + close + 1;

        let self_closing = inner.ends_with('/');
        let inner = inner.trim_end_matches('/');
        let name = inner
            .split(|c: char| c.is_whitespace())
            .next()
            .unwrap_or(inner);
        if name.is_empty() || name.starts_with('/') {
            return Err(self.error("expected an opening tag"));
        }
        Ok((name, self_closing))
    }

    fn expect_open(&mut self, tag: &str) -> Result<(), ParseError> {
        if !self.at_open(tag) {
            return Err(self.error(&format!("expected <{tag}>")));
        }
        let (_, self_closing) = self.expect_open_any()?;
        if self_closing {
            return Err(self.error(&format!("<{tag}/> may not be self-closing here")));
        }
        Ok(())
    }

    fn expect_close(&mut self, tag: &str) -> Result<(), ParseError> {
        if !self.at_close(tag) {
            return Err(self.error(&format!("expected </{tag}>")));
        }
        let close = self
            .rest()
            .find('>')
            .ok_or_else(|| self.error("unterminated tag"))?;
        self.pos += close + 1;
        Ok(())
    }

    /// Raw character data up to the next `<`, with references decoded.
    fn text(&mut self) -> Result<String, ParseError> {
        let end = self.rest().find('<').unwrap_or(self.rest().len());
        let raw = &self.rest()[..end];
        self.pos += end;
        decode_references(raw).map_err(|message| ParseError {
            offset: self.pos,
            message,
        })
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        if !self.at_open("value") {
            return Err(self.error("expected <value>"));
        }
        let (_, self_closing) = self.expect_open_any()?;
        if self_closing {
            // <value/> is an empty string
            return Ok(Value::String(String::new()));
        }

        // A <value> without a type tag is an implicit string; whitespace
        // before a type tag is markup spacing, not content.
        let spacing = self.rest().len() - self.rest().trim_start().len();
        let peek = &self.rest()[spacing..];
        if !peek.starts_with('<') || peek.starts_with("</") {
            let text = self.text()?;
            self.expect_close("value")?;
            return Ok(Value::String(text));
        }
        self.pos += spacing;

        let (tag, self_closing) = self.expect_open_any()?;
        let value = match tag {
            "nil" => {
                if !self_closing {
                    self.expect_close("nil")?;
                }
                Value::Null
            }
            _ if self_closing => match tag {
                "string" | "dateTime.iso8601" | "base64" => Value::String(String::new()),
                _ => return Err(self.error(&format!("<{tag}/> has no value"))),
            },
            "int" | "i4" | "i8" => {
                let text = self.text()?;
                let n = text.trim().parse::<i64>().map_err(|_| {
                    self.error(&format!("invalid integer literal '{}'", text.trim()))
                })?;
                self.expect_close(tag)?;
                Value::Number(Number::from(n))
            }
            "boolean" => {
                let text = self.text()?;
                let b = match text.trim() {
                    "1" | "true" => true,
                    "0" | "false" => false,
                    other => {
                        return Err(self.error(&format!("invalid boolean literal '{other}'")))
                    }
                };
                self.expect_close("boolean")?;
                Value::Bool(b)
            }
            "double" => {
                let text = self.text()?;
                let f = text.trim().parse::<f64>().map_err(|_| {
                    self.error(&format!("invalid double literal '{}'", text.trim()))
                })?;
                self.expect_close("double")?;
                Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| self.error("double literal is not a finite number"))?
            }
            "string" | "dateTime.iso8601" | "base64" => {
                let text = self.text()?;
                self.expect_close(tag)?;
                Value::String(text)
            }
            "array" => {
                self.skip_misc();
                self.expect_open("data")?;
                let mut items = Vec::new();
                loop {
                    self.skip_misc();
                    if !self.at_open("value") {
                        break;
                    }
                    items.push(self.parse_value()?);
                }
                self.expect_close("data")?;
                self.skip_misc();
                self.expect_close("array")?;
                Value::Array(items)
            }
            "struct" => {
                let mut map = Map::new();
                loop {
                    self.skip_misc();
                    if !self.at_open("member") {
                        break;
                    }
                    self.expect_open("member")?;
                    self.skip_misc();
                    self.expect_open("name")?;
                    let name = self.text()?;
                    self.expect_close("name")?;
                    self.skip_misc();
                    let member = self.parse_value()?;
                    self.skip_misc();
                    self.expect_close("member")?;
                    map.insert(name, member);
                }
                self.expect_close("struct")?;
                Value::Object(map)
            }
            other => return Err(self.error(&format!("unsupported value tag <{other}>"))),
        };

        self.skip_misc();
        self.expect_close("value")?;
        Ok(value)
    }
}

fn decode_references(raw: &str) -> Result<String, String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let semi = rest
            .find(';')
            .ok_or_else(|| "unterminated character reference".to_string())?;
        let entity = &rest[1..semi];
        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                let ch = code
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("unknown character reference '&{entity};'"))?;
                out.push(ch);
            }
        }
        rest = &rest[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn success(inner: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?>\n<methodResponse><params><param>{inner}</param></params></methodResponse>"
        )
    }

    #[test]
    fn parses_integer_result() {
        let response = parse_response(&success("<value><int>7</int></value>")).unwrap();
        assert_eq!(response, Response::Success(json!(7)));
    }

    #[test]
    fn parses_i4_alias() {
        let response = parse_response(&success("<value><i4>-12</i4></value>")).unwrap();
        assert_eq!(response, Response::Success(json!(-12)));
    }

    #[test]
    fn parses_boolean_false() {
        let response = parse_response(&success("<value><boolean>0</boolean></value>")).unwrap();
        assert_eq!(response, Response::Success(json!(false)));
    }

    #[test]
    fn parses_untyped_value_as_string() {
        let response = parse_response(&success("<value>plain text</value>")).unwrap();
        assert_eq!(response, Response::Success(json!("plain text")));
    }

    #[test]
    fn parses_empty_string_value() {
        let response = parse_response(&success("<value><string></string></value>")).unwrap();
        assert_eq!(response, Response::Success(json!("")));
    }

    #[test]
    fn parses_nil_as_null() {
        let response = parse_response(&success("<value><nil/></value>")).unwrap();
        assert_eq!(response, Response::Success(Value::Null));
    }

    #[test]
    fn parses_datetime_and_base64_as_strings() {
        let response = parse_response(&success(
            "<value><dateTime.iso8601>20240105T10:00:00</dateTime.iso8601></value>",
        ))
        .unwrap();
        assert_eq!(response, Response::Success(json!("20240105T10:00:00")));

        let response =
            parse_response(&success("<value><base64>aGVsbG8=</base64></value>")).unwrap();
        assert_eq!(response, Response::Success(json!("aGVsbG8=")));
    }

    #[test]
    fn parses_nested_array_of_structs() {
        let inner = "<value><array><data>\
            <value><struct>\
            <member><name>id</name><value><int>3</int></value></member>\
            <member><name>name</name><value><string>Main</string></value></member>\
            </struct></value>\
            </data></array></value>";
        let response = parse_response(&success(inner)).unwrap();
        assert_eq!(
            response,
            Response::Success(json!([{"id": 3, "name": "Main"}]))
        );
    }

    #[test]
    fn parses_whitespace_between_tags() {
        let inner = "<value>\n  <array>\n    <data>\n      <value><int>1</int></value>\n    </data>\n  </array>\n</value>";
        let response = parse_response(&success(inner)).unwrap();
        assert_eq!(response, Response::Success(json!([1])));
    }

    #[test]
    fn tolerates_spacing_before_the_type_tag() {
        let response =
            parse_response(&success("<value>\n  <int>5</int>\n</value>")).unwrap();
        assert_eq!(response, Response::Success(json!(5)));
    }

    #[test]
    fn keeps_whitespace_in_untyped_values() {
        let response = parse_response(&success("<value>  two words</value>")).unwrap();
        assert_eq!(response, Response::Success(json!("  two words")));
    }

    #[test]
    fn decodes_character_references() {
        let response = parse_response(&success(
            "<value><string>a &lt; b &amp; &#169; &#x41;</string></value>",
        ))
        .unwrap();
        assert_eq!(response, Response::Success(json!("a < b & \u{a9}A")));
    }

    #[test]
    fn parses_fault_with_code_and_string() {
        let xml = "<?xml version=\"1.0\"?><methodResponse><fault><value><struct>\
            <member><name>faultCode</name><value><int>2</int></value></member>\
            <member><name>faultString</name><value><string>Access Denied</string></value></member>\
            </struct></value></fault></methodResponse>";
        let response = parse_response(xml).unwrap();
        assert_eq!(
            response,
            Response::Fault {
                code: 2,
                message: "Access Denied".to_string()
            }
        );
    }

    #[test]
    fn rejects_truncated_document() {
        let err = parse_response("<methodResponse><params><param><value><int>7")
            .unwrap_err();
        assert!(err.to_string().contains("invalid XML-RPC response"));
    }

    #[test]
    fn rejects_unknown_value_tag() {
        let err = parse_response(&success("<value><blob>x</blob></value>")).unwrap_err();
        assert!(err.message.contains("unsupported value tag"));
    }

    #[test]
    fn rejects_non_numeric_int() {
        let err = parse_response(&success("<value><int>seven</int></value>")).unwrap_err();
        assert!(err.message.contains("invalid integer literal"));
    }
}
