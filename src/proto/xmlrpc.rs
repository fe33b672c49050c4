//! XML-RPC wire codec.
//!
//! encode_call   -> `<methodCall>` document for a method + params
//! decode_response -> `Reply::Value` | `Reply::Fault`
//!
//! Decoding builds a small element tree from quick-xml events and then reads
//! values out of it. Text is never trimmed inside `<string>` / bare `<value>`.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDateTime;
use quick_xml::Reader;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::Event;

use super::value::Value;

/// Decoded `<methodResponse>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Value(Value),
    Fault { code: i64, message: String },
}

/* ---- Encoding ---- */

pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for p in params {
        out.push_str("<param>");
        encode_value(p, &mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>\n");
    out
}

fn encode_value(value: &Value, out: &mut String) {
    out.push_str("<value>");
    match value {
        Value::Nil => out.push_str("<nil/>"),
        Value::Bool(b) => {
            out.push_str(if *b { "<boolean>1</boolean>" } else { "<boolean>0</boolean>" })
        }
        Value::Int(n) => {
            if i32::try_from(*n).is_ok() {
                out.push_str(&format!("<int>{n}</int>"));
            } else {
                out.push_str(&format!("<i8>{n}</i8>"));
            }
        }
        Value::Double(d) => out.push_str(&format!("<double>{d}</double>")),
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::DateTime(dt) => out.push_str(&format!(
            "<dateTime.iso8601>{}</dateTime.iso8601>",
            dt.format("%Y%m%dT%H:%M:%S")
        )),
        Value::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&BASE64.encode(bytes));
            out.push_str("</base64>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(item, out);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(map) => {
            out.push_str("<struct>");
            for (k, v) in map {
                out.push_str("<member><name>");
                out.push_str(&escape(k.as_str()));
                out.push_str("</name>");
                encode_value(v, out);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

/* ---- Element tree ---- */

#[derive(Debug, Default)]
struct Node {
    name: String,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn only_child(&self) -> Result<&Node, String> {
        match self.children.as_slice() {
            [one] => Ok(one),
            [] => Err(format!("<{}> is empty", self.name)),
            _ => Err(format!("<{}> has more than one child", self.name)),
        }
    }
}

fn parse_tree(xml: &str) -> Result<Node, String> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("XML error at {}: {e}", reader.buffer_position()))?;
        match event {
            Event::Start(e) => stack.push(Node {
                name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                ..Node::default()
            }),
            Event::Empty(e) => {
                let node = Node {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    ..Node::default()
                };
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack.pop().ok_or("unbalanced closing tag")?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let raw = String::from_utf8_lossy(t.as_ref()).into_owned();
                    let text = unescape(&raw).map_err(|e| format!("bad escape: {e}"))?;
                    top.text.push_str(&text);
                }
            }
            Event::GeneralRef(r) => {
                if let Some(top) = stack.last_mut() {
                    let entity = format!("&{};", String::from_utf8_lossy(r.as_ref()));
                    let text = unescape(&entity).map_err(|e| format!("bad entity: {e}"))?;
                    top.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(c.as_ref()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("document ended inside an element".into());
    }
    root.ok_or_else(|| "empty document".into())
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err("more than one root element".into()),
    }
    Ok(())
}

/* ---- Decoding ---- */

pub fn decode_response(xml: &str) -> Result<Reply, String> {
    let root = parse_tree(xml)?;
    if root.name != "methodResponse" {
        return Err(format!("expected <methodResponse>, got <{}>", root.name));
    }
    if let Some(fault) = root.child("fault") {
        let value = decode_value(fault.only_child()?)?;
        let code = match value.get("faultCode") {
            Some(Value::Int(n)) => *n,
            _ => 0,
        };
        let message = value
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Ok(Reply::Fault { code, message });
    }
    let params = root.child("params").ok_or("response has neither params nor fault")?;
    let param = params.only_child()?;
    Ok(Reply::Value(decode_value(param.only_child()?)?))
}

fn decode_value(node: &Node) -> Result<Value, String> {
    if node.name != "value" {
        return Err(format!("expected <value>, got <{}>", node.name));
    }
    let Some(typed) = node.children.first() else {
        return Ok(Value::String(node.text.clone()));
    };
    let text = typed.text.as_str();
    match typed.name.as_str() {
        "string" => Ok(Value::String(text.to_string())),
        "int" | "i4" | "i8" => text
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| format!("bad integer '{text}': {e}")),
        "boolean" => match text.trim() {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            other => Err(format!("bad boolean '{other}'")),
        },
        "double" => text
            .trim()
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|e| format!("bad double '{text}': {e}")),
        "dateTime.iso8601" => parse_datetime(text.trim()).map(Value::DateTime),
        "base64" => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            BASE64
                .decode(compact)
                .map(Value::Base64)
                .map_err(|e| format!("bad base64: {e}"))
        }
        "nil" => Ok(Value::Nil),
        "array" => {
            let data = typed.child("data").ok_or("<array> without <data>")?;
            data.children
                .iter()
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut map = BTreeMap::new();
            for member in &typed.children {
                let name = member.child("name").ok_or("<member> without <name>")?;
                let value = member.child("value").ok_or("<member> without <value>")?;
                map.insert(name.text.clone(), decode_value(value)?);
            }
            Ok(Value::Struct(map))
        }
        other => Err(format!("unsupported value type <{other}>")),
    }
}

fn parse_datetime(text: &str) -> Result<NaiveDateTime, String> {
    ["%Y%m%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y%m%dT%H%M%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .ok_or_else(|| format!("bad dateTime '{text}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_escapes_markup() {
        let xml = encode_call("run_command", &[Value::from("a<b&c"), Value::Int(5)]);
        assert!(xml.contains("<methodName>run_command</methodName>"));
        assert!(xml.contains("<string>a&lt;b&amp;c</string>"));
        assert!(xml.contains("<int>5</int>"));
    }

    #[test]
    fn decode_struct_and_array() {
        let xml = r#"<?xml version="1.0"?>
<methodResponse><params><param><value><array><data>
  <value><struct>
    <member><name>name</name><value><string>foo &amp; bar</string></value></member>
    <member><name>uid</name><value><int>1001</int></value></member>
    <member><name>ok</name><value><boolean>1</boolean></value></member>
  </struct></value>
  <value>  spaced  </value>
  <value><nil/></value>
</data></array></value></param></params></methodResponse>"#;
        let Reply::Value(v) = decode_response(xml).unwrap() else {
            panic!("expected value");
        };
        let items = v.as_array().unwrap();
        assert_eq!(items[0].get("name"), Some(&Value::from("foo & bar")));
        assert_eq!(items[0].get("uid"), Some(&Value::Int(1001)));
        assert_eq!(items[0].get("ok"), Some(&Value::Bool(true)));
        assert_eq!(items[1], Value::from("  spaced  "));
        assert_eq!(items[2], Value::Nil);
    }

    #[test]
    fn decode_fault() {
        let xml = r#"<methodResponse><fault><value><struct>
<member><name>faultCode</name><value><int>1</int></value></member>
<member><name>faultString</name><value><string>Cerebrum.modules.bofhd.errors.CerebrumError:No such user</string></value></member>
</struct></value></fault></methodResponse>"#;
        assert_eq!(
            decode_response(xml).unwrap(),
            Reply::Fault {
                code: 1,
                message: "Cerebrum.modules.bofhd.errors.CerebrumError:No such user".into()
            }
        );
    }

    #[test]
    fn decode_datetime_and_base64() {
        let xml = r#"<methodResponse><params><param><value><array><data>
<value><dateTime.iso8601>20200101T13:37:00</dateTime.iso8601></value>
<value><base64>aGk=</base64></value>
</data></array></value></param></params></methodResponse>"#;
        let Reply::Value(Value::Array(items)) = decode_response(xml).unwrap() else {
            panic!("expected array");
        };
        assert_eq!(items[0].to_string(), "2020-01-01 13:37:00");
        assert_eq!(items[1], Value::Base64(b"hi".to_vec()));
    }

    #[test]
    fn encoded_call_decodes_back_as_params() {
        let params = [crate::record! { "k" => ":None", "n" => 3 }];
        let xml = encode_call("m", &params).replace("methodCall", "methodResponse");
        let xml = xml.replace("<methodName>m</methodName>", "");
        assert_eq!(decode_response(&xml).unwrap(), Reply::Value(params[0].clone()));
    }

    #[test]
    fn rejects_wrong_root() {
        let err = decode_response("<html><body/></html>").unwrap_err();
        assert!(err.contains("methodResponse"));
    }

    #[test]
    fn rejects_unknown_type() {
        let xml = "<methodResponse><params><param><value><blob/></value></param></params></methodResponse>";
        assert!(decode_response(xml).unwrap_err().contains("blob"));
    }
}
