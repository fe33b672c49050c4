//! Structured values exchanged with bofhd.
//!
//! `Value` mirrors the XML-RPC data model. bofhd layers its own string
//! convention on top (`":None"` for nil, a leading `:` escaped as `::`),
//! handled here by [`wash`] on the way in and [`escape_arg`] on the way out.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

/// A response record: field name to value.
pub type Record = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    DateTime(NaiveDateTime),
    Base64(Vec<u8>),
    Array(Vec<Value>),
    Struct(Record),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Record> {
        match self {
            Value::Struct(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(n) => Some(*n != 0),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::DateTime(_) => "dateTime",
            Value::Base64(_) => "base64",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
        }
    }

    /// Look up a field when this value is a struct.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_struct().and_then(|m| m.get(key))
    }
}

/// Decode the bofhd string convention recursively.
///
/// `":None"` becomes [`Value::Nil`]; any other string starting with `:` loses
/// its first character.
pub fn wash(value: Value) -> Value {
    match value {
        Value::String(s) if s.starts_with(':') => {
            if s == ":None" {
                Value::Nil
            } else {
                Value::String(s[1..].to_string())
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(wash).collect()),
        Value::Struct(map) => Value::Struct(map.into_iter().map(|(k, v)| (k, wash(v))).collect()),
        other => other,
    }
}

/// Escape a single outgoing argument: the server strips one leading `:`.
pub fn escape_arg(value: Value) -> Value {
    match value {
        Value::String(s) if s.starts_with(':') => Value::String(format!(":{s}")),
        other => other,
    }
}

/// Render a float the way the server-side tooling does (`1.0`, not `1`).
pub(crate) fn float_text(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(d) => f.write_str(&float_text(*d)),
            Value::String(s) => f.write_str(s),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Base64(bytes) => f.write_str(&BASE64.encode(bytes)),
            Value::Array(_) | Value::Struct(_) => {
                let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&text)
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Double(d) => serializer.serialize_f64(*d),
            Value::String(s) => serializer.serialize_str(s),
            Value::DateTime(dt) => {
                serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            Value::Base64(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Struct(map) => serializer.collect_map(map),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Record> for Value {
    fn from(map: Record) -> Self {
        Value::Struct(map)
    }
}

/// Build a [`Value::Struct`] from `key => value` pairs.
#[macro_export]
macro_rules! record {
    ($($k:expr => $v:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::proto::Record::new();
        $( map.insert(::std::string::String::from($k), $crate::proto::Value::from($v)); )*
        $crate::proto::Value::Struct(map)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wash_decodes_nil_and_escapes() {
        assert_eq!(wash(Value::from(":None")), Value::Nil);
        assert_eq!(wash(Value::from("::None")), Value::from(":None"));
        assert_eq!(wash(Value::from("None")), Value::from("None"));
        assert_eq!(
            wash(Value::Array(vec![
                Value::from("None"),
                Value::from(":None"),
                Value::from("::None"),
            ])),
            Value::Array(vec![Value::from("None"), Value::Nil, Value::from(":None")])
        );
    }

    #[test]
    fn wash_walks_structs() {
        let washed = wash(crate::record! { "quarantine" => ":None", "name" => "foo" });
        assert_eq!(washed.get("quarantine"), Some(&Value::Nil));
        assert_eq!(washed.get("name"), Some(&Value::from("foo")));
    }

    #[test]
    fn escape_arg_only_touches_leading_colon() {
        assert_eq!(escape_arg(Value::from(":foo")), Value::from("::foo"));
        assert_eq!(escape_arg(Value::from("foo:bar")), Value::from("foo:bar"));
        assert_eq!(escape_arg(Value::Int(3)), Value::Int(3));
    }

    #[test]
    fn display_is_python_flavoured() {
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Double(1.0).to_string(), "1.0");
        assert_eq!(Value::Double(0.25).to_string(), "0.25");
        let dt = NaiveDateTime::parse_from_str("2020-01-01 13:37:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        assert_eq!(Value::DateTime(dt).to_string(), "2020-01-01 13:37:00");
    }

    #[test]
    fn serializes_to_json() {
        let v = crate::record! { "id" => 7, "tags" => vec![Value::from("a")], "gone" => Value::Nil };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json, serde_json::json!({"id": 7, "tags": ["a"], "gone": null}));
    }
}
