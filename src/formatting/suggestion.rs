//! Format suggestions: the server-declared recipe for rendering a response.
//!
//! A descriptor is a struct with an optional `hdr` string and a `str_vars`
//! body. The body arrives in one of three shapes:
//!
//! - a literal string, rendered as-is
//! - a single `(template, [field, ...], sub_header?)` tuple
//! - a list of such tuples
//!
//! All three are normalised into a [`FormatSuggestion`] holding an ordered
//! list of [`FormatItem`]s, so nothing downstream cares which one was sent.

use crate::proto::{Error, Record, Result, Value};

pub const KEY_HEADER: &str = "hdr";
pub const KEY_STRING_VARS: &str = "str_vars";

/// Value transform attached to a field reference (`name:type:params`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldHint {
    /// `date` with a Java SimpleDateFormat pattern, e.g. `yyyy-MM-dd`.
    Date(String),
    /// Any other type name; rendering an item that uses it fails.
    Other { kind: String, params: String },
}

/// A named pointer into a response record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub name: String,
    pub hint: Option<FieldHint>,
}

impl FieldRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hint: None,
        }
    }

    /// Parse `name` or `name:type:params`.
    ///
    /// Anything that does not split into exactly three parts is taken as a
    /// plain field name, colons included.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(kind), Some(params)) => {
                let hint = match kind {
                    "" => None,
                    "date" => Some(FieldHint::Date(params.to_string())),
                    other => Some(FieldHint::Other {
                        kind: other.to_string(),
                        params: params.to_string(),
                    }),
                };
                Self {
                    name: name.to_string(),
                    hint,
                }
            }
            _ => Self::new(raw),
        }
    }
}

/// One conditionally rendered line template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatItem {
    pub template: String,
    pub fields: Vec<FieldRef>,
    pub sub_header: Option<String>,
}

impl FormatItem {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            template: text.into(),
            fields: Vec::new(),
            sub_header: None,
        }
    }

    /// Field names this item needs that `record` lacks.
    pub fn missing<'a>(&'a self, record: &Record) -> Vec<&'a str> {
        self.fields
            .iter()
            .filter(|f| !record.contains_key(&f.name))
            .map(|f| f.name.as_str())
            .collect()
    }

    /// True when every referenced field is present in `record`.
    pub fn matches(&self, record: &Record) -> bool {
        self.fields.iter().all(|f| record.contains_key(&f.name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatSuggestion {
    pub header: Option<String>,
    pub items: Vec<FormatItem>,
}

/// The three legal `str_vars` shapes, before normalisation.
enum Body<'a> {
    Literal(&'a str),
    Single(&'a [Value]),
    Many(&'a [Value]),
}

fn malformed(msg: impl Into<String>) -> Error {
    Error::MalformedSuggestion(msg.into())
}

impl FormatSuggestion {
    /// Parse a server descriptor.
    ///
    /// `Ok(None)` means the server declared no suggestion (nil, empty string
    /// or empty struct) and the command returns pre-formatted text.
    pub fn parse(descriptor: &Value) -> Result<Option<Self>> {
        let map = match descriptor {
            Value::Nil => return Ok(None),
            Value::String(s) if s.is_empty() => return Ok(None),
            Value::Struct(m) if m.is_empty() => return Ok(None),
            Value::Struct(m) => m,
            other => {
                return Err(malformed(format!(
                    "descriptor is a {}, expected a struct",
                    other.kind()
                )));
            }
        };

        let header = match map.get(KEY_HEADER) {
            None | Some(Value::Nil) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(malformed(format!("'{KEY_HEADER}' is a {}", other.kind())));
            }
        };

        let body = map
            .get(KEY_STRING_VARS)
            .ok_or_else(|| malformed(format!("missing '{KEY_STRING_VARS}'")))?;

        let items = match classify(body)? {
            Body::Literal(text) => vec![FormatItem::literal(text)],
            Body::Single(tuple) => vec![parse_tuple(tuple)?],
            Body::Many(tuples) => tuples
                .iter()
                .map(|t| {
                    t.as_array()
                        .ok_or_else(|| malformed(format!("list entry is a {}", t.kind())))
                        .and_then(parse_tuple)
                })
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(Some(Self { header, items }))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn classify(body: &Value) -> Result<Body<'_>> {
    match body {
        Value::String(s) => Ok(Body::Literal(s)),
        Value::Array(items) => match items.first() {
            Some(Value::String(_)) => Ok(Body::Single(items)),
            _ => Ok(Body::Many(items)),
        },
        other => Err(malformed(format!(
            "'{KEY_STRING_VARS}' is a {}",
            other.kind()
        ))),
    }
}

fn parse_tuple(tuple: &[Value]) -> Result<FormatItem> {
    let (template, refs, sub_header) = match tuple {
        [t, r] => (t, r, None),
        [t, r, s] => (t, r, Some(s)),
        _ => {
            return Err(malformed(format!(
                "tuple has {} element(s), expected 2 or 3",
                tuple.len()
            )));
        }
    };

    let mut template = template
        .as_str()
        .ok_or_else(|| malformed(format!("template is a {}", template.kind())))?
        .to_string();

    let fields = match refs {
        Value::Nil => Vec::new(),
        Value::Array(names) => names
            .iter()
            .map(|n| {
                n.as_str()
                    .map(FieldRef::parse)
                    .ok_or_else(|| malformed(format!("field reference is a {}", n.kind())))
            })
            .collect::<Result<Vec<_>>>()?,
        other => {
            return Err(malformed(format!(
                "field reference list is a {}",
                other.kind()
            )));
        }
    };

    let mut sub_header = match sub_header {
        None | Some(Value::Nil) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => return Err(malformed(format!("sub-header is a {}", other.kind()))),
    };

    // Some servers send the template in the third slot.
    if let Some(h) = &sub_header
        && h.contains('%')
    {
        template = h.clone();
        sub_header = None;
    }

    Ok(FormatItem {
        template,
        fields,
        sub_header,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    fn tuple(template: &str, fields: &[&str]) -> Value {
        Value::Array(vec![
            Value::from(template),
            Value::Array(fields.iter().map(|f| Value::from(*f)).collect()),
        ])
    }

    #[test]
    fn field_ref_plain() {
        let f = FieldRef::parse("foo");
        assert_eq!(f.name, "foo");
        assert_eq!(f.hint, None);
    }

    #[test]
    fn field_ref_typed() {
        let f = FieldRef::parse("expire:date:yyyy-MM-dd");
        assert_eq!(f.name, "expire");
        assert_eq!(f.hint, Some(FieldHint::Date("yyyy-MM-dd".into())));

        let f = FieldRef::parse("foo:bar:baz");
        assert_eq!(
            f.hint,
            Some(FieldHint::Other {
                kind: "bar".into(),
                params: "baz".into()
            })
        );
    }

    #[test]
    fn field_ref_two_parts_is_a_name() {
        assert_eq!(FieldRef::parse("foo:bar"), FieldRef::new("foo:bar"));
    }

    #[test]
    fn literal_body() {
        let s = FormatSuggestion::parse(&record! { "str_vars" => "foo" })
            .unwrap()
            .unwrap();
        assert_eq!(s.items, vec![FormatItem::literal("foo")]);
        assert_eq!(s.header, None);
    }

    #[test]
    fn single_tuple_body() {
        let s = FormatSuggestion::parse(&record! {
            "hdr" => "Header",
            "str_vars" => tuple("name: %s", &["name"]),
        })
        .unwrap()
        .unwrap();
        assert_eq!(s.header.as_deref(), Some("Header"));
        assert_eq!(s.len(), 1);
        assert_eq!(s.items[0].fields, vec![FieldRef::new("name")]);
    }

    #[test]
    fn list_body_keeps_order_and_fields() {
        let s = FormatSuggestion::parse(&record! {
            "str_vars" => vec![
                tuple("%s %s", &["x", "y"]),
                tuple("%dx%d", &["width", "height"]),
                Value::Array(vec!["Spreads: %s".into(), vec![Value::from("spread")].into(), "Spreads".into()]),
            ],
        })
        .unwrap()
        .unwrap();
        let names: Vec<Vec<&str>> = s
            .items
            .iter()
            .map(|i| i.fields.iter().map(|f| f.name.as_str()).collect())
            .collect();
        assert_eq!(names, vec![vec!["x", "y"], vec!["width", "height"], vec!["spread"]]);
        assert_eq!(s.items[2].sub_header.as_deref(), Some("Spreads"));
    }

    #[test]
    fn template_in_third_slot_is_swapped() {
        let s = FormatSuggestion::parse(&record! {
            "str_vars" => vec![Value::Array(vec![
                "Entity".into(),
                vec![Value::from("id")].into(),
                "id=%s".into(),
            ])],
        })
        .unwrap()
        .unwrap();
        assert_eq!(s.items[0].template, "id=%s");
        assert_eq!(s.items[0].sub_header, None);
    }

    #[test]
    fn absent_suggestions() {
        assert_eq!(FormatSuggestion::parse(&Value::Nil).unwrap(), None);
        assert_eq!(FormatSuggestion::parse(&Value::from("")).unwrap(), None);
        assert_eq!(FormatSuggestion::parse(&record! {}).unwrap(), None);
    }

    #[test]
    fn malformed_shapes() {
        let bad = [
            Value::Int(3),
            record! { "hdr" => "only a header" },
            record! { "str_vars" => 5 },
            record! { "str_vars" => vec![Value::Array(vec!["%s".into()])] },
            record! { "str_vars" => vec![Value::Array(vec!["%s".into(), vec![Value::Int(1)].into()])] },
            record! { "str_vars" => vec![Value::from("a"), Value::Int(1), Value::Nil, Value::Nil] },
            record! { "str_vars" => vec![Value::Int(1)] },
        ];
        for descriptor in &bad {
            let err = FormatSuggestion::parse(descriptor).unwrap_err();
            assert!(
                matches!(err, Error::MalformedSuggestion(_)),
                "{descriptor:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn item_matching() {
        let item = FormatItem {
            template: "%s %s".into(),
            fields: vec![FieldRef::new("a"), FieldRef::new("b")],
            sub_header: None,
        };
        let only_a = match record! { "a" => 1 } {
            Value::Struct(m) => m,
            _ => unreachable!(),
        };
        assert!(!item.matches(&only_a));
        assert_eq!(item.missing(&only_a), vec!["b"]);
    }
}
