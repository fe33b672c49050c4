//! Rendering of responses into display text.
//!
//! Rendering is a pure function of (suggestion, response): no I/O, inputs are
//! only borrowed. Per record, each item is all-or-nothing: it renders only if
//! every field it references is present and converts cleanly, otherwise it
//! is skipped without a placeholder.

use std::fmt::Write as _;

use chrono::NaiveDateTime;
use thiserror::Error;

use super::suggestion::{FieldHint, FieldRef, FormatItem, FormatSuggestion};
use super::template::{TemplateError, substitute};
use crate::proto::{Record, Value};

/// Placeholder for nil field values.
pub const NOT_SET: &str = "<not set>";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("missing field '{0}'")]
    Missing(String),
    #[error("field '{field}' is a {kind}, not a date")]
    NotADate { field: String, kind: &'static str },
    #[error("invalid date pattern '{0}'")]
    BadDatePattern(String),
    #[error("unsupported field type '{0}'")]
    UnsupportedType(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Translate a Java SimpleDateFormat pattern into strftime syntax.
pub fn sdf_to_strftime(sdf: &str) -> String {
    const CONVERSIONS: [(&str, &str); 6] = [
        ("yyyy", "%Y"),
        ("MM", "%m"),
        ("dd", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];
    CONVERSIONS
        .iter()
        .fold(sdf.to_string(), |acc, (from, to)| acc.replace(from, to))
}

fn format_date(dt: &NaiveDateTime, sdf: &str) -> Result<String, FieldError> {
    let mut out = String::new();
    write!(out, "{}", dt.format(&sdf_to_strftime(sdf)))
        .map_err(|_| FieldError::BadDatePattern(sdf.to_string()))?;
    Ok(out)
}

/// Resolve one field of `record` into the value substituted into a template.
pub fn formatted_field(field: &FieldRef, record: &Record) -> Result<Value, FieldError> {
    let value = record
        .get(&field.name)
        .ok_or_else(|| FieldError::Missing(field.name.clone()))?;

    let value = match (&field.hint, value) {
        (_, Value::Nil) => return Ok(Value::from(NOT_SET)),
        (None, v) => v.clone(),
        (Some(FieldHint::Date(sdf)), Value::DateTime(dt)) => Value::String(format_date(dt, sdf)?),
        (Some(FieldHint::Date(_)), other) => {
            return Err(FieldError::NotADate {
                field: field.name.clone(),
                kind: other.kind(),
            });
        }
        (Some(FieldHint::Other { kind, .. }), _) => {
            return Err(FieldError::UnsupportedType(kind.clone()));
        }
    };
    Ok(value)
}

impl FormatItem {
    /// Render this item against one record.
    pub fn render(&self, record: &Record) -> Result<String, FieldError> {
        let values = self
            .fields
            .iter()
            .map(|f| formatted_field(f, record))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(substitute(&self.template, &values)?)
    }
}

/// Response formatter for one command.
#[derive(Debug, Clone, Copy)]
pub enum Formatter<'a> {
    /// No suggestion registered: the server sends pre-formatted text.
    Text,
    Suggestion(&'a FormatSuggestion),
}

impl<'a> Formatter<'a> {
    pub fn new(suggestion: Option<&'a FormatSuggestion>) -> Self {
        suggestion.map_or(Formatter::Text, Formatter::Suggestion)
    }

    pub fn format(&self, response: &Value) -> String {
        match self {
            Formatter::Text => match response {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            Formatter::Suggestion(s) => render_suggestion(s, response),
        }
    }
}

fn render_suggestion(suggestion: &FormatSuggestion, response: &Value) -> String {
    let records: Vec<&Value> = match response {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    let empty = Record::new();
    let mut lines: Vec<String> = Vec::new();

    for (idx, record) in records.into_iter().enumerate() {
        if idx == 0
            && let Some(header) = &suggestion.header
        {
            lines.push(header.clone());
        }
        let fields = match record {
            Value::String(text) => {
                lines.push(text.clone());
                continue;
            }
            Value::Struct(map) => map,
            _ => &empty,
        };
        for item in &suggestion.items {
            if !item.matches(fields) {
                continue;
            }
            let line = if item.fields.is_empty() {
                substitute(&item.template, &[]).unwrap_or_else(|_| item.template.clone())
            } else {
                match item.render(fields) {
                    Ok(line) => line,
                    Err(_) => continue,
                }
            };
            if let Some(sub_header) = &item.sub_header {
                lines.push(sub_header.clone());
            }
            lines.push(line);
        }
    }

    lines.join("\n")
}
