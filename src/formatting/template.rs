//! printf-style substitution for format-suggestion templates.
//!
//! Supported: `%s %r %d %i %u %f %F %e %E %x %X %o %%` with the `- 0 + space #`
//! flags, a width and a `.precision`. Length modifiers (`h`, `l`, `L`) are
//! accepted and ignored. Arguments are consumed positionally and every
//! argument must be consumed.

use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

use crate::proto::Value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("not enough arguments for format string")]
    NotEnoughArgs,
    #[error("not all arguments converted during string formatting")]
    TooManyArgs,
    #[error("unsupported format character '{0}'")]
    BadConversion(char),
    #[error("incomplete format")]
    Incomplete,
    #[error("%{conv} format: a number is required, not {kind}")]
    NotNumeric { conv: char, kind: &'static str },
    #[error("width or precision larger than {MAX_FIELD}")]
    FieldTooLarge,
}

/// Upper bound for widths and precisions taken from a template.
pub const MAX_FIELD: usize = 4096;

#[derive(Debug, Default)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    alt: bool,
    width: usize,
    precision: Option<usize>,
    conv: char,
}

/// Substitute `args` into `template` in order.
pub fn substitute(template: &str, args: &[Value]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars().peekable();
    let mut remaining = args.iter();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let spec = parse_spec(&mut chars)?;
        if spec.conv == '%' {
            out.push('%');
            continue;
        }
        let arg = remaining.next().ok_or(TemplateError::NotEnoughArgs)?;
        out.push_str(&convert(&spec, arg)?);
    }

    if remaining.next().is_some() {
        return Err(TemplateError::TooManyArgs);
    }
    Ok(out)
}

fn parse_spec(chars: &mut Peekable<Chars<'_>>) -> Result<Spec, TemplateError> {
    let mut spec = Spec::default();
    while let Some(&c) = chars.peek() {
        match c {
            '-' => spec.left = true,
            '0' => spec.zero = true,
            '+' => spec.plus = true,
            ' ' => spec.space = true,
            '#' => spec.alt = true,
            _ => break,
        }
        chars.next();
    }
    spec.width = digits(chars)?;
    if chars.peek() == Some(&'.') {
        chars.next();
        spec.precision = Some(digits(chars)?);
    }
    while matches!(chars.peek(), Some('h' | 'l' | 'L')) {
        chars.next();
    }
    spec.conv = chars.next().ok_or(TemplateError::Incomplete)?;
    Ok(spec)
}

fn digits(chars: &mut Peekable<Chars<'_>>) -> Result<usize, TemplateError> {
    let mut n: usize = 0;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        n = n.saturating_mul(10).saturating_add(d as usize);
        chars.next();
    }
    if n > MAX_FIELD {
        return Err(TemplateError::FieldTooLarge);
    }
    Ok(n)
}

fn convert(spec: &Spec, arg: &Value) -> Result<String, TemplateError> {
    match spec.conv {
        's' | 'r' => {
            let mut text = if spec.conv == 'r' {
                repr(arg)
            } else {
                arg.to_string()
            };
            if let Some(p) = spec.precision {
                text = text.chars().take(p).collect();
            }
            Ok(pad_text(text, spec))
        }
        'd' | 'i' | 'u' => {
            let n = integer(arg, spec.conv)?;
            Ok(pad_number(n < 0, "", n.unsigned_abs().to_string(), spec))
        }
        'x' | 'X' | 'o' => {
            let n = integer(arg, spec.conv)?;
            let abs = n.unsigned_abs();
            let (prefix, body) = match spec.conv {
                'x' => ("0x", format!("{abs:x}")),
                'X' => ("0X", format!("{abs:X}")),
                _ => ("0o", format!("{abs:o}")),
            };
            let prefix = if spec.alt { prefix } else { "" };
            Ok(pad_number(n < 0, prefix, body, spec))
        }
        'f' | 'F' => {
            let f = float(arg, spec.conv)?;
            let p = spec.precision.unwrap_or(6);
            Ok(pad_number(f < 0.0, "", format!("{:.*}", p, f.abs()), spec))
        }
        'e' | 'E' => {
            let f = float(arg, spec.conv)?;
            let p = spec.precision.unwrap_or(6);
            let mut body = exponent(f.abs(), p);
            if spec.conv == 'E' {
                body = body.to_uppercase();
            }
            Ok(pad_number(f < 0.0, "", body, spec))
        }
        other => Err(TemplateError::BadConversion(other)),
    }
}

fn repr(arg: &Value) -> String {
    match arg {
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        other => other.to_string(),
    }
}

fn integer(arg: &Value, conv: char) -> Result<i64, TemplateError> {
    match arg {
        Value::Int(n) => Ok(*n),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Double(f) if f.is_finite() => Ok(f.trunc() as i64),
        other => Err(TemplateError::NotNumeric {
            conv,
            kind: other.kind(),
        }),
    }
}

fn float(arg: &Value, conv: char) -> Result<f64, TemplateError> {
    match arg {
        Value::Int(n) => Ok(*n as f64),
        Value::Double(f) => Ok(*f),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(TemplateError::NotNumeric {
            conv,
            kind: other.kind(),
        }),
    }
}

/// `1.5e3` style with a signed, at least two digit exponent (`1.500000e+03`).
fn exponent(f: f64, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, f);
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => raw,
    }
}

fn pad_text(text: String, spec: &Spec) -> String {
    let len = text.chars().count();
    if spec.width <= len {
        return text;
    }
    let fill = " ".repeat(spec.width - len);
    if spec.left {
        format!("{text}{fill}")
    } else {
        format!("{fill}{text}")
    }
}

fn pad_number(negative: bool, prefix: &str, body: String, spec: &Spec) -> String {
    let sign = if negative {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    };
    let len = sign.len() + prefix.len() + body.chars().count();
    if spec.width <= len {
        return format!("{sign}{prefix}{body}");
    }
    let fill = spec.width - len;
    if spec.left {
        format!("{sign}{prefix}{body}{}", " ".repeat(fill))
    } else if spec.zero {
        format!("{sign}{prefix}{}{body}", "0".repeat(fill))
    } else {
        format!("{}{sign}{prefix}{body}", " ".repeat(fill))
    }
}
