/*!
format.rs

Terminal styling for the human output paths of the `bofh` CLI.

Public API Summary:
  - StyleOptions::detect() -> StyleOptions   (tty, NO_COLOR, COLUMNS)
  - color(role, text, &StyleOptions) -> String
  - symbol(tag, &StyleOptions) -> &'static str
  - box_header(title, subtitle_opt, &StyleOptions) -> String
  - table(headers, rows, TableOpts, &StyleOptions) -> String
  - truncate_ellipsis(s, max_chars) -> String

Server output rendered by the formatting engine is printed as-is; these
helpers only decorate what the CLI itself adds (listings, banners, errors).
JSON/YAML output never goes through here.
*/

use std::borrow::Cow;
use std::io::IsTerminal;

/* ---- Style Options ---- */

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub use_symbols: bool,
    pub term_width: usize,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    pub fn detect() -> Self {
        if !std::io::stdout().is_terminal() {
            return Self::plain();
        }
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);

        StyleOptions {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            use_symbols: std::env::var_os("NO_EMOJI").is_none(),
            term_width: width,
        }
    }

    /// No color, no symbols, fixed width. Used by tests and piped output.
    pub fn plain() -> Self {
        StyleOptions {
            use_color: false,
            use_symbols: false,
            term_width: 100,
        }
    }
}

/* ---- Color / Symbols ---- */

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Secondary,
    Accent,
    Success,
    Warning,
    Error,
    Dim,
    Bold,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",
        Role::Secondary => "38;5;250",
        Role::Accent => "38;5;213",
        Role::Success => "38;5;82",
        Role::Warning => "38;5;214",
        Role::Error => "38;5;196",
        Role::Dim => "2",
        Role::Bold => "1",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

pub fn symbol(tag: &str, style: &StyleOptions) -> &'static str {
    if !style.use_symbols {
        return "";
    }
    match tag {
        "success" => "✔",
        "error" => "✖",
        "warn" => "⚠",
        "info" => "ℹ",
        "list" => "📜",
        _ => "",
    }
}

/* ---- Box Header ---- */

/// A one-box banner: title, optional dimmed subtitle, wrapped to the terminal.
pub fn box_header(
    title: impl AsRef<str>,
    subtitle: Option<impl AsRef<str>>,
    style: &StyleOptions,
) -> String {
    let inner = match subtitle {
        Some(sub) => format!(
            "{}  {}",
            color(Role::Primary, title.as_ref(), style),
            color(Role::Secondary, sub.as_ref(), style)
        ),
        None => color(Role::Primary, title.as_ref(), style),
    };

    let max_inner = style.term_width.clamp(20, 200) - 4;
    let wrapped = wrap_text(&inner, max_inner);
    let width = wrapped.iter().map(|l| display_width(l)).max().unwrap_or(0);
    let rule = "─".repeat(width + 2);

    let mut lines = Vec::with_capacity(wrapped.len() + 2);
    lines.push(format!("┌{rule}┐"));
    for line in wrapped {
        let fill = " ".repeat(width - display_width(&line));
        lines.push(format!("│ {line}{fill} │"));
    }
    lines.push(format!("└{rule}┘"));
    lines.join("\n")
}

/* ---- Table Rendering ---- */

#[derive(Debug, Clone)]
pub struct TableOpts {
    /// 0 means the terminal width.
    pub max_width: usize,
    pub header_sep: bool,
    pub min_col_width: usize,
}

impl Default for TableOpts {
    fn default() -> Self {
        Self {
            max_width: 0,
            header_sep: true,
            min_col_width: 4,
        }
    }
}

pub fn table(
    headers: &[&str],
    rows: &[Vec<String>],
    opts: TableOpts,
    style: &StyleOptions,
) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let cols = headers.len();
    let limit = match opts.max_width {
        0 => style.term_width,
        w => w.min(style.term_width),
    };

    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    // Shrink the widest columns first until the row fits.
    let total: usize = widths.iter().sum::<usize>() + (cols - 1) * 2;
    if total > limit {
        let mut overflow = total - limit;
        let mut order: Vec<usize> = (0..cols).collect();
        order.sort_by(|a, b| widths[*b].cmp(&widths[*a]));
        for idx in order {
            if overflow == 0 {
                break;
            }
            if widths[idx] > opts.min_col_width {
                let shrink = (widths[idx] - opts.min_col_width).min(overflow);
                widths[idx] -= shrink;
                overflow -= shrink;
            }
        }
    }

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(color(Role::Accent, render_row(headers, &widths), style));
    if opts.header_sep {
        let sep = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ");
        out.push(color(Role::Dim, sep, style));
    }
    for row in rows {
        let cells: Vec<&str> = (0..cols)
            .map(|c| row.get(c).map(String::as_str).unwrap_or(""))
            .collect();
        out.push(render_row(&cells, &widths));
    }
    out.join("\n")
}

fn render_row(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| fit(cell, *w))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn fit(s: &str, width: usize) -> String {
    let len = display_width(s);
    if len <= width {
        return format!("{s}{}", " ".repeat(width - len));
    }
    truncate_ellipsis(&strip_ansi(s), width)
}

/* ---- Text Helpers ---- */

pub fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        if !current.is_empty() && display_width(&current) + display_width(word) + 1 > max_width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    match max_chars {
        0 => String::new(),
        1 => "…".into(),
        n => {
            let mut out: String = s.chars().take(n - 1).collect();
            out.push('…');
            out
        }
    }
}

/* ---- ANSI / Width Utilities ---- */

pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for end in chars.by_ref() {
                if end.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        buf.push(c);
    }
    Cow::Owned(buf)
}

pub fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_header_frames_title() {
        let b = box_header("Commands (3)", Some("user=alice"), &StyleOptions::plain());
        let lines: Vec<&str> = b.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "│ Commands (3) user=alice │");
        assert_eq!(display_width(lines[0]), display_width(lines[1]));
    }

    #[test]
    fn table_aligns_columns() {
        let t = table(
            &["GROUP", "COMMAND"],
            &[
                vec!["user".into(), "info".into()],
                vec!["group".into(), "add_member".into()],
            ],
            TableOpts::default(),
            &StyleOptions::plain(),
        );
        assert_eq!(
            t,
            "GROUP  COMMAND\n-----  ----------\nuser   info\ngroup  add_member"
        );
    }

    #[test]
    fn table_shrinks_to_width() {
        let t = table(
            &["A", "B"],
            &[vec!["x".repeat(30), "y".repeat(30)]],
            TableOpts {
                max_width: 32,
                ..TableOpts::default()
            },
            &StyleOptions::plain(),
        );
        assert!(t.lines().all(|l| display_width(l) <= 32), "{t}");
        assert!(t.contains('…'));
    }

    #[test]
    fn truncate() {
        assert_eq!(truncate_ellipsis("abcdef", 4), "abc…");
        assert_eq!(truncate_ellipsis("abc", 4), "abc");
    }

    #[test]
    fn strips_ansi() {
        assert_eq!(strip_ansi("\x1b[38;5;196mRED\x1b[0m"), "RED");
        assert_eq!(display_width(&color(Role::Bold, "ab", &StyleOptions::detect())), 2);
    }

    #[test]
    fn wraps_words() {
        assert_eq!(wrap_text("hello world from bofh", 11), vec!["hello world", "from bofh"]);
    }
}
