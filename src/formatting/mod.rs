//! Response formatting driven by server format suggestions.
//!
//! Commands either return pre-formatted text, or structured records plus a
//! format suggestion describing how to print them. [`FormatSuggestion::parse`]
//! turns the descriptor into items, and [`Formatter`] renders a response
//! with (or without) one.

pub mod render;
pub mod suggestion;
pub mod template;

pub use render::{FieldError, Formatter, NOT_SET, formatted_field, sdf_to_strftime};
pub use suggestion::{FieldHint, FieldRef, FormatItem, FormatSuggestion};
pub use template::{TemplateError, substitute};
