//! Command catalog: the server's list of callable commands.
//!
//! Fetched once per login from `get_commands` and indexed by full command
//! name. The index never changes after construction; the only late-bound
//! piece is each descriptor's format suggestion, which lives in a write-once
//! cell so it can be filled lazily (or up front when the server sends it
//! inline) while the catalog stays shareable without locks.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use super::error::{Error, Result};
use super::value::{Record, Value};
use crate::formatting::FormatSuggestion;

/// Default value behaviour of one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamDefault {
    None,
    /// A fixed default sent with the command metadata.
    Literal(String),
    /// The server computes the default via `get_default_param`.
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: Option<String>,
    pub optional: bool,
    pub repeat: bool,
    pub default: ParamDefault,
    pub help_ref: Option<String>,
    pub prompt: Option<String>,
}

impl Param {
    pub fn has_default(&self) -> bool {
        !matches!(self.default, ParamDefault::None)
    }
}

/// How a command collects its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    Params(Vec<Param>),
    /// The command drives its own prompting through `call_prompt_func`.
    PromptFunc,
}

/// Resolved format suggestion state of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionSlot {
    /// The command returns pre-formatted text.
    None,
    /// The server sent a suggestion we could not parse; text passthrough.
    Degraded(String),
    Parsed(FormatSuggestion),
}

impl SuggestionSlot {
    /// Parse a descriptor, containing any malformation to this one command.
    pub fn from_descriptor(command: &str, descriptor: &Value) -> Self {
        match FormatSuggestion::parse(descriptor) {
            Ok(Some(s)) => SuggestionSlot::Parsed(s),
            Ok(None) => SuggestionSlot::None,
            Err(e) => {
                tracing::warn!(command, "{e}; falling back to plain text");
                SuggestionSlot::Degraded(e.to_string())
            }
        }
    }

    pub fn suggestion(&self) -> Option<&FormatSuggestion> {
        match self {
            SuggestionSlot::Parsed(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct CommandDescriptor {
    pub name: String,
    pub group: String,
    pub command: String,
    pub signature: Signature,
    suggestion: OnceLock<SuggestionSlot>,
}

impl CommandDescriptor {
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        command: impl Into<String>,
        signature: Signature,
    ) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            command: command.into(),
            signature,
            suggestion: OnceLock::new(),
        }
    }

    /// The resolved suggestion state, or `None` if not yet fetched.
    pub fn suggestion_slot(&self) -> Option<&SuggestionSlot> {
        self.suggestion.get()
    }

    /// Fill the suggestion cell from a descriptor. First write wins.
    pub fn resolve_suggestion(&self, descriptor: &Value) -> &SuggestionSlot {
        self.suggestion
            .get_or_init(|| SuggestionSlot::from_descriptor(&self.name, descriptor))
    }

    /// True when formatted calls will pass the response through as text.
    pub fn is_text_passthrough(&self) -> bool {
        matches!(
            self.suggestion.get(),
            Some(SuggestionSlot::None | SuggestionSlot::Degraded(_))
        )
    }

    pub fn params(&self) -> &[Param] {
        match &self.signature {
            Signature::Params(p) => p,
            Signature::PromptFunc => &[],
        }
    }
}

/// Index of every command the server exposes to the current user.
#[derive(Debug, Default)]
pub struct Catalog {
    commands: BTreeMap<String, CommandDescriptor>,
}

fn protocol(msg: impl Into<String>) -> Error {
    Error::Protocol(format!("get_commands: {}", msg.into()))
}

impl Catalog {
    pub fn new(descriptors: impl IntoIterator<Item = CommandDescriptor>) -> Self {
        Self {
            commands: descriptors
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    /// Build a catalog from a `get_commands` reply.
    ///
    /// Accepts the bofhd mapping form
    /// (`{full_name: [[group, command], args, suggestion?]}`) and a sequence
    /// of entry structs. Shape violations abort with a protocol error;
    /// malformed suggestions only degrade their own command.
    pub fn from_wire(value: &Value) -> Result<Self> {
        let descriptors = match value {
            Value::Struct(map) => map
                .iter()
                .map(|(name, entry)| parse_mapped_entry(name, entry))
                .collect::<Result<Vec<_>>>()?,
            Value::Array(entries) => entries
                .iter()
                .map(parse_sequence_entry)
                .collect::<Result<Vec<_>>>()?,
            other => return Err(protocol(format!("expected struct or array, got {}", other.kind()))),
        };
        Ok(Self::new(descriptors))
    }

    pub fn resolve(&self, full_name: &str) -> Result<&CommandDescriptor> {
        self.commands
            .get(full_name)
            .ok_or_else(|| Error::UnknownCommand(full_name.to_string()))
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.commands.contains_key(full_name)
    }

    /// Short names of every command whose full name is `group_<short>`.
    pub fn group_members(&self, group: &str) -> BTreeSet<&str> {
        self.commands
            .keys()
            .filter_map(|name| name.strip_prefix(group)?.strip_prefix('_'))
            .filter(|short| !short.is_empty())
            .collect()
    }

    /// Declared group names, sorted.
    pub fn groups(&self) -> BTreeSet<&str> {
        self.commands.values().map(|d| d.group.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

fn parse_mapped_entry(name: &str, entry: &Value) -> Result<CommandDescriptor> {
    let parts = entry
        .as_array()
        .ok_or_else(|| protocol(format!("entry '{name}' is a {}", entry.kind())))?;
    let (group, command) = match parts.first().and_then(Value::as_array) {
        Some([Value::String(g), Value::String(c)]) => (g.clone(), c.clone()),
        _ => return Err(protocol(format!("entry '{name}' lacks a [group, command] pair"))),
    };
    let signature = parse_signature(name, parts.get(1))?;
    let descriptor = CommandDescriptor::new(name, group, command, signature);
    if let Some(inline) = parts.get(2) {
        descriptor.resolve_suggestion(inline);
    }
    Ok(descriptor)
}

fn parse_sequence_entry(entry: &Value) -> Result<CommandDescriptor> {
    let map = entry
        .as_struct()
        .ok_or_else(|| protocol(format!("entry is a {}", entry.kind())))?;
    let name = str_field(map, "name").ok_or_else(|| protocol("entry without 'name'"))?;
    let group = str_field(map, "group")
        .ok_or_else(|| protocol(format!("entry '{name}' without 'group'")))?;
    let command = match str_field(map, "command") {
        Some(c) => c.to_string(),
        None => name
            .strip_prefix(group)
            .and_then(|r| r.strip_prefix('_'))
            .unwrap_or(name)
            .to_string(),
    };
    let signature = parse_signature(name, map.get("params"))?;
    let descriptor = CommandDescriptor::new(name, group, command, signature);
    if let Some(inline) = map.get("format_suggestion") {
        descriptor.resolve_suggestion(inline);
    }
    Ok(descriptor)
}

fn str_field<'a>(map: &'a Record, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

fn parse_signature(name: &str, args: Option<&Value>) -> Result<Signature> {
    match args {
        None | Some(Value::Nil) => Ok(Signature::Params(Vec::new())),
        Some(Value::String(s)) if s == "prompt_func" => Ok(Signature::PromptFunc),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| parse_param(name, idx, item))
            .collect::<Result<Vec<_>>>()
            .map(Signature::Params),
        Some(other) => Err(protocol(format!(
            "arguments of '{name}' are a {}",
            other.kind()
        ))),
    }
}

fn parse_param(command: &str, idx: usize, item: &Value) -> Result<Param> {
    let map = match item {
        Value::String(n) => {
            return Ok(Param {
                name: n.clone(),
                kind: None,
                optional: false,
                repeat: false,
                default: ParamDefault::None,
                help_ref: None,
                prompt: None,
            });
        }
        Value::Struct(map) => map,
        other => {
            return Err(protocol(format!(
                "argument {idx} of '{command}' is a {}",
                other.kind()
            )));
        }
    };
    let flag = |key: &str| map.get(key).and_then(Value::as_bool).unwrap_or(false);
    let text = |key: &str| str_field(map, key).map(str::to_string);

    let default = match map.get("default") {
        None | Some(Value::Nil) => ParamDefault::None,
        Some(Value::String(s)) => ParamDefault::Literal(s.clone()),
        Some(v) if v.as_bool() == Some(true) => ParamDefault::Server,
        Some(_) => ParamDefault::None,
    };
    let kind = text("type");
    let help_ref = text("help_ref");
    let name = text("name")
        .or_else(|| help_ref.clone())
        .or_else(|| kind.clone())
        .unwrap_or_else(|| format!("arg{idx}"));

    Ok(Param {
        name,
        kind,
        optional: flag("optional"),
        repeat: flag("repeat"),
        default,
        help_ref,
        prompt: text("prompt"),
    })
}
