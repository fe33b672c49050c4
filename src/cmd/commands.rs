/*!
`commands.rs`

Implements `bofh commands [GROUP]`: log in and list the command catalog
the server exposes to the current user.

JSON Output Shape:
{
  "status": "ok",
  "user": "alice",
  "count": 2,
  "commands": [
    { "name": "user_info", "group": "user", "command": "info",
      "params": ["account_name"], "prompt_func": false }
  ]
}
*/

use anyhow::Result;
use bofh::proto::{Catalog, CommandDescriptor, Param, Signature};
use clap::Args;

use crate::cmd::format::{Role, StyleOptions, TableOpts, box_header, color, symbol, table};
use crate::cmd::shared::{ConnectionArgs, finish, open_authenticated};

#[derive(Args, Debug)]
pub struct CommandsArgs {
    /// Only list commands of this group
    pub group: Option<String>,

    /// Output JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn execute_commands(args: CommandsArgs, conn: &ConnectionArgs) -> Result<()> {
    let session = open_authenticated(conn)?;
    if let Some(group) = &args.group {
        // Same error as a façade lookup when the group does not exist.
        session.group(group)?;
    }
    let catalog = session.catalog()?;
    let selected = select(catalog, args.group.as_deref());

    if args.json {
        let items: Vec<serde_json::Value> = selected
            .iter()
            .map(|d| {
                serde_json::json!({
                    "name": d.name,
                    "group": d.group,
                    "command": d.command,
                    "params": d.params().iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
                    "prompt_func": d.signature == Signature::PromptFunc,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "user": session.username(),
                "count": items.len(),
                "commands": items,
            })
        );
    } else {
        let style = StyleOptions::detect();
        let title = format!("{} Commands ({})", symbol("list", &style), selected.len());
        let subtitle = format!(
            "user={} • {}",
            session.username().unwrap_or("-"),
            conn.url
        );
        println!("{}", box_header(title.trim(), Some(subtitle), &style));
        if selected.is_empty() {
            println!("{}", color(Role::Dim, "(none)", &style));
        } else {
            let tbl = table(
                &["GROUP", "COMMAND", "ARGUMENTS"],
                &rows(&selected),
                TableOpts::default(),
                &style,
            );
            println!("{tbl}");
        }
    }

    finish(session);
    Ok(())
}

fn select<'a>(catalog: &'a Catalog, group: Option<&str>) -> Vec<&'a CommandDescriptor> {
    catalog
        .iter()
        .filter(|d| group.is_none_or(|g| d.group == g))
        .collect()
}

fn rows(selected: &[&CommandDescriptor]) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = selected
        .iter()
        .map(|d| vec![d.group.clone(), d.command.clone(), signature_summary(d)])
        .collect();
    rows.sort();
    rows
}

/// `name [optional] repeat...`, or `<interactive>` for prompt_func commands.
pub fn signature_summary(descriptor: &CommandDescriptor) -> String {
    match &descriptor.signature {
        Signature::PromptFunc => "<interactive>".to_string(),
        Signature::Params(params) if params.is_empty() => "-".to_string(),
        Signature::Params(params) => params
            .iter()
            .map(param_summary)
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn param_summary(param: &Param) -> String {
    let name = if param.repeat {
        format!("{}...", param.name)
    } else {
        param.name.clone()
    };
    if param.optional || param.has_default() {
        format!("[{name}]")
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bofh::proto::{ParamDefault, Value};
    use bofh::record;

    fn param(name: &str, optional: bool, repeat: bool) -> Param {
        Param {
            name: name.into(),
            kind: None,
            optional,
            repeat,
            default: ParamDefault::None,
            help_ref: None,
            prompt: None,
        }
    }

    #[test]
    fn summarises_signatures() {
        let d = CommandDescriptor::new(
            "group_add",
            "group",
            "add",
            Signature::Params(vec![param("member", false, true), param("group", false, false), param("op", true, false)]),
        );
        assert_eq!(signature_summary(&d), "member... group [op]");

        let d = CommandDescriptor::new("user_create", "user", "create", Signature::PromptFunc);
        assert_eq!(signature_summary(&d), "<interactive>");

        let d = CommandDescriptor::new("misc_clear", "misc", "clear", Signature::Params(vec![]));
        assert_eq!(signature_summary(&d), "-");
    }

    #[test]
    fn filters_and_sorts_rows() {
        let wire = record! {
            "user_info" => Value::Array(vec![Value::Array(vec!["user".into(), "info".into()])]),
            "group_info" => Value::Array(vec![Value::Array(vec!["group".into(), "info".into()])]),
            "user_delete" => Value::Array(vec![Value::Array(vec!["user".into(), "delete".into()])]),
        };
        let catalog = Catalog::from_wire(&wire).unwrap();

        let all = rows(&select(&catalog, None));
        assert_eq!(all[0], vec!["group", "info", "-"]);
        assert_eq!(all.len(), 3);

        let users = rows(&select(&catalog, Some("user")));
        let names: Vec<&str> = users.iter().map(|r| r[1].as_str()).collect();
        assert_eq!(names, vec!["delete", "info"]);
    }
}
