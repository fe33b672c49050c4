/*!
`info.rs`

Implements `bofh motd` and `bofh help [TOPIC...]`.

`motd` only connects (no login) and prints the server banner, boxed
unless `--plain`. `help` logs in and prints the server's help text for
the given topics: a group, a group and command, or `arg_help REF`.
*/

use anyhow::Result;
use clap::Args;

use crate::cmd::format::{Role, StyleOptions, box_header, color};
use crate::cmd::shared::{ConnectionArgs, finish, open, open_authenticated};

#[derive(Args, Debug)]
pub struct MotdArgs {
    /// Print only the message, without the banner
    #[arg(long)]
    pub plain: bool,
}

#[derive(Args, Debug)]
pub struct HelpArgs {
    /// Help topic: a group, a group and command, or `arg_help REF`
    #[arg(value_name = "TOPIC")]
    pub topics: Vec<String>,
}

pub fn execute_motd(args: MotdArgs, conn: &ConnectionArgs) -> Result<()> {
    let session = open(conn)?;
    let motd = session.motd().unwrap_or("").trim_end().to_string();
    finish(session);

    if args.plain {
        println!("{motd}");
        return Ok(());
    }
    let style = StyleOptions::detect();
    println!("{}", box_header("Message of the day", Some(&conn.url), &style));
    if motd.is_empty() {
        println!("{}", color(Role::Dim, "(empty)", &style));
    } else {
        println!("{motd}");
    }
    Ok(())
}

pub fn execute_help(args: HelpArgs, conn: &ConnectionArgs) -> Result<()> {
    let session = open_authenticated(conn)?;
    let topics: Vec<&str> = args.topics.iter().map(String::as_str).collect();
    let result = session.help(&topics);
    finish(session);
    println!("{}", result?.trim_end());
    Ok(())
}
