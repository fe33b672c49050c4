/*!
`run.rs`

Implements `bofh run GROUP COMMAND [ARGS...]`.

By default the result is rendered with the command's format suggestion
(or printed as the server's own text). `--raw`, `--output json` or
`--output yaml` skip the formatter and print the structured value.
*/

use anyhow::Result;
use bofh::proto::{Session, Transport};
use clap::Args;

use crate::cmd::shared::{
    ConnectionArgs, OutputFormat, finish, open_authenticated, render_value, to_args,
};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Command group, e.g. `user`
    pub group: String,

    /// Command within the group, e.g. `info`
    pub command: String,

    /// Positional arguments passed to the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Print the structured result instead of formatted text
    #[arg(long)]
    pub raw: bool,

    /// Output format for structured results
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

impl RunArgs {
    pub fn wants_json(&self) -> bool {
        self.output == OutputFormat::Json
    }
}

pub fn execute_run(args: RunArgs, conn: &ConnectionArgs) -> Result<()> {
    let session = open_authenticated(conn)?;
    let result = run(&session, &args);
    finish(session);
    println!("{}", result?);
    Ok(())
}

fn run<T: Transport>(session: &Session<T>, args: &RunArgs) -> Result<String> {
    let command = session.group(&args.group)?.command(&args.command)?;
    let params = to_args(&args.args);
    tracing::info!(command = command.full_name(), args = params.len(), "running");

    if args.raw || args.output != OutputFormat::Text {
        let value = command.call_raw(&params)?;
        return render_value(&value, args.output);
    }
    Ok(command.call(&params)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        cmd: TestSub,
    }

    #[derive(clap::Subcommand, Debug)]
    enum TestSub {
        Run(RunArgs),
    }

    #[test]
    fn clap_parses_run_with_hyphen_args() {
        let cli = TestCli::try_parse_from([
            "t", "run", "--output", "json", "user", "info", "foo", "-x",
        ])
        .unwrap();
        let TestSub::Run(a) = cli.cmd;
        assert_eq!(a.group, "user");
        assert_eq!(a.command, "info");
        assert_eq!(a.args, vec!["foo", "-x"]);
        assert!(a.wants_json());
        assert!(!a.raw);
    }
}
