use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod cmd;
mod utils;

use cmd::{CommandsArgs, ConnectionArgs, ExecArgs, HelpArgs, MotdArgs, RunArgs, SourceArgs};

/// bofh - command line client for the bofhd administration service
///
/// Command layout:
///   bofh motd
///   bofh commands [GROUP] [--json]
///   bofh run GROUP COMMAND [ARGS...] [--raw] [--output text|json|yaml]
///   bofh exec "GROUP COMMAND ARGS..."
///   bofh source FILE [--ignore-errors]
///   bofh help [TOPIC...]
///
/// Global flags / env:
///   -v / -vv / -vvv   Increase verbosity (RUST_LOG overrides)
///   -q / --quiet      Errors only
///   --url             Server URL (BOFH_URL)
///   --cert            CA bundle (BOFH_CAFILE, else cacerts.pem from ~/.config/bofh or /etc/bofh)
///   --insecure        Skip certificate verification
///   --timeout         Per-call timeout in seconds (BOFH_TIMEOUT)
///   -u / --user       Login name (BOFH_USER, else $USER)
///   BOFH_PASSWORD     Password; prompted for when unset
///
/// Examples:
///   bofh --url https://bofhd.example.org:8000/ motd
///   bofh run user info alice
///   bofh run user info alice --output yaml
///   bofh exec 'group add_member alice "staff users"'
///   bofh source ~/batch.bofh --ignore-errors
#[derive(Parser, Debug)]
#[command(
    name = "bofh",
    version,
    about = "bofh - command line client for the bofhd administration service",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    conn: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the server's message of the day
    Motd(MotdArgs),

    /// List the commands available to you
    Commands(CommandsArgs),

    /// Run one command
    Run(RunArgs),

    /// Run one command line ("GROUP COMMAND ARGS...")
    Exec(ExecArgs),

    /// Run a script of command lines
    Source(SourceArgs),

    /// Show server help
    Help(HelpArgs),
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Commands::Commands(a) => a.json,
            Commands::Run(a) => a.wants_json(),
            _ => false,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    let json = cli.command.wants_json();
    let conn = cli.conn;
    let result = match cli.command {
        Commands::Motd(args) => cmd::execute_motd(args, &conn),
        Commands::Commands(args) => cmd::execute_commands(args, &conn),
        Commands::Run(args) => cmd::execute_run(args, &conn),
        Commands::Exec(args) => cmd::execute_exec(args, &conn),
        Commands::Source(args) => cmd::execute_source(args, &conn),
        Commands::Help(args) => cmd::execute_help(args, &conn),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            cmd::report_error(&e, json);
            ExitCode::FAILURE
        }
    }
}
