/*!
Subcommand dispatcher module.

Layout:
  src/cmd/
    mod.rs        (this file: module declarations + re-exports)
    shared.rs     (connection flags, session opening, output formats, error reporting)
    format.rs     (terminal styling: boxes, tables, colors)
    commands.rs   (CommandsArgs + execute_commands)
    run.rs        (RunArgs      + execute_run)
    script.rs     (ExecArgs / SourceArgs + execute_exec / execute_source)
    info.rs       (MotdArgs / HelpArgs + execute_motd / execute_help)

Conventions:
  - Each subcommand exposes one public `execute_*` function taking its
    clap `Args` struct plus the global `ConnectionArgs`, returning
    `anyhow::Result<()>`.
  - Sessions are opened through `shared` and closed with `shared::finish`
    before results are printed.
*/

pub mod commands;
pub mod format;
pub mod info;
pub mod run;
pub mod script;
pub mod shared;

pub use commands::{CommandsArgs, execute_commands};
pub use info::{HelpArgs, MotdArgs, execute_help, execute_motd};
pub use run::{RunArgs, execute_run};
pub use script::{ExecArgs, SourceArgs, execute_exec, execute_source};
pub use shared::{ConnectionArgs, report_error};
