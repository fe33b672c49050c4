/*!
`script.rs`

Implements `bofh exec "LINE"` and `bofh source FILE`.

A line is split with shell quoting rules into `GROUP COMMAND ARGS...`,
or `help [TOPIC...]`. Scripts run one line at a time: empty lines and
lines starting with `#` are skipped, every command is echoed behind the
prompt before its output. On error a script stops, unless
`--ignore-errors` is given; transport failures always stop it.
*/

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use bofh::config::{self, PROMPT};
use bofh::proto::{Session, Transport};
use clap::Args;

use crate::cmd::shared::{ConnectionArgs, finish, is_fatal, open_authenticated, to_args};

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// One command line, e.g. "user info alice"
    #[arg(value_name = "LINE")]
    pub line: String,
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Script with one command per line (`~` is expanded)
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Report failing lines and keep going
    #[arg(long)]
    pub ignore_errors: bool,
}

/// A parsed command line.
#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    Help(Vec<String>),
    Call {
        group: String,
        command: String,
        args: Vec<String>,
    },
}

pub fn parse_line(line: &str) -> Result<Line> {
    let words = shell_words::split(line).with_context(|| format!("cannot parse '{line}'"))?;
    let mut words = words.into_iter();
    match (words.next(), words.next()) {
        (None, _) => bail!("empty command line"),
        (Some(first), second) if first == "help" => {
            Ok(Line::Help(second.into_iter().chain(words).collect()))
        }
        (Some(group), Some(command)) => Ok(Line::Call {
            group,
            command,
            args: words.collect(),
        }),
        (Some(group), None) => bail!("incomplete command '{group}': expected GROUP COMMAND [ARGS...]"),
    }
}

pub fn run_line<T: Transport>(session: &Session<T>, line: &str) -> Result<String> {
    match parse_line(line)? {
        Line::Help(topics) => {
            let topics: Vec<&str> = topics.iter().map(String::as_str).collect();
            Ok(session.help(&topics)?)
        }
        Line::Call {
            group,
            command,
            args,
        } => Ok(session.group(&group)?.command(&command)?.call(&to_args(&args))?),
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScriptReport {
    pub executed: usize,
    pub failed: usize,
    /// Line number the script stopped at, if it did not run to the end.
    pub aborted_at: Option<usize>,
}

pub fn run_script<T: Transport>(
    session: &Session<T>,
    source: impl BufRead,
    origin: &str,
    ignore_errors: bool,
    out: &mut impl Write,
) -> Result<ScriptReport> {
    let mut report = ScriptReport::default();

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("cannot read {origin}"))?;
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        tracing::info!("running {stripped:?} (from {origin}:{line_no})");
        writeln!(out, "{PROMPT}{stripped}")?;
        report.executed += 1;

        match run_line(session, stripped) {
            Ok(text) => writeln!(out, "{text}")?,
            Err(e) => {
                report.failed += 1;
                tracing::error!("error running {stripped:?} ({origin}:{line_no}): {e:#}");
                if ignore_errors && !is_fatal(&e) {
                    writeln!(out, "Error: {e:#} (on line {line_no})")?;
                    continue;
                }
                writeln!(out, "Error: {e:#}")?;
                writeln!(out, "Sourcing of {origin} aborted on line {line_no}")?;
                if !ignore_errors {
                    writeln!(out, "Hint: use 'source --ignore-errors FILE' to ignore errors")?;
                }
                report.aborted_at = Some(line_no);
                break;
            }
        }
    }
    Ok(report)
}

pub fn execute_exec(args: ExecArgs, conn: &ConnectionArgs) -> Result<()> {
    // Validate before prompting for a password.
    parse_line(&args.line)?;
    let session = open_authenticated(conn)?;
    let result = run_line(&session, &args.line);
    finish(session);
    println!("{}", result?);
    Ok(())
}

pub fn execute_source(args: SourceArgs, conn: &ConnectionArgs) -> Result<()> {
    let path: PathBuf = config::expand_home(&args.file);
    if !path.is_file() {
        bail!("file \"{}\" does not exist", path.display());
    }
    let file = File::open(&path).with_context(|| format!("cannot open {}", path.display()))?;

    let session = open_authenticated(conn)?;
    let stdout = io::stdout();
    let report = run_script(
        &session,
        BufReader::new(file),
        &path.display().to_string(),
        args.ignore_errors,
        &mut stdout.lock(),
    );
    finish(session);
    let report = report?;

    tracing::info!(
        executed = report.executed,
        failed = report.failed,
        "script finished"
    );
    if let Some(line) = report.aborted_at {
        bail!("{} aborted on line {line}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bofh::proto::{SessionOptions, TransportFault, Value};
    use bofh::record;
    use std::future::Future;
    use std::io::Cursor;

    const ERRORS: &str = "Cerebrum.modules.bofhd.errors.";

    /// Minimal bofhd: two commands, `user info` fails for "ghost", `misc down` drops the link.
    struct FakeBofhd;

    impl Transport for FakeBofhd {
        fn invoke(
            &self,
            method: &str,
            params: &[Value],
        ) -> impl Future<Output = std::result::Result<Value, TransportFault>> + Send {
            let reply = match method {
                "get_motd" => Ok(Value::from("motd")),
                "login" => Ok(Value::from("sid")),
                "get_commands" => Ok(record! {
                    "user_info" => Value::Array(vec![Value::Array(vec!["user".into(), "info".into()])]),
                    "misc_down" => Value::Array(vec![Value::Array(vec!["misc".into(), "down".into()])]),
                }),
                "get_format_suggestion" => Ok(record! {
                    "str_vars" => vec![Value::Array(vec!["Account: %s".into(), vec![Value::from("name")].into()])],
                }),
                "help" => Ok(Value::from(format!("help for {}", params.len() - 1))),
                "run_command" => match (params[1].as_str(), params.get(2).and_then(Value::as_str)) {
                    (Some("misc_down"), _) => Err(TransportFault::Io("connection reset".into())),
                    (_, Some("ghost")) => Err(TransportFault::Server {
                        code: 1,
                        message: format!("{ERRORS}CerebrumError:No such account ghost"),
                    }),
                    (_, Some(name)) => Ok(record! { "name" => name }),
                    _ => Ok(Value::Nil),
                },
                _ => Ok(Value::Nil),
            };
            async move { reply }
        }
    }

    fn session() -> Session<FakeBofhd> {
        let mut s = Session::new(FakeBofhd, SessionOptions::default()).unwrap();
        s.connect().unwrap();
        s.login("alice", "pw").unwrap();
        s
    }

    fn script(session: &Session<FakeBofhd>, text: &str, ignore: bool) -> (ScriptReport, String) {
        let mut out = Vec::new();
        let report = run_script(session, Cursor::new(text), "test.bofh", ignore, &mut out).unwrap();
        (report, String::from_utf8(out).unwrap())
    }

    #[test]
    fn parses_lines() {
        assert_eq!(
            parse_line(r#"user info "alice smith""#).unwrap(),
            Line::Call {
                group: "user".into(),
                command: "info".into(),
                args: vec!["alice smith".into()],
            }
        );
        assert_eq!(parse_line("help user").unwrap(), Line::Help(vec!["user".into()]));
        assert_eq!(parse_line("help").unwrap(), Line::Help(vec![]));
        assert!(parse_line("user").is_err());
        assert!(parse_line("   ").is_err());
        assert!(parse_line("user info \"open").is_err());
    }

    #[test]
    fn runs_lines_through_the_formatter() {
        let s = session();
        assert_eq!(run_line(&s, "user info alice").unwrap(), "Account: alice");
        assert_eq!(run_line(&s, "help user info").unwrap(), "help for 2");
        let err = run_line(&s, "user nope").unwrap_err();
        assert!(err.to_string().contains("unknown command"));
    }

    #[test]
    fn script_skips_comments_and_stops_on_error() {
        let s = session();
        let (report, out) = script(
            &s,
            "# setup\n\nuser info alice\nuser info ghost\nuser info bob\n",
            false,
        );
        assert_eq!(
            report,
            ScriptReport {
                executed: 2,
                failed: 1,
                aborted_at: Some(4)
            }
        );
        assert!(out.starts_with("bofh>>> user info alice\nAccount: alice\n"));
        assert!(out.contains("Error: No such account ghost\n"));
        assert!(out.contains("aborted on line 4"));
        assert!(!out.contains("bob"));
    }

    #[test]
    fn ignore_errors_keeps_going() {
        let s = session();
        let (report, out) = script(&s, "user info ghost\nuser info bob\n", true);
        assert_eq!(report.executed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.aborted_at, None);
        assert!(out.contains("Error: No such account ghost (on line 1)"));
        assert!(out.contains("Account: bob"));
    }

    #[test]
    fn transport_failure_always_stops() {
        let s = session();
        let (report, out) = script(&s, "misc down\nuser info bob\n", true);
        assert_eq!(report.aborted_at, Some(1));
        assert!(!out.contains("Account: bob"));
    }

    #[test]
    fn source_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.bofh");
        std::fs::write(&path, "user info carol\n").unwrap();

        let s = session();
        let file = BufReader::new(File::open(&path).unwrap());
        let mut out = Vec::new();
        let report = run_script(&s, file, "batch.bofh", false, &mut out).unwrap();
        assert_eq!(report.executed, 1);
        assert!(String::from_utf8(out).unwrap().contains("Account: carol"));
    }
}
