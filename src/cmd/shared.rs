/*!
shared.rs - helpers shared by every subcommand.

Focus:
  - ConnectionArgs: --url / --cert / --insecure / --timeout / --user (+ env)
  - open / open_authenticated: connect (and log in) a session
  - OutputFormat + render_value: text / json / yaml for structured values
  - report_error: boxed human error or JSON error object
*/

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use bofh::config;
use bofh::proto::{self, ConnectOptions, HttpTransport, Session, Value};
use clap::{Args, ValueEnum};

use crate::cmd::format::{Role, StyleOptions, box_header, color, symbol};

/* ---- Connection ---- */

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// bofhd server URL
    #[arg(long, global = true, env = config::ENV_URL, default_value = config::DEFAULT_URL)]
    pub url: String,

    /// CA bundle (PEM) used to verify the server; defaults to cacerts.pem in the config path
    #[arg(long = "cert", global = true, env = config::ENV_CAFILE, value_name = "PEM")]
    pub cert: Option<PathBuf>,

    /// Do not verify the server certificate
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Per-call timeout in seconds
    #[arg(long, global = true, env = config::ENV_TIMEOUT, value_name = "SECS",
          default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Login name (defaults to the current user)
    #[arg(short = 'u', long, global = true, env = config::ENV_USER)]
    pub user: Option<String>,
}

impl ConnectionArgs {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            ca_file: self.cert.clone().or_else(config::default_ca_file),
            insecure: self.insecure,
            timeout: Duration::from_secs(self.timeout.max(1)),
        }
    }

    pub fn username(&self) -> Result<String> {
        match self.user.clone().or_else(config::default_user) {
            Some(user) => Ok(user),
            None => bail!("no username given (use --user or BOFH_USER)"),
        }
    }
}

/// Connect without logging in.
pub fn open(conn: &ConnectionArgs) -> Result<Session<HttpTransport>> {
    let options = conn.connect_options();
    tracing::debug!(url = %conn.url, ca_file = ?options.ca_file, "opening session");
    proto::connect(&conn.url, &options).with_context(|| format!("cannot connect to {}", conn.url))
}

/// Connect and log in, asking for the password unless BOFH_PASSWORD is set.
pub fn open_authenticated(conn: &ConnectionArgs) -> Result<Session<HttpTransport>> {
    let user = conn.username()?;
    let mut session = open(conn)?;
    let password = read_password(&user)?;
    session
        .login(&user, &password)
        .with_context(|| format!("login as {user} failed"))?;
    Ok(session)
}

fn read_password(user: &str) -> Result<String> {
    if let Ok(pw) = std::env::var(config::ENV_PASSWORD)
        && !pw.is_empty()
    {
        return Ok(pw);
    }
    rpassword::prompt_password(format!("Password for {user}: "))
        .context("failed to read password")
}

/// Close a session at the end of a subcommand. Failures only get logged.
pub fn finish<T: proto::Transport>(mut session: Session<T>) {
    if let Err(e) = session.close() {
        tracing::debug!("close: {e}");
    }
}

/// Command-line words become string arguments.
pub fn to_args(words: &[String]) -> Vec<Value> {
    words.iter().map(|w| Value::from(w.as_str())).collect()
}

/* ---- Output ---- */

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

pub fn render_value(value: &Value, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("failed to encode JSON")?
        }
        OutputFormat::Yaml => serde_yaml::to_string(value)
            .context("failed to encode YAML")?
            .trim_end()
            .to_string(),
    })
}

/// True for failures after which no further command should be attempted.
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.downcast_ref::<proto::Error>()
        .is_some_and(proto::Error::is_fatal)
}

/// Print an error for humans (boxed, stderr) or machines (JSON, stdout).
pub fn report_error(err: &anyhow::Error, json: bool) {
    if json {
        let obj = serde_json::json!({ "status": "error", "error": format!("{err:#}") });
        println!(
            "{}",
            serde_json::to_string_pretty(&obj).unwrap_or_else(|_| obj.to_string())
        );
        return;
    }
    let style = StyleOptions::detect();
    let title = format!("{} Error", symbol("error", &style));
    eprintln!(
        "{}",
        box_header(title.trim(), Some(color(Role::Error, format!("{err:#}"), &style)), &style)
    );
    if is_fatal(err) {
        eprintln!(
            "{} {}",
            symbol("info", &style),
            color(Role::Dim, "Check --url / --cert and that the server is reachable.", &style)
        );
    }
}
