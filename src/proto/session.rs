//! Session: the authenticated channel to a bofhd server.
//!
//! Key items:
//! - `SessionState`   (Disconnected -> Connected <-> Authenticated -> Closed)
//! - `SessionOptions` (per-call timeout, client identification sent with the motd request)
//! - `Session`        (state machine, raw and formatted calling conventions)
//!
//! The session owns a single-threaded tokio runtime and drives the async
//! transport to completion on it, so the public API is blocking. State
//! transitions take `&mut self`; calls take `&self` and are guarded by a
//! try-lock, so a second call while one is in flight fails with
//! `Error::SessionBusy` instead of interleaving.

use std::fmt;
use std::sync::{Mutex, TryLockError};
use std::time::Duration;

use tokio::runtime::Runtime;

use super::catalog::{Catalog, CommandDescriptor};
use super::error::{Error, Result};
use super::transport::{Transport, TransportFault};
use super::value::{Value, escape_arg, wash};
use crate::formatting::{FormatSuggestion, Formatter};

const ERROR_PACKAGE: &str = "Cerebrum.modules.bofhd.errors.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Authenticated,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::Authenticated => "authenticated",
            SessionState::Closed => "closed",
        })
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub timeout: Duration,
    pub client_name: String,
    pub client_version: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            client_name: env!("CARGO_PKG_NAME").to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// What came back from one remote invocation, before fault classification.
enum Outcome {
    Value(Value),
    Fault(String),
}

/* ---- Fault classification ---- */

fn classify_fault(fault: &str) -> Error {
    let Some(rest) = fault.strip_prefix(ERROR_PACKAGE) else {
        return Error::RemoteCommand(fault.to_string());
    };
    if rest.starts_with("ServerRestartedError:") {
        return Error::ServerRestarted;
    }
    if rest.starts_with("SessionExpiredError:") {
        return Error::SessionExpired;
    }
    match rest.split_once(':') {
        Some((_, msg)) => {
            let msg = msg.trim_start();
            Error::RemoteCommand(msg.strip_prefix("CerebrumError: ").unwrap_or(msg).to_string())
        }
        None => Error::RemoteCommand(fault.to_string()),
    }
}

fn text_of(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Nil => String::new(),
        other => other.to_string(),
    }
}

/* ---- Session ---- */

pub struct Session<T: Transport> {
    transport: Option<T>,
    runtime: Runtime,
    options: SessionOptions,
    state: SessionState,
    session_id: Option<String>,
    username: Option<String>,
    motd: Option<String>,
    catalog: Option<Catalog>,
    call_lock: Mutex<()>,
}

impl<T: Transport> Session<T> {
    /// Wrap a transport. No I/O happens until [`Session::connect`].
    pub fn new(transport: T, options: SessionOptions) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Transport(format!("failed to start runtime: {e}")))?;
        Ok(Self {
            transport: Some(transport),
            runtime,
            options,
            state: SessionState::Disconnected,
            session_id: None,
            username: None,
            motd: None,
            catalog: None,
            call_lock: Mutex::new(()),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn motd(&self) -> Option<&str> {
        self.motd.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The command catalog of the current login.
    pub fn catalog(&self) -> Result<&Catalog> {
        self.require_auth()?;
        self.catalog
            .as_ref()
            .ok_or(Error::NotAuthenticated(self.state))
    }

    /// Fetch the server banner and move to `Connected`.
    pub fn connect(&mut self) -> Result<()> {
        match self.state {
            SessionState::Disconnected => {}
            SessionState::Closed => return Err(Error::SessionClosed),
            state => {
                return Err(Error::InvalidState {
                    operation: "connect",
                    state,
                });
            }
        }
        let params = vec![
            Value::from(self.options.client_name.as_str()),
            Value::from(self.options.client_version.as_str()),
        ];
        let motd = match self.dispatch("get_motd", params)? {
            Outcome::Value(Value::String(s)) => Some(s),
            Outcome::Value(Value::Nil) => None,
            Outcome::Value(other) => {
                return Err(Error::Protocol(format!(
                    "get_motd: expected a string, got {}",
                    other.kind()
                )));
            }
            Outcome::Fault(msg) => {
                return Err(Error::Protocol(format!("get_motd rejected: {msg}")));
            }
        };
        self.motd = motd;
        self.state = SessionState::Connected;
        tracing::info!("connected");
        Ok(())
    }

    /// Authenticate and fetch the command catalog for the new login.
    ///
    /// Allowed while `Connected` or `Authenticated`. On any failure the
    /// previous login (if any) stays in effect.
    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        match self.state {
            SessionState::Connected | SessionState::Authenticated => {}
            SessionState::Closed => return Err(Error::SessionClosed),
            state => {
                return Err(Error::InvalidState {
                    operation: "login",
                    state,
                });
            }
        }

        let session_id = match self.dispatch("login", vec![username.into(), password.into()])? {
            Outcome::Value(Value::String(id)) => id,
            Outcome::Value(other) => {
                return Err(Error::Protocol(format!(
                    "login: expected a session id, got {}",
                    other.kind()
                )));
            }
            Outcome::Fault(msg) => {
                let reason = match classify_fault(&msg) {
                    Error::RemoteCommand(m) => m,
                    other => other.to_string(),
                };
                return Err(Error::Authentication(reason));
            }
        };

        let catalog = match self.fetch_catalog(&session_id) {
            Ok(catalog) => catalog,
            Err(e) => {
                self.notify_logout_of(&session_id);
                return Err(e);
            }
        };
        tracing::debug!(commands = catalog.len(), "fetched command catalog");

        self.session_id = Some(session_id);
        self.username = Some(username.to_string());
        self.catalog = Some(catalog);
        self.state = SessionState::Authenticated;
        tracing::info!(user = username, "logged in");
        Ok(())
    }

    /// End the login but keep the channel for another [`Session::login`].
    pub fn logout(&mut self) -> Result<()> {
        match self.state {
            SessionState::Authenticated => {}
            SessionState::Closed => return Err(Error::SessionClosed),
            state => {
                return Err(Error::InvalidState {
                    operation: "logout",
                    state,
                });
            }
        }
        self.notify_logout();
        self.session_id = None;
        self.username = None;
        self.catalog = None;
        self.state = SessionState::Connected;
        tracing::info!("logged out");
        Ok(())
    }

    /// Release the transport. Terminal.
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(Error::SessionClosed);
        }
        if self.state == SessionState::Authenticated {
            self.notify_logout();
        }
        self.transport = None;
        self.session_id = None;
        self.username = None;
        self.catalog = None;
        self.state = SessionState::Closed;
        tracing::info!("session closed");
        Ok(())
    }

    /// Run a command and return the decoded value.
    pub fn call_raw(&self, name: &str, args: &[Value]) -> Result<Value> {
        let descriptor = self.resolve(name)?;
        self.run(descriptor, args)
    }

    /// Run a command and render the result for display.
    pub fn call_formatted(&self, name: &str, args: &[Value]) -> Result<String> {
        let descriptor = self.resolve(name)?;
        let value = self.run(descriptor, args)?;
        let suggestion = match self.suggestion_for(descriptor) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(command = name, "no format suggestion ({e}); showing plain text");
                None
            }
        };
        Ok(Formatter::new(suggestion).format(&value))
    }

    /// Server help. No arguments gives the general help text.
    pub fn help(&self, args: &[&str]) -> Result<String> {
        let session_id = self.require_auth()?;
        let mut params = vec![Value::from(session_id)];
        params.extend(args.iter().map(|a| Value::from(*a)));
        self.remote("help", params).map(text_of)
    }

    pub fn arg_help(&self, help_ref: &str) -> Result<String> {
        self.help(&["arg_help", help_ref])
    }

    /// Ask a `prompt_func` command for its next prompt given the answers so far.
    pub fn call_prompt_func(&self, name: &str, args: &[Value]) -> Result<Value> {
        self.session_call("call_prompt_func", name, args)
    }

    /// Ask the server for the default of the parameter after `args`.
    pub fn get_default_param(&self, name: &str, args: &[Value]) -> Result<Value> {
        self.session_call("get_default_param", name, args)
    }

    /* ---- internals ---- */

    fn require_auth(&self) -> Result<&str> {
        match (self.state, &self.session_id) {
            (SessionState::Closed, _) => Err(Error::SessionClosed),
            (SessionState::Authenticated, Some(id)) => Ok(id),
            (state, _) => Err(Error::NotAuthenticated(state)),
        }
    }

    fn resolve(&self, name: &str) -> Result<&CommandDescriptor> {
        self.catalog()?.resolve(name)
    }

    fn run(&self, descriptor: &CommandDescriptor, args: &[Value]) -> Result<Value> {
        self.session_call("run_command", &descriptor.name, args)
    }

    fn session_call(&self, method: &str, name: &str, args: &[Value]) -> Result<Value> {
        let session_id = self.require_auth()?;
        let mut params = Vec::with_capacity(args.len() + 2);
        params.push(Value::from(session_id));
        params.push(Value::from(name));
        params.extend(args.iter().cloned());
        self.remote(method, params)
    }

    fn suggestion_for<'a>(
        &self,
        descriptor: &'a CommandDescriptor,
    ) -> Result<Option<&'a FormatSuggestion>> {
        if let Some(slot) = descriptor.suggestion_slot() {
            return Ok(slot.suggestion());
        }
        let raw = self.remote("get_format_suggestion", vec![Value::from(descriptor.name.as_str())])?;
        Ok(descriptor.resolve_suggestion(&raw).suggestion())
    }

    fn fetch_catalog(&self, session_id: &str) -> Result<Catalog> {
        let commands = self.remote("get_commands", vec![Value::from(session_id)])?;
        Catalog::from_wire(&commands)
    }

    fn notify_logout(&self) {
        if let Some(id) = self.session_id.as_deref() {
            self.notify_logout_of(id);
        }
    }

    fn notify_logout_of(&self, session_id: &str) {
        if let Err(e) = self.remote("logout", vec![Value::from(session_id)]) {
            tracing::warn!("logout notification failed: {e}");
        }
    }

    fn remote(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        match self.dispatch(method, params)? {
            Outcome::Value(v) => Ok(v),
            Outcome::Fault(msg) => Err(classify_fault(&msg)),
        }
    }

    /// One guarded, deadline-bounded round trip.
    fn dispatch(&self, method: &str, params: Vec<Value>) -> Result<Outcome> {
        let transport = self.transport.as_ref().ok_or(Error::SessionClosed)?;
        let _guard = match self.call_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(Error::SessionBusy),
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
        };

        let params: Vec<Value> = params.into_iter().map(escape_arg).collect();
        tracing::debug!(method, args = params.len(), "remote call");

        let timeout = self.options.timeout;
        let reply = self
            .runtime
            .block_on(async { tokio::time::timeout(timeout, transport.invoke(method, &params)).await })
            .map_err(|_| Error::Timeout(timeout))?;

        match reply {
            Ok(value) => Ok(Outcome::Value(wash(value))),
            Err(TransportFault::Server { code, message }) => {
                tracing::debug!(method, code, "server fault: {message}");
                Ok(Outcome::Fault(message))
            }
            Err(TransportFault::Io(msg)) => Err(Error::Transport(msg)),
            Err(TransportFault::Decode(msg)) => Err(Error::Protocol(msg)),
        }
    }
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("username", &self.username)
            .field("commands", &self.catalog.as_ref().map(Catalog::len))
            .finish()
    }
}
