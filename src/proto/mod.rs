//! bofhd protocol client.
//!
//! connect     -> Session<HttpTransport> in state Connected (motd fetched)
//! Session     -> login / logout / close, call_raw / call_formatted
//! Catalog     -> per-login index of commands, with lazily resolved suggestions
//! Group/Command -> `session.group("user")?.command("info")?.call(&args)`
//!
//! The wire layer (`xmlrpc`, `transport`) is public so other transports can
//! be plugged in through the [`Transport`] trait.

pub mod catalog;
pub mod error;
pub mod facade;
pub mod session;
pub mod transport;
pub mod value;
pub mod xmlrpc;

use std::path::PathBuf;
use std::time::Duration;

pub use catalog::{Catalog, CommandDescriptor, Param, ParamDefault, Signature, SuggestionSlot};
pub use error::{Error, Result};
pub use facade::{Command, Group};
pub use session::{Session, SessionOptions, SessionState};
pub use transport::{Endpoint, HttpOptions, HttpTransport, Transport, TransportFault, parse_endpoint};
pub use value::{Record, Value, escape_arg, wash};

/// Everything needed to open a session against a bofhd URL.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub ca_file: Option<PathBuf>,
    pub insecure: bool,
    pub timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            ca_file: None,
            insecure: false,
            timeout: SessionOptions::default().timeout,
        }
    }
}

/// Build an HTTP(S) transport for `url` and connect a session over it.
pub fn connect(url: &str, options: &ConnectOptions) -> Result<Session<HttpTransport>> {
    let endpoint = parse_endpoint(url)?;
    tracing::debug!(%endpoint, "connecting");
    let http = HttpOptions {
        ca_file: options.ca_file.clone(),
        insecure: options.insecure,
        timeout: Some(options.timeout),
    };
    let transport = HttpTransport::new(endpoint, &http)?;
    let mut session = Session::new(
        transport,
        SessionOptions {
            timeout: options.timeout,
            ..SessionOptions::default()
        },
    )?;
    session.connect()?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn reply(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><methodResponse><params><param><value>{body}</value></param></params></methodResponse>"
        )
    }

    #[test]
    fn connect_fetches_motd() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).body_includes("get_motd");
            then.status(200).body(reply("<string>Scheduled downtime friday</string>"));
        });

        let session = connect(&server.url("/"), &ConnectOptions::default()).unwrap();
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.motd(), Some("Scheduled downtime friday"));
    }

    #[test]
    fn connect_rejects_other_schemes() {
        let err = connect("ftp://bofh.example.org/", &ConnectOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Protocol(m) if m.contains("unsupported protocol")));
    }

    #[test]
    fn connect_to_dead_server_is_a_transport_error() {
        let options = ConnectOptions {
            timeout: Duration::from_secs(2),
            ..ConnectOptions::default()
        };
        let err = connect("http://127.0.0.1:1/", &options).unwrap_err();
        assert!(err.is_fatal(), "{err:?}");
    }
}
