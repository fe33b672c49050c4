//! Transport layer: endpoint parsing and the XML-RPC-over-HTTP transport.
//!
//! parse_endpoint -> Endpoint { url, secure }
//! Transport      -> one async `invoke(method, params)` per remote call
//! HttpTransport  -> reqwest client posting `<methodCall>` documents

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use super::error::{Error, Result};
use super::value::Value;
use super::xmlrpc::{self, Reply};

/// Why a single remote invocation did not produce a value.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFault {
    /// Network / TLS / HTTP status failure.
    Io(String),
    /// The reply could not be decoded as XML-RPC.
    Decode(String),
    /// The server answered with an XML-RPC fault.
    Server { code: i64, message: String },
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFault::Io(msg) => write!(f, "I/O failure: {msg}"),
            TransportFault::Decode(msg) => write!(f, "undecodable reply: {msg}"),
            TransportFault::Server { code, message } => write!(f, "fault {code}: {message}"),
        }
    }
}

/// A blocking-call-shaped channel to the server.
///
/// Implementations perform exactly one request per `invoke`; the session
/// serialises calls and enforces the deadline around the returned future.
pub trait Transport {
    fn invoke(
        &self,
        method: &str,
        params: &[Value],
    ) -> impl Future<Output = std::result::Result<Value, TransportFault>> + Send;
}

/* ---- Endpoint ---- */

/// A parsed server endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: Url,
}

impl Endpoint {
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Parse a user supplied server URL. Only `http` and `https` are accepted.
pub fn parse_endpoint(raw: &str) -> Result<Endpoint> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Protocol("server url is empty".into()));
    }
    let url =
        Url::parse(trimmed).map_err(|e| Error::Protocol(format!("invalid url '{trimmed}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(Endpoint { url }),
        other => Err(Error::Protocol(format!("unsupported protocol: '{other}'"))),
    }
}

/* ---- HTTP transport ---- */

/// TLS and deadline options for [`HttpTransport`].
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Extra PEM trust root.
    pub ca_file: Option<PathBuf>,
    /// Skip certificate and hostname verification.
    pub insecure: bool,
    /// Socket-level timeout; the session enforces its own deadline as well.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: Endpoint,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(endpoint: Endpoint, options: &HttpOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if endpoint.is_secure() {
            if let Some(path) = &options.ca_file {
                let pem = std::fs::read(path).map_err(|e| {
                    Error::Transport(format!("cannot read CA file {}: {e}", path.display()))
                })?;
                let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                    Error::Transport(format!("invalid CA file {}: {e}", path.display()))
                })?;
                builder = builder.add_root_certificate(cert);
            }
            if options.insecure {
                tracing::warn!("certificate verification disabled for {endpoint}");
                builder = builder.danger_accept_invalid_certs(true);
            }
        }
        let client = builder
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    async fn invoke(
        &self,
        method: &str,
        params: &[Value],
    ) -> std::result::Result<Value, TransportFault> {
        let body = xmlrpc::encode_call(method, params);
        let response = self
            .client
            .post(self.endpoint.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportFault::Io(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportFault::Io(format!("HTTP {status} from {}", self.endpoint)));
        }
        let text = response
            .text()
            .await
            .map_err(|e| TransportFault::Io(e.to_string()))?;

        match xmlrpc::decode_response(&text).map_err(TransportFault::Decode)? {
            Reply::Value(v) => Ok(v),
            Reply::Fault { code, message } => Err(TransportFault::Server { code, message }),
        }
    }
}
