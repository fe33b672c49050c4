//! Error taxonomy for the bofhd client.
//!
//! Every failure a caller can observe maps to exactly one variant, so the CLI
//! layer can tell client-side misuse, transport failure and server-reported
//! failure apart without string matching.

use std::time::Duration;

use thiserror::Error;

use super::session::SessionState;

/// Convenience alias used throughout the protocol layer.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The channel could not be established or broke mid-call.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with something that violates the expected wire shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Credentials were rejected. The session stays usable for a retry.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server executed the request and reported an application-level failure.
    #[error("{0}")]
    RemoteCommand(String),

    /// The server no longer recognises our session id; log in again.
    #[error("session expired, please log in again")]
    SessionExpired,

    /// The server was restarted between calls; the command catalog may be stale.
    #[error("server restarted, please log in again")]
    ServerRestarted,

    /// Raised client-side before any network call.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// One command's format suggestion could not be parsed. Contained by the catalog.
    #[error("malformed format suggestion: {0}")]
    MalformedSuggestion(String),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("session is closed")]
    SessionClosed,

    #[error("session is busy with another call")]
    SessionBusy,

    #[error("not logged in (session is {0})")]
    NotAuthenticated(SessionState),

    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

impl Error {
    /// Errors after which the interactive loop should end rather than continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::SessionClosed)
    }
}
