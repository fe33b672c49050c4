//! bofh - client library for the bofhd administration service.
//!
//! Key items:
//! - `proto::connect` / `proto::Session` (authenticated channel, raw and formatted calls)
//! - `proto::Catalog` (commands discovered at login)
//! - `formatting::FormatSuggestion` / `formatting::Formatter` (server-driven response rendering)
//! - `config` (default URL, CA bundle lookup)
//!
//! ```no_run
//! use bofh::proto::{self, ConnectOptions};
//!
//! # fn main() -> bofh::proto::Result<()> {
//! let mut session = proto::connect("https://bofhd.example.org:8000/", &ConnectOptions::default())?;
//! session.login("alice", "hunter2")?;
//! let text = session.group("user")?.command("info")?.call(&["alice".into()])?;
//! println!("{text}");
//! session.close()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod formatting;
pub mod proto;
