//! Defaults and resource lookup.
//!
//! Resources (currently only the CA bundle) are searched for in, in order:
//!
//! 1. `<user config dir>/bofh` (e.g. `~/.config/bofh`)
//! 2. `/etc/bofh`

use std::path::{Path, PathBuf};

pub const DEFAULT_URL: &str = "https://localhost:8000/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const CA_BUNDLE: &str = "cacerts.pem";
pub const PROMPT: &str = "bofh>>> ";

pub const ENV_URL: &str = "BOFH_URL";
pub const ENV_CAFILE: &str = "BOFH_CAFILE";
pub const ENV_TIMEOUT: &str = "BOFH_TIMEOUT";
pub const ENV_USER: &str = "BOFH_USER";
pub const ENV_PASSWORD: &str = "BOFH_PASSWORD";

pub fn config_path() -> Vec<PathBuf> {
    let mut dirs_found = Vec::with_capacity(2);
    if let Some(dir) = dirs::config_dir() {
        dirs_found.push(dir.join("bofh"));
    }
    dirs_found.push(PathBuf::from("/etc/bofh"));
    dirs_found
}

/// First existing `name` in `search`.
pub fn find_in<P: AsRef<Path>>(search: &[P], name: &str) -> Option<PathBuf> {
    search
        .iter()
        .map(|dir| dir.as_ref().join(name))
        .find(|candidate| candidate.is_file())
}

pub fn find_config_file(name: &str) -> Option<PathBuf> {
    let found = find_in(&config_path(), name);
    tracing::debug!(name, ?found, "config file lookup");
    found
}

pub fn default_ca_file() -> Option<PathBuf> {
    find_config_file(CA_BUNDLE)
}

/// Login name to use when none was given.
pub fn default_user() -> Option<String> {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        },
        _ => PathBuf::from(path),
    }
}
