//! Load config from file and environment.

use peerline_core::PeerAddr;
use serde::Deserialize;
use std::path::PathBuf;

/// Node configuration. File: ~/.config/peerline/config.toml or
/// /etc/peerline/config.toml. Env overrides: PEERLINE_PORT, PEERLINE_NAME.
/// Anything still unset is prompted for at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Listen port. 0 means "ask at startup".
    #[serde(default)]
    pub port: u16,
    /// Display name shown to peers.
    #[serde(default)]
    pub name: Option<String>,
    /// Seconds a silent inbound connection is kept open (default 60).
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Peers to send a connection request to at startup.
    #[serde(default)]
    pub peers: Vec<PeerAddr>,
}

fn default_idle_timeout_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 0,
            name: None,
            idle_timeout_secs: default_idle_timeout_secs(),
            peers: Vec::new(),
        }
    }
}

/// Load config: merge default, then config file (if present), then env vars.
pub fn load() -> Config {
    let mut c = load_file().unwrap_or_default();
    if let Ok(s) = std::env::var("PEERLINE_PORT") {
        if let Ok(p) = s.parse::<u16>() {
            c.port = p;
        }
    }
    if let Ok(s) = std::env::var("PEERLINE_NAME") {
        if !s.is_empty() {
            c.name = Some(s);
        }
    }
    c
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/peerline/config.toml"));
    }
    out.push(PathBuf::from("/etc/peerline/config.toml"));
    out
}

fn load_file() -> Option<Config> {
    for p in config_paths() {
        if p.exists() {
            if let Ok(s) = std::fs::read_to_string(&p) {
                if let Ok(c) = toml::from_str::<Config>(&s) {
                    return Some(c);
                }
            }
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.port, 0);
        assert_eq!(c.idle_timeout_secs, 60);
        assert!(c.name.is_none());
        assert!(c.peers.is_empty());
    }

    #[test]
    fn parse_full_file() {
        let c: Config = toml::from_str(
            r#"
            port = 5000
            name = "Alice"
            idle_timeout_secs = 30
            peers = ["10.0.0.5:4000", "10.0.0.6:4000"]
            "#,
        )
        .unwrap();
        assert_eq!(c.port, 5000);
        assert_eq!(c.name.as_deref(), Some("Alice"));
        assert_eq!(c.idle_timeout_secs, 30);
        assert_eq!(c.peers.len(), 2);
        assert_eq!(c.peers[0].to_string(), "10.0.0.5:4000");
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(toml::from_str::<Config>("bogus = 1").is_err());
    }
}
