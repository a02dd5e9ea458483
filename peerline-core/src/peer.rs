//! Peer addressing: the (ip, port) pair that identifies a remote node.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A peer is identified by its advertised listen address. Equality and
/// hashing are structural over the (ip, port) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddr {
    pub ip: IpAddr,
    pub port: u16,
}

impl PeerAddr {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    pub fn to_socket_addr(self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl From<SocketAddr> for PeerAddr {
    fn from(addr: SocketAddr) -> Self {
        Self {
            ip: addr.ip(),
            port: addr.port(),
        }
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl FromStr for PeerAddr {
    type Err = AddrParseError;

    /// Parse `ip:port`. The split is on the last `:` so the port is
    /// unambiguous even when the ip text carries colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ip_text, port_text) = s.rsplit_once(':').ok_or(AddrParseError::MissingColon)?;
        let ip: IpAddr = ip_text.trim().parse().map_err(AddrParseError::BadIp)?;
        let port: u16 = port_text.trim().parse().map_err(AddrParseError::BadPort)?;
        Ok(Self { ip, port })
    }
}

/// Error parsing an `ip:port` pair.
#[derive(Debug, thiserror::Error)]
pub enum AddrParseError {
    #[error("missing ':' between ip and port")]
    MissingColon,
    #[error("bad ip: {0}")]
    BadIp(std::net::AddrParseError),
    #[error("bad port: {0}")]
    BadPort(std::num::ParseIntError),
}

// Serialized as the `ip:port` string form (used by the config bootstrap list).
impl Serialize for PeerAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeerAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}
