//! Host-driven node core: the host feeds received lines in, gets events back.

use crate::peer::PeerAddr;
use crate::protocol::Message;
use crate::registry::PeerRegistry;
use crate::wire;

/// What the protocol told us; the host surfaces these to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Chat {
        from: PeerAddr,
        name: String,
        text: String,
    },
    ConnectRequested {
        from: PeerAddr,
        name: String,
    },
    PeerDisconnected {
        from: PeerAddr,
    },
}

/// Outcome of one received line: the event to surface and whether the
/// connection it arrived on should be closed.
#[derive(Debug)]
pub struct Received {
    pub event: Event,
    pub close: bool,
}

/// The node's protocol state: local identity plus the peer registry.
/// No I/O happens here; every connection handler funnels lines through
/// [`Node::on_line_received`] under one lock, which is the single
/// serialization point for the registry.
#[derive(Debug)]
pub struct Node {
    addr: PeerAddr,
    name: String,
    registry: PeerRegistry,
}

impl Node {
    pub fn new(addr: PeerAddr, name: impl Into<String>) -> Self {
        Self {
            addr,
            name: name.into(),
            registry: PeerRegistry::new(),
        }
    }

    pub fn local_addr(&self) -> PeerAddr {
        self.addr
    }

    pub fn display_name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Process one line that arrived on a connection from `transport`.
    ///
    /// A line whose header cannot be decoded is not dropped: it becomes a
    /// chat message attributed to the transport-level address, with the whole
    /// trimmed line as text.
    pub fn on_line_received(&mut self, transport: PeerAddr, line: &str) -> Received {
        let msg = wire::decode_line(line).unwrap_or_else(|_| Message::Chat {
            sender: transport,
            name: String::new(),
            text: line.trim().to_string(),
        });
        match msg {
            Message::Disconnect { sender } => {
                self.registry.remove(sender);
                Received {
                    event: Event::PeerDisconnected { from: sender },
                    close: true,
                }
            }
            Message::ConnectRequest { sender, name } => {
                self.registry.upsert(sender);
                Received {
                    event: Event::ConnectRequested { from: sender, name },
                    close: false,
                }
            }
            Message::Chat { sender, name, text } => {
                self.registry.upsert(sender);
                Received {
                    event: Event::Chat {
                        from: sender,
                        name,
                        text,
                    },
                    close: false,
                }
            }
        }
    }

    /// Build an outbound chat message carrying the local identity.
    pub fn chat(&self, text: impl Into<String>) -> Message {
        Message::Chat {
            sender: self.addr,
            name: self.name.clone(),
            text: text.into(),
        }
    }

    /// Build an outbound connection request carrying the local identity.
    pub fn connect_request(&self) -> Message {
        Message::ConnectRequest {
            sender: self.addr,
            name: self.name.clone(),
        }
    }

    /// Build an outbound disconnect notice.
    pub fn disconnect(&self) -> Message {
        Message::Disconnect { sender: self.addr }
    }

    // Registry operations the menu drives.

    pub fn peers(&self) -> Vec<PeerAddr> {
        self.registry.list()
    }

    pub fn available_peers(&self) -> Vec<PeerAddr> {
        self.registry.unconnected()
    }

    pub fn mark_connected(&mut self, addr: PeerAddr) {
        self.registry.mark_connected(addr);
    }
}
