//! peerline wire protocol: message kinds exchanged between nodes.

use crate::peer::PeerAddr;

/// All wire message kinds. Encoding is one newline-terminated text line with a
/// `<ip:port>` header; see the wire module for the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A chat line from a named sender.
    Chat {
        sender: PeerAddr,
        name: String,
        text: String,
    },
    /// Ask the receiver to note the sender as an active peer.
    ConnectRequest { sender: PeerAddr, name: String },
    /// Graceful goodbye; the receiver drops the sender from its registry.
    Disconnect { sender: PeerAddr },
}

impl Message {
    /// The address the sender declared in the header.
    pub fn sender(&self) -> PeerAddr {
        match self {
            Message::Chat { sender, .. }
            | Message::ConnectRequest { sender, .. }
            | Message::Disconnect { sender } => *sender,
        }
    }
}
