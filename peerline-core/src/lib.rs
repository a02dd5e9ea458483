//! peerline protocol reference implementation.
//! Host-driven: no I/O; the host feeds received lines in and acts on the returned events.

pub mod node;
pub mod peer;
pub mod protocol;
pub mod registry;
pub mod wire;

pub use node::{Event, Node, Received};
pub use peer::{AddrParseError, PeerAddr};
pub use protocol::Message;
pub use registry::PeerRegistry;
pub use wire::{decode_line, encode_line, DecodeError, MAX_LINE_LEN};
