//! Framing: one newline-terminated text line, `<ip:port>` header + payload.
//!
//! All three message kinds share the bracketed header. The historical
//! unbracketed `connection_request` form is not parsed here; lines without a
//! valid header are the caller's business (the handler attributes them to the
//! transport address and treats them as chat, so nothing is ever dropped).

use crate::peer::{AddrParseError, PeerAddr};
use crate::protocol::Message;

/// Upper bound on one wire line, terminator included. Anything longer is
/// hostile or broken and the connection handler gives up on it.
pub const MAX_LINE_LEN: usize = 8 * 1024;

const DISCONNECT_KEYWORD: &str = "DISCONNECT";
const CONNECT_KEYWORD: &str = "connection_request";

/// Encode a message into its wire line, newline-terminated.
pub fn encode_line(msg: &Message) -> String {
    match msg {
        Message::Chat { sender, name, text } => format!("<{sender}> {name}: {text}\n"),
        Message::ConnectRequest { sender, name } => {
            format!("<{sender}> {name} {CONNECT_KEYWORD}\n")
        }
        Message::Disconnect { sender } => format!("<{sender}> {DISCONNECT_KEYWORD}\n"),
    }
}

/// Decode one wire line. The header is the substring between `<` and the
/// first `>`; it must parse as `ip:port`. Everything after the header is the
/// payload, classified by [`classify`]. Errors mean "no usable header", so
/// the caller can fall back to the transport address.
pub fn decode_line(line: &str) -> Result<Message, DecodeError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let rest = line.strip_prefix('<').ok_or(DecodeError::MissingHeader)?;
    let (header, payload) = rest.split_once('>').ok_or(DecodeError::MissingHeader)?;
    let sender: PeerAddr = header.parse()?;
    Ok(classify(sender, payload.trim()))
}

/// Classify a payload. Never fails: an unrecognized payload is a chat line
/// with no sender name rather than an error.
fn classify(sender: PeerAddr, payload: &str) -> Message {
    if payload == DISCONNECT_KEYWORD {
        return Message::Disconnect { sender };
    }
    // `NAME connection_request`, as long as the payload is not chat-shaped
    // (a colon means `NAME: TEXT` and the keyword is just message text).
    if !payload.contains(':') {
        if let Some(name) = payload.strip_suffix(CONNECT_KEYWORD) {
            let name = name.trim();
            if !name.is_empty() {
                return Message::ConnectRequest {
                    sender,
                    name: name.to_string(),
                };
            }
        }
    }
    match payload.split_once(": ") {
        Some((name, text)) => Message::Chat {
            sender,
            name: name.to_string(),
            text: text.to_string(),
        },
        None => Message::Chat {
            sender,
            name: String::new(),
            text: payload.to_string(),
        },
    }
}

/// Error decoding a wire line: the header is absent or does not parse.
/// Recovered by the connection handler, never shown to users.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("missing <ip:port> header")]
    MissingHeader,
    #[error("bad header: {0}")]
    BadHeader(#[from] AddrParseError),
}
