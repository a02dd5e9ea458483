//! Outbound sends: short-lived fire-and-forget connections to a peer.

use std::io::ErrorKind;
use std::time::Duration;

use peerline_core::{encode_line, Message, PeerAddr};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// A failed outbound send. Always recoverable: reported to the caller and the
/// operation is abandoned, nothing else is affected.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("connect timed out")]
    ConnectTimeout,
    #[error("connection refused")]
    Refused,
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

/// Open a connection to `target`, write one framed message, close. No
/// acknowledgement is awaited.
pub async fn send_message(target: PeerAddr, msg: &Message) -> Result<(), SendError> {
    let line = encode_line(msg);
    let mut stream = match timeout(CONNECT_TIMEOUT, TcpStream::connect(target.to_socket_addr()))
        .await
    {
        Err(_) => return Err(SendError::ConnectTimeout),
        Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => return Err(SendError::Refused),
        Ok(Err(e)) => return Err(SendError::Transport(e)),
        Ok(Ok(stream)) => stream,
    };
    timeout(WRITE_TIMEOUT, async {
        stream.write_all(line.as_bytes()).await?;
        stream.shutdown().await
    })
    .await
    .map_err(|_| {
        SendError::Transport(std::io::Error::new(ErrorKind::TimedOut, "write timed out"))
    })??;
    debug!(%target, "message sent");
    Ok(())
}

/// Send one chat line to `target`, identified as `sender`/`name`.
pub async fn send_chat(
    target: PeerAddr,
    sender: PeerAddr,
    name: &str,
    text: &str,
) -> Result<(), SendError> {
    send_message(
        target,
        &Message::Chat {
            sender,
            name: name.to_string(),
            text: text.to_string(),
        },
    )
    .await
}

/// Tell `target` to drop us from its registry.
pub async fn send_disconnect(target: PeerAddr, sender: PeerAddr) -> Result<(), SendError> {
    send_message(target, &Message::Disconnect { sender }).await
}

/// Ask `target` to note us as an active peer. On success the caller marks
/// `target` in the connected set; on failure nothing is recorded.
pub async fn request_connection(
    target: PeerAddr,
    sender: PeerAddr,
    name: &str,
) -> Result<(), SendError> {
    send_message(
        target,
        &Message::ConnectRequest {
            sender,
            name: name.to_string(),
        },
    )
    .await
}
