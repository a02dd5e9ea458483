//! TCP listener: accept inbound connections, one detached handler task each.

use std::sync::Arc;
use std::time::Duration;

use peerline_core::{Event, Node, PeerAddr, MAX_LINE_LEN};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// Consecutive unusable reads (over-long or blank lines) before a connection
/// is written off as broken.
const MALFORMED_BUDGET: u32 = 3;

/// Accept loop: runs forever. Each accepted connection gets its own detached
/// task; nobody joins it and process exit does not wait for it. An accept
/// error is logged and the loop keeps going, so one broken client can never
/// take the listener down.
pub async fn run_listener(
    listener: TcpListener,
    node: Arc<Mutex<Node>>,
    idle_timeout: Duration,
    events: mpsc::UnboundedSender<Event>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, remote)) => {
                let node = node.clone();
                let events = events.clone();
                tokio::spawn(async move {
                    handle_connection(stream, remote.into(), node, idle_timeout, events).await;
                });
            }
            Err(e) => warn!(error = %e, "accept failed"),
        }
    }
}

/// Read one connection until it closes, goes idle past the timeout, sends a
/// disconnect, or exhausts the malformed-input budget. Each complete line is
/// fed to the node core under its lock; the resulting event goes to the
/// events channel for display.
async fn handle_connection(
    stream: TcpStream,
    remote: PeerAddr,
    node: Arc<Mutex<Node>>,
    idle_timeout: Duration,
    events: mpsc::UnboundedSender<Event>,
) {
    info!(%remote, "peer connected");
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::with_capacity(256);
    let mut strikes = 0u32;
    loop {
        buf.clear();
        // Cap each line read so a peer streaming garbage without newlines
        // cannot grow the buffer without bound.
        let mut limited = (&mut reader).take((MAX_LINE_LEN + 1) as u64);
        let n = match tokio::time::timeout(idle_timeout, limited.read_until(b'\n', &mut buf)).await
        {
            Err(_) => {
                info!(%remote, "idle timeout, closing");
                break;
            }
            Ok(Err(e)) => {
                warn!(%remote, error = %e, "read failed");
                break;
            }
            Ok(Ok(n)) => n,
        };
        if n == 0 {
            debug!(%remote, "peer closed");
            break;
        }
        // Cap is terminator-included: anything longer is discarded whole.
        if buf.len() > MAX_LINE_LEN {
            strikes += 1;
            warn!(%remote, strikes, "line too long, discarded");
            if strikes >= MALFORMED_BUDGET {
                warn!(%remote, "malformed-input budget exhausted, closing");
                break;
            }
            // Skip the rest of the discarded line so its tail is not
            // surfaced as a fresh message.
            if buf.last() != Some(&b'\n') && !discard_to_newline(&mut reader, idle_timeout).await {
                break;
            }
            continue;
        }
        // Raw bytes are never a reason to drop a message.
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim();
        if line.is_empty() {
            strikes += 1;
            if strikes >= MALFORMED_BUDGET {
                warn!(%remote, "malformed-input budget exhausted, closing");
                break;
            }
            continue;
        }
        strikes = 0;
        let received = node.lock().await.on_line_received(remote, line);
        let close = received.close;
        let _ = events.send(received.event);
        if close {
            debug!(%remote, "disconnect received, closing");
            break;
        }
    }
}

/// Consume bytes up to and including the next newline. Returns false when
/// the connection should close instead (EOF, read error, or idle timeout).
async fn discard_to_newline(reader: &mut BufReader<TcpStream>, idle_timeout: Duration) -> bool {
    let mut skip = Vec::with_capacity(1024);
    loop {
        skip.clear();
        let mut limited = (&mut *reader).take(MAX_LINE_LEN as u64);
        match tokio::time::timeout(idle_timeout, limited.read_until(b'\n', &mut skip)).await {
            Err(_) | Ok(Err(_)) | Ok(Ok(0)) => return false,
            Ok(Ok(_)) => {
                if skip.last() == Some(&b'\n') {
                    return true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::AsyncWriteExt;

    const RECV_WAIT: Duration = Duration::from_secs(2);

    async fn spawn_node(
        idle_timeout: Duration,
    ) -> (
        SocketAddr,
        Arc<Mutex<Node>>,
        mpsc::UnboundedReceiver<Event>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let node = Arc::new(Mutex::new(Node::new(addr.into(), "A")));
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_listener(listener, node.clone(), idle_timeout, tx));
        (addr, node, rx)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
        tokio::time::timeout(RECV_WAIT, rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn inbound_chat_registers_declared_sender() {
        let (addr, node, mut rx) = spawn_node(Duration::from_secs(60)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"<127.0.0.1:5001> B: hello\n")
            .await
            .unwrap();
        let event = next_event(&mut rx).await;
        assert_eq!(
            event,
            Event::Chat {
                from: "127.0.0.1:5001".parse().unwrap(),
                name: "B".to_string(),
                text: "hello".to_string(),
            }
        );
        // Asymmetric: the registry reflects senders heard, not recipients.
        let peers = node.lock().await.peers();
        assert_eq!(peers, vec!["127.0.0.1:5001".parse().unwrap()]);
    }

    #[tokio::test]
    async fn malformed_line_attributed_to_transport_address() {
        let (addr, node, mut rx) = spawn_node(Duration::from_secs(60)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        let transport: PeerAddr = client.local_addr().unwrap().into();
        client.write_all(b"raw text no header\n").await.unwrap();
        let event = next_event(&mut rx).await;
        assert_eq!(
            event,
            Event::Chat {
                from: transport,
                name: String::new(),
                text: "raw text no header".to_string(),
            }
        );
        assert!(node.lock().await.registry().contains(transport));
    }

    #[tokio::test]
    async fn disconnect_removes_peer_and_closes_connection() {
        let (addr, node, mut rx) = spawn_node(Duration::from_secs(60)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"<127.0.0.1:5001> B: hello\n<127.0.0.1:5001> DISCONNECT\n")
            .await
            .unwrap();
        assert!(matches!(next_event(&mut rx).await, Event::Chat { .. }));
        assert_eq!(
            next_event(&mut rx).await,
            Event::PeerDisconnected {
                from: "127.0.0.1:5001".parse().unwrap()
            }
        );
        assert!(node.lock().await.registry().is_empty());
        // The handler closes its end after a disconnect.
        let mut buf = [0u8; 8];
        let n = tokio::time::timeout(RECV_WAIT, client.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn idle_connection_is_closed_and_listener_survives() {
        let (addr, node, mut rx) = spawn_node(Duration::from_millis(100)).await;
        let mut idle = TcpStream::connect(addr).await.unwrap();
        // Say nothing; the handler should hang up on us.
        let mut buf = [0u8; 8];
        let n = tokio::time::timeout(RECV_WAIT, idle.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
        // The listener is still accepting and handling traffic.
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"<127.0.0.1:5002> C: hi\n").await.unwrap();
        assert!(matches!(next_event(&mut rx).await, Event::Chat { .. }));
        assert!(node
            .lock()
            .await
            .registry()
            .contains("127.0.0.1:5002".parse().unwrap()));
    }

    #[tokio::test]
    async fn overlong_line_tail_is_not_surfaced_as_a_message() {
        let (addr, node, mut rx) = spawn_node(Duration::from_secs(60)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        let transport: PeerAddr = client.local_addr().unwrap().into();
        // One discarded line well past the cap, then a real message. The
        // discarded line's tail must be skipped, not read as fresh input.
        let mut long = vec![b'x'; 12 * 1024];
        long.extend_from_slice(b" leftover tail\n");
        client.write_all(&long).await.unwrap();
        client
            .write_all(b"<127.0.0.1:5001> B: real\n")
            .await
            .unwrap();
        let event = next_event(&mut rx).await;
        assert_eq!(
            event,
            Event::Chat {
                from: "127.0.0.1:5001".parse().unwrap(),
                name: "B".to_string(),
                text: "real".to_string(),
            }
        );
        // The tail never went through the chat fallback, so the transport
        // address was never upserted.
        assert!(!node.lock().await.registry().contains(transport));
    }

    #[tokio::test]
    async fn line_at_cap_including_terminator_is_discarded() {
        let (addr, _node, mut rx) = spawn_node(Duration::from_secs(60)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        // MAX_LINE_LEN payload bytes plus the terminator is one over the cap.
        let mut line = vec![b'y'; MAX_LINE_LEN];
        line.push(b'\n');
        client.write_all(&line).await.unwrap();
        client.write_all(b"<127.0.0.1:5001> B: ok\n").await.unwrap();
        let event = next_event(&mut rx).await;
        assert!(matches!(event, Event::Chat { ref text, .. } if text == "ok"));
    }

    #[tokio::test]
    async fn one_connection_carries_multiple_messages_in_order() {
        let (addr, _node, mut rx) = spawn_node(Duration::from_secs(60)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"<127.0.0.1:5001> B: one\n<127.0.0.1:5001> B: two\n")
            .await
            .unwrap();
        let first = next_event(&mut rx).await;
        let second = next_event(&mut rx).await;
        assert!(matches!(first, Event::Chat { ref text, .. } if text == "one"));
        assert!(matches!(second, Event::Chat { ref text, .. } if text == "two"));
    }
}
