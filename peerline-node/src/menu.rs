//! Interactive menu: thin stdin glue over the node's public operations.

use std::io::Write as _;
use std::sync::Arc;

use peerline_core::{Event, Node, PeerAddr};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::sender::{self, SendError};

type StdinLines = Lines<BufReader<Stdin>>;

/// Print an inbound event. Called from the event-drain task as messages
/// arrive, interleaved with the menu.
pub fn announce(event: &Event) {
    match event {
        Event::Chat { from, name, text } => {
            if name.is_empty() {
                println!("\nMessage from {from} -\n{text}");
            } else {
                println!("\nMessage from {from} ({name}) -\n{text}");
            }
        }
        Event::ConnectRequested { from, name } => {
            println!("\nPeer {from} ({name}) requests a connection");
        }
        Event::PeerDisconnected { from } => {
            println!("\nPeer {from} disconnected");
        }
    }
}

/// Run the menu loop until the user quits or stdin closes.
pub async fn run(node: Arc<Mutex<Node>>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("\n***** Menu *****");
        println!("1. Send message");
        println!("2. Query known peers");
        println!("3. Connect to a peer");
        println!("0. Quit");
        let Some(choice) = prompt(&mut lines, "Enter choice: ").await? else {
            break;
        };
        match choice.as_str() {
            "1" => send_flow(&node, &mut lines).await?,
            "2" => list_peers(&node).await,
            "3" => connect_flow(&node, &mut lines).await?,
            "0" => {
                notify_disconnect(&node).await;
                println!("Exiting");
                break;
            }
            _ => println!("Invalid choice. Please try again."),
        }
    }
    Ok(())
}

async fn prompt(lines: &mut StdinLines, text: &str) -> anyhow::Result<Option<String>> {
    print!("{text}");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?.map(|s| s.trim().to_string()))
}

async fn send_flow(node: &Arc<Mutex<Node>>, lines: &mut StdinLines) -> anyhow::Result<()> {
    let Some(ip) = prompt(lines, "Enter the recipient's IP address: ").await? else {
        return Ok(());
    };
    let Some(port) = prompt(lines, "Enter the recipient's port number: ").await? else {
        return Ok(());
    };
    let target: PeerAddr = match format!("{ip}:{port}").parse() {
        Ok(addr) => addr,
        Err(e) => {
            println!("Invalid address: {e}");
            return Ok(());
        }
    };
    let Some(text) = prompt(lines, "Enter your message: ").await? else {
        return Ok(());
    };
    let (local, name) = identity(node).await;
    match sender::send_chat(target, local, &name, &text).await {
        Ok(()) => println!("Message sent to {target}"),
        Err(e) => report_send_error(target, &e),
    }
    Ok(())
}

async fn list_peers(node: &Arc<Mutex<Node>>) {
    let node = node.lock().await;
    let peers = node.peers();
    if peers.is_empty() {
        println!("No known peers");
        return;
    }
    println!("Known peers:");
    for (i, peer) in peers.iter().enumerate() {
        if node.registry().is_connected(*peer) {
            println!("{}. {peer} (connected)", i + 1);
        } else {
            println!("{}. {peer}", i + 1);
        }
    }
}

async fn connect_flow(node: &Arc<Mutex<Node>>, lines: &mut StdinLines) -> anyhow::Result<()> {
    let available = node.lock().await.available_peers();
    if available.is_empty() {
        println!("No peers available to connect");
        return Ok(());
    }
    println!("\nAvailable peers to connect:");
    for (i, peer) in available.iter().enumerate() {
        println!("{}. {peer}", i + 1);
    }
    let Some(choice) = prompt(lines, "\nEnter peer number to connect (0 to cancel): ").await?
    else {
        return Ok(());
    };
    let index = match choice.parse::<usize>() {
        Ok(0) => return Ok(()),
        Ok(n) if n <= available.len() => n - 1,
        Ok(_) => {
            println!("Invalid peer number");
            return Ok(());
        }
        Err(_) => {
            println!("Invalid input");
            return Ok(());
        }
    };
    let target = available[index];
    let (local, name) = identity(node).await;
    match sender::request_connection(target, local, &name).await {
        Ok(()) => {
            node.lock().await.mark_connected(target);
            println!("Successfully connected to peer {target}");
        }
        Err(e) => report_send_error(target, &e),
    }
    Ok(())
}

/// Tell every actively-connected peer we are leaving. Best-effort: a failed
/// goodbye is reported and skipped.
async fn notify_disconnect(node: &Arc<Mutex<Node>>) {
    let (local, targets) = {
        let node = node.lock().await;
        let targets: Vec<PeerAddr> = node
            .peers()
            .into_iter()
            .filter(|p| node.registry().is_connected(*p))
            .collect();
        (node.local_addr(), targets)
    };
    for target in targets {
        if let Err(e) = sender::send_disconnect(target, local).await {
            report_send_error(target, &e);
        }
    }
}

async fn identity(node: &Arc<Mutex<Node>>) -> (PeerAddr, String) {
    let node = node.lock().await;
    (node.local_addr(), node.display_name().to_string())
}

fn report_send_error(target: PeerAddr, err: &SendError) {
    match err {
        SendError::ConnectTimeout => {
            println!("Connection timed out while trying to reach {target}");
        }
        SendError::Refused => {
            println!("Connection refused by peer {target}. Make sure the peer is active.");
        }
        SendError::Transport(e) => {
            println!("Failed to send message to {target}. Error: {e}");
        }
    }
}
