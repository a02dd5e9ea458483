// peerline node: TCP listener, outbound sender, interactive menu.

mod config;
mod listener;
mod menu;
mod sender;

use std::io::Write as _;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use peerline_core::{Node, PeerAddr};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    for arg in std::env::args().skip(1) {
        if arg == "--version" || arg == "-V" {
            println!("peerline-node {VERSION}");
            return Ok(());
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PEERLINE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = config::load();
    let name = match cfg.name.clone() {
        Some(name) => name,
        None => prompt_line("Enter your name: ")?,
    };
    let port = match cfg.port {
        0 => prompt_port()?,
        p => p,
    };

    let ip = local_ip();
    println!("Your IP address is {ip}");

    let node = Arc::new(Mutex::new(Node::new(PeerAddr::new(ip, port), name)));
    let idle_timeout = Duration::from_secs(cfg.idle_timeout_secs);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        // Bind failure is fatal at startup: no retry, surface the port.
        let tcp = TcpListener::bind((ip, port))
            .await
            .with_context(|| format!("cannot bind {ip}:{port}"))?;
        info!("listening on {ip}:{port}");

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        tokio::spawn(listener::run_listener(
            tcp,
            node.clone(),
            idle_timeout,
            events_tx,
        ));
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                menu::announce(&event);
            }
        });

        for &peer in &cfg.peers {
            let (local, name) = {
                let n = node.lock().await;
                (n.local_addr(), n.display_name().to_string())
            };
            match sender::request_connection(peer, local, &name).await {
                Ok(()) => {
                    node.lock().await.mark_connected(peer);
                    info!(%peer, "bootstrap connection request sent");
                }
                Err(e) => warn!(%peer, error = %e, "bootstrap connect failed"),
            }
        }

        // Quit abandons in-flight handler tasks; delivery is best-effort.
        tokio::select! {
            result = menu::run(node) => result,
            _ = tokio::signal::ctrl_c() => {
                println!();
                Ok(())
            }
        }
    })
}

fn prompt_line(text: &str) -> anyhow::Result<String> {
    loop {
        print!("{text}");
        std::io::stdout().flush()?;
        let mut buf = String::new();
        if std::io::stdin().read_line(&mut buf)? == 0 {
            anyhow::bail!("stdin closed during startup");
        }
        let trimmed = buf.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
}

fn prompt_port() -> anyhow::Result<u16> {
    loop {
        let text = prompt_line("Enter your port number: ")?;
        match text.parse::<u16>() {
            Ok(p) if p != 0 => return Ok(p),
            _ => println!("Invalid port number"),
        }
    }
}

/// Best-effort local IP; messaging still works on loopback if detection fails.
fn local_ip() -> IpAddr {
    match local_ip_address::local_ip() {
        Ok(ip) => ip,
        Err(e) => {
            warn!(error = %e, "local IP detection failed, using 127.0.0.1");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}
