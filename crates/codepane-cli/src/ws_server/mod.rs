//! WebSocket relay for previews opened in a real browser.
//!
//! A preview rendered with `--relay` connects to `/relay/<context-id>` and
//! sends every wire message as a text frame. All connections feed one host
//! relay, which follows the newest render cycle and ignores the rest.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use codepane::context::{boundary, Envelope, Inbox, Outbox};
use codepane::{ContextId, HostRelay, LogEntry};
use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;

use crate::report;

const RELAY_PREFIX: &str = "/relay/";

/// The context named by a `/relay/<context-id>` request path.
pub fn context_from_path(path: &str) -> Option<ContextId> {
    path.strip_prefix(RELAY_PREFIX)?.trim_end_matches('/').parse().ok()
}

/// A bound relay listener that has not started accepting yet.
pub struct RelayServer {
    listener: TcpListener,
}

impl RelayServer {
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("Failed to bind relay to port {port}"))?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept previews in the background. Every connection posts into the
    /// returned inbox.
    pub fn start(self) -> Inbox {
        let (tx, inbox) = boundary();
        tokio::spawn(accept_loop(self.listener, tx));
        inbox
    }
}

/// What one envelope did to the relay.
#[derive(Debug, PartialEq, Eq)]
pub enum Routed<'a> {
    /// From an older cycle, or not a wire message.
    Dropped,
    Entry { new_cycle: bool, entry: &'a LogEntry },
}

/// Follow the newest cycle seen so far, then hand the envelope to the relay.
pub fn route<'a>(relay: &'a mut HostRelay, envelope: &Envelope) -> Routed<'a> {
    let new_cycle = relay.follow_latest(envelope.sender);
    match relay.receive(envelope) {
        Some(entry) => Routed::Entry { new_cycle, entry },
        None => Routed::Dropped,
    }
}

pub async fn serve(port: u16) -> Result<()> {
    let server = RelayServer::bind(port).await?;
    println!("Relay listening on ws://{}{RELAY_PREFIX}<context>", server.local_addr()?);

    let mut inbox = server.start();
    let mut relay = HostRelay::new();
    while let Some(envelope) = inbox.recv().await {
        if let Routed::Entry { new_cycle, entry } = route(&mut relay, &envelope) {
            if new_cycle {
                println!("\n Preview {}", envelope.sender);
            }
            report::print_entry(entry);
        }
    }
    Ok(())
}

async fn accept_loop(listener: TcpListener, tx: UnboundedSender<Envelope>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, addr, tx).await {
                        log::warn!("Relay connection from {addr} failed: {e}");
                    }
                });
            }
            Err(e) => log::error!("Failed to accept relay connection: {e}"),
        }
    }
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, tx: UnboundedSender<Envelope>) -> Result<()> {
    let mut context = None;
    let mut ws = tokio_tungstenite::accept_hdr_async(
        stream,
        |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            context = context_from_path(request.uri().path());
            if context.is_some() {
                return Ok(response);
            }
            let mut rejection = ErrorResponse::new(Some(format!("expected {RELAY_PREFIX}<context-id>")));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        },
    )
    .await?;

    let Some(context) = context else {
        return Ok(());
    };
    log::debug!("Preview {context} connected from {addr}");

    let outbox = Outbox::new(context, tx);
    while let Some(message) = ws.next().await {
        match message? {
            Message::Text(text) => outbox.post(text),
            Message::Close(_) => break,
            _ => {}
        }
    }
    log::debug!("Preview {context} disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::SinkExt;
    use tokio_tungstenite::connect_async;

    use super::*;

    fn log(text: &str) -> Message {
        Message::Text(format!(r#"{{"type":"console","method":"log","args":["{text}"]}}"#))
    }

    async fn next_envelope(inbox: &mut Inbox) -> Envelope {
        tokio::time::timeout(Duration::from_secs(5), inbox.recv())
            .await
            .expect("relay received nothing")
            .expect("relay inbox closed")
    }

    fn texts(relay: &HostRelay) -> Vec<&str> {
        relay.panel().entries().iter().map(|entry| entry.text.as_str()).collect()
    }

    #[test]
    fn relay_paths() {
        let id = ContextId::new();
        assert_eq!(context_from_path(&format!("/relay/{id}")), Some(id));
        assert_eq!(context_from_path(&format!("/relay/{id}/")), Some(id));
        assert_eq!(context_from_path("/relay/"), None);
        assert_eq!(context_from_path("/relay/not-an-id"), None);
        assert_eq!(context_from_path(&format!("/other/{id}")), None);
    }

    #[tokio::test]
    async fn bad_paths_are_refused() {
        let server = RelayServer::bind(0).await.unwrap();
        let addr = server.local_addr().unwrap();
        let _inbox = server.start();

        assert!(connect_async(format!("ws://{addr}/elsewhere")).await.is_err());
        assert!(connect_async(format!("ws://{addr}/relay/not-an-id")).await.is_err());
    }

    #[tokio::test]
    async fn newest_preview_wins() {
        let server = RelayServer::bind(0).await.unwrap();
        let addr = server.local_addr().unwrap();
        let mut inbox = server.start();
        let mut relay = HostRelay::new();

        let (a, b) = (ContextId::new(), ContextId::new());
        let (older, newer) = if a < b { (a, b) } else { (b, a) };

        let (mut old_ws, _) = connect_async(format!("ws://{addr}/relay/{older}")).await.unwrap();
        old_ws.send(log("first")).await.unwrap();
        let envelope = next_envelope(&mut inbox).await;
        assert_eq!(envelope.sender, older);
        assert!(matches!(route(&mut relay, &envelope), Routed::Entry { new_cycle: true, .. }));
        assert_eq!(texts(&relay), vec!["first"]);

        let (mut new_ws, _) = connect_async(format!("ws://{addr}/relay/{newer}")).await.unwrap();
        new_ws.send(log("second")).await.unwrap();
        let envelope = next_envelope(&mut inbox).await;
        assert!(matches!(route(&mut relay, &envelope), Routed::Entry { new_cycle: true, .. }));
        assert_eq!(texts(&relay), vec!["second"]);

        old_ws.send(log("stale")).await.unwrap();
        let envelope = next_envelope(&mut inbox).await;
        assert_eq!(envelope.sender, older);
        assert_eq!(route(&mut relay, &envelope), Routed::Dropped);

        new_ws.send(Message::Text("not json".to_string())).await.unwrap();
        let envelope = next_envelope(&mut inbox).await;
        assert_eq!(route(&mut relay, &envelope), Routed::Dropped);

        new_ws.send(log("third")).await.unwrap();
        let envelope = next_envelope(&mut inbox).await;
        assert!(matches!(route(&mut relay, &envelope), Routed::Entry { new_cycle: false, .. }));
        assert_eq!(texts(&relay), vec!["second", "third"]);
    }
}
