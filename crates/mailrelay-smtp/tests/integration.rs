//! Integration tests for the SMTP listener.
//!
//! These tests bind a real listener on the loopback interface and talk to
//! it over TCP the way an SMTP client would.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use mailrelay_smtp::{InboundMessage, MailHandler, Server, ServerConfig};

#[derive(Clone, Default)]
struct Collect {
    messages: Arc<Mutex<Vec<InboundMessage>>>,
}

impl MailHandler for Collect {
    type Error = String;

    async fn handle(&self, message: InboundMessage) -> Result<(), String> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

/// Minimal line-oriented SMTP client.
struct Client {
    reader: BufReader<TcpStream>,
}

impl Client {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            reader: BufReader::new(stream),
        }
    }

    /// Reads one (possibly multi-line) reply and returns its last line.
    async fn read_reply(&mut self) -> String {
        loop {
            let mut line = String::new();
            self.reader.read_line(&mut line).await.unwrap();
            if line.len() < 4 || line.as_bytes()[3] != b'-' {
                return line.trim_end().to_string();
            }
        }
    }

    async fn send(&mut self, line: &str) -> String {
        self.reader
            .get_mut()
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
        self.read_reply().await
    }
}

async fn start(handler: Collect) -> (std::net::SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let server = Server::new(ServerConfig::new("relay.test"), handler);
    tokio::spawn(async move {
        server
            .serve_with_shutdown(listener, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });
    (addr, tx)
}

#[tokio::test]
async fn test_message_reaches_handler() {
    let handler = Collect::default();
    let (addr, _shutdown) = start(handler.clone()).await;

    let mut client = Client::connect(addr).await;
    assert!(client.read_reply().await.starts_with("220 relay.test"));
    assert!(client.send("EHLO client.local").await.starts_with("250 PIPELINING"));
    assert_eq!(client.send("MAIL FROM:<user@example.com>").await, "250 OK");
    assert_eq!(client.send("RCPT TO:<recipient@destination.com>").await, "250 OK");
    assert!(client.send("DATA").await.starts_with("354"));
    assert_eq!(
        client
            .send("From: user@example.com\r\nSubject: Test\r\n\r\nHello\r\n.")
            .await,
        "250 OK: queued"
    );
    assert!(client.send("QUIT").await.starts_with("221"));

    let messages = handler.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].from, "user@example.com");
    assert_eq!(messages[0].to, vec!["recipient@destination.com"]);
    assert_eq!(
        messages[0].data,
        b"From: user@example.com\r\nSubject: Test\r\n\r\nHello\r\n"
    );
}

#[tokio::test]
async fn test_concurrent_connections() {
    let handler = Collect::default();
    let (addr, _shutdown) = start(handler.clone()).await;

    let mut tasks = Vec::new();
    for i in 0..4 {
        tasks.push(tokio::spawn(async move {
            let mut client = Client::connect(addr).await;
            client.read_reply().await;
            client.send("HELO c").await;
            client.send(&format!("MAIL FROM:<sender{i}@example.com>")).await;
            client.send("RCPT TO:<r@example.com>").await;
            client.send("DATA").await;
            let reply = client.send(&format!("Subject: {i}\r\n\r\nbody\r\n.")).await;
            client.send("QUIT").await;
            reply
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), "250 OK: queued");
    }

    assert_eq!(handler.messages.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let (addr, shutdown) = start(Collect::default()).await;
    shutdown.send(()).unwrap();

    // Give the accept loop a moment to observe the signal and drop the socket.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(TcpStream::connect(addr).await.is_err());
}
