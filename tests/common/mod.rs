#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use nova_gateway::{serve, AppState, OllamaClient, OllamaConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// What a stub backend observed on one connection
#[derive(Debug)]
pub struct StubExchange {
    pub head: String,
    pub body: Vec<u8>,
    /// The client closed its side after the reply was written
    pub client_closed: bool,
}

/// How a stub backend answers a request
#[derive(Clone, Copy)]
pub enum StubReply {
    /// Writes a complete raw HTTP response, then closes its write half
    Raw(&'static str),
    /// Answers with `{"response": <prompt>}`, framed with Content-Length
    Echo,
    /// Reads the request and never answers
    Hang,
}

pub fn ollama_config(port: u16) -> OllamaConfig {
    OllamaConfig {
        host: "127.0.0.1".to_string(),
        port,
        model: "llama3.2:3b".to_string(),
        timeout: Duration::from_secs(5),
    }
}

/// Returns a port nothing is listening on
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Starts a raw TCP stand-in for Ollama; every connection is reported on the channel
pub async fn spawn_stub_backend(reply: StubReply) -> (u16, mpsc::UnboundedReceiver<StubExchange>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(exchange) = handle_stub_connection(stream, reply).await {
                    let _ = tx.send(exchange);
                }
            });
        }
    });

    (port, rx)
}

async fn handle_stub_connection(mut stream: TcpStream, reply: StubReply) -> Option<StubExchange> {
    let (head, body) = read_http_message(&mut stream).await?;

    let response = match reply {
        StubReply::Raw(raw) => raw.to_string(),
        StubReply::Echo => {
            let request: serde_json::Value = serde_json::from_slice(&body).ok()?;
            let prompt = request["prompt"].as_str().unwrap_or_default().to_string();
            let payload = serde_json::json!({
                "model": request["model"],
                "response": prompt,
                "done": true,
            })
            .to_string();
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                payload.len(),
                payload
            )
        }
        StubReply::Hang => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            return None;
        }
    };

    stream.write_all(response.as_bytes()).await.ok()?;
    let _ = stream.shutdown().await;

    let mut rest = Vec::new();
    let client_closed = matches!(
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut rest)).await,
        Ok(Ok(_))
    );

    Some(StubExchange {
        head,
        body,
        client_closed,
    })
}

/// Reads a header block and a Content-Length framed body
pub async fn read_http_message(stream: &mut TcpStream) -> Option<(String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some((head, body))
}

/// Starts the gateway on an ephemeral port, pointed at the given backend port
pub async fn spawn_gateway(ollama: OllamaConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(OllamaClient::new(ollama), 64 * 1024);

    tokio::spawn(async move {
        serve(listener, state, std::future::pending()).await.unwrap();
    });

    addr
}

#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Writes `request` verbatim and reads until the gateway closes the connection
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut buf = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut buf))
        .await
        .expect("gateway did not close the connection")
        .unwrap();

    parse_response(&buf)
}

pub fn chat_request(body: &str) -> Vec<u8> {
    format!(
        "POST /api/chat HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}

fn parse_response(buf: &[u8]) -> RawResponse {
    let text = String::from_utf8_lossy(buf);
    let (head, body) = text.split_once("\r\n\r\n").unwrap();
    let mut lines = head.lines();
    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .unwrap();
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    RawResponse {
        status,
        headers,
        body: body.to_string(),
    }
}
