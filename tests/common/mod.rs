//! Mock inference workers for integration tests.

#![allow(dead_code)]

use inference_pool::config::{PoolConfig, RawWorkerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Start a worker that answers every request with `(status, body)` from `f`,
/// which receives the request path and body.
pub async fn start_worker<F>(f: F) -> SocketAddr
where
    F: Fn(&str, &str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let _ = serve(socket, &*f).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// A worker that returns a fixed analysis for tasks and 200 for probes.
pub async fn start_healthy_worker(name: &'static str) -> SocketAddr {
    start_worker(move |path, _| match path {
        "/v1/tasks" => (200, format!(r#"{{"analysis":"from {}","confidence":0.9}}"#, name)),
        _ => (200, r#"{"status":"ok"}"#.to_string()),
    })
    .await
}

/// An address with nothing listening on it.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn worker_entry(id: &str, addr: SocketAddr, priority: u32) -> RawWorkerConfig {
    RawWorkerConfig {
        id: Some(id.to_string()),
        host: Some(addr.ip().to_string()),
        port: Some(addr.port()),
        enabled: Some(true),
        priority: Some(priority),
        ..Default::default()
    }
}

pub fn config_with(workers: Vec<RawWorkerConfig>) -> PoolConfig {
    let mut config = PoolConfig {
        workers,
        ..Default::default()
    };
    config.timeouts.invoke_secs = 5;
    config.health_check.timeout_secs = 2;
    config
}

async fn serve<F>(mut socket: TcpStream, f: &F) -> std::io::Result<()>
where
    F: Fn(&str, &str) -> (u16, String),
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    let (status, response) = f(&path, &body);
    let status_text = match status {
        200 => "200 OK",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };

    let raw = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        response.len(),
        response
    );
    socket.write_all(raw.as_bytes()).await?;
    socket.shutdown().await
}
