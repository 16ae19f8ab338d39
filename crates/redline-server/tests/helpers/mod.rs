//! Shared helpers for redline-server integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::net::SocketAddr;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tower::ServiceExt;

use redline_server::{app_state::AppState, config::ServerConfig};

pub fn state() -> AppState {
    AppState::new(ServerConfig::default()).unwrap()
}

pub fn state_with(f: impl FnOnce(&mut ServerConfig)) -> AppState {
    let mut cfg = ServerConfig::default();
    f(&mut cfg);
    cfg.validate().unwrap();
    AppState::new(cfg).unwrap()
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Body) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    send(app, Method::GET, uri, Body::empty()).await
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, bytes) = get(app, uri).await;
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

/// Raw HTTP/1.1 GET over a fresh connection; returns (status, body).
pub async fn raw_get(addr: SocketAddr, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let req = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();
    read_response(stream).await
}

/// True when a new connection cannot get any response out of `addr`.
pub async fn connection_refused(addr: SocketAddr, path: &str) -> bool {
    let Ok(mut stream) = TcpStream::connect(addr).await else {
        return true;
    };
    let req = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    if stream.write_all(req.as_bytes()).await.is_err() {
        return true;
    }
    let mut buf = Vec::new();
    match stream.read_to_end(&mut buf).await {
        Ok(_) => buf.is_empty(),
        Err(_) => true,
    }
}

/// A connection whose request line was sent early; the rest follows later.
pub struct PendingRequest {
    stream: TcpStream,
}

impl PendingRequest {
    pub async fn start(addr: SocketAddr, path: &str) -> Self {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let line = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\n");
        stream.write_all(line.as_bytes()).await.unwrap();
        Self { stream }
    }

    pub async fn finish(mut self) -> (u16, String) {
        self.stream.write_all(b"\r\n").await.unwrap();
        read_response(self.stream).await
    }
}

async fn read_response(mut stream: TcpStream) -> (u16, String) {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    let text = String::from_utf8_lossy(&buf).to_string();

    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .expect("status line");
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();
    (status, body)
}
