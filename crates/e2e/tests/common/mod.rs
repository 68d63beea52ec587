//! Loopback HTTP server for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct Route {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// Content-Length sent instead of the body's real length
    pub declared_len: Option<usize>,
}

impl Route {
    pub fn html(body: &str) -> Self {
        Self { status: 200, content_type: "text/html", body: body.to_string(), declared_len: None }
    }

    pub fn json(body: serde_json::Value) -> Self {
        Self { status: 200, content_type: "application/json", body: body.to_string(), declared_len: None }
    }

    pub fn status(status: u16) -> Self {
        Self { status, content_type: "text/plain", body: String::new(), declared_len: None }
    }

    /// Announces more bytes than it sends, then closes the connection
    pub fn truncated(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/html",
            body: body.to_string(),
            declared_len: Some(body.len() + 1024),
        }
    }

    pub fn ok(content_type: &'static str) -> Self {
        Self { status: 200, content_type, body: String::new(), declared_len: None }
    }
}

/// Serves fixed responses by path; unknown paths get 404
pub struct TestServer {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&str, Route)>) -> Self {
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_string(), route))
                .collect(),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                let routes = routes.clone();
                tokio::spawn(async move {
                    let _ = respond(stream, &routes).await;
                });
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn respond(mut stream: TcpStream, routes: &HashMap<String, Route>) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }

    let request = String::from_utf8_lossy(&request);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let route = routes.get(&path).cloned().unwrap_or_else(|| Route::status(404));
    let response = format!(
        "HTTP/1.1 {} Test\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        route.status,
        route.content_type,
        route.declared_len.unwrap_or(route.body.len()),
        route.body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
