//! Shared utilities for integration tests.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use interceptor_proxy::config::ProxyConfig;
use interceptor_proxy::forward::{ForwardError, Forwarder};
use interceptor_proxy::http::{ParsedRequest, RawMessage};
use interceptor_proxy::intercept::Interceptor;
use interceptor_proxy::{ProxyServer, ServerHandle};

pub const CANNED_RESPONSE: &[u8] = b"HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n";

/// Config bound to an ephemeral loopback port.
pub fn test_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.timeouts.read_secs = 2;
    config.interception.log_requests = false;
    config
}

/// Records every forwarded request and answers with [`CANNED_RESPONSE`].
pub struct RecordingForwarder {
    tx: mpsc::UnboundedSender<(ParsedRequest, Vec<u8>)>,
}

impl RecordingForwarder {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(ParsedRequest, Vec<u8>)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Forwarder for RecordingForwarder {
    async fn forward(
        &self,
        request: &ParsedRequest,
        raw: &RawMessage,
        client: &mut TcpStream,
    ) -> Result<(), ForwardError> {
        let _ = self.tx.send((request.clone(), raw.as_bytes().to_vec()));
        client.write_all(CANNED_RESPONSE).await?;
        Ok(())
    }
}

/// Initialize and serve a proxy with the given strategies.
#[allow(dead_code)]
pub async fn start_proxy(
    config: ProxyConfig,
    interceptor: Option<Arc<dyn Interceptor>>,
    forwarder: Arc<dyn Forwarder>,
) -> ServerHandle {
    let mut server = ProxyServer::new(config);
    if let Some(interceptor) = interceptor {
        server.set_interceptor(interceptor);
    }
    server.set_forwarder(forwarder);
    server.init();
    server.serve().await.unwrap()
}

/// Send `request` and collect everything until the proxy closes the socket.
///
/// A reset counts as a close; the returned bytes are whatever arrived first.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    read_until_closed(&mut stream).await
}

pub async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut response = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response)).await;
    assert!(read.is_ok(), "proxy did not close the connection");
    response
}

/// Start an origin that records one request and replies with a fixed body.
#[allow(dead_code)]
pub async fn start_mock_backend(body: &'static str) -> (SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut received = Vec::new();
                let mut buf = [0u8; 4096];
                // The proxy keeps its side open, so stop at the first quiet period.
                while let Ok(Ok(n)) =
                    tokio::time::timeout(Duration::from_millis(200), socket.read(&mut buf)).await
                {
                    if n == 0 {
                        break;
                    }
                    received.extend_from_slice(&buf[..n]);
                }
                let _ = tx.send(received);

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}
