//! Connectivity probes used while an outage is being observed.
//!
//! A probe answers one question: "is the network path the application
//! depends on usable right now?". Probe errors of any kind read as `false`.

use async_trait::async_trait;
use http_body_util::Empty;
use hyper::body::Bytes;
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Human-readable target, for logs.
    fn describe(&self) -> String;

    async fn probe(&self) -> bool;
}

/// Reachability of a TCP endpoint (`host:port`).
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    fn describe(&self) -> String {
        format!("tcp://{}", self.address)
    }

    async fn probe(&self) -> bool {
        match timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!("TCP probe {} failed: {}", self.address, e);
                false
            }
            Err(_) => {
                debug!("TCP probe {} timed out after {:?}", self.address, self.timeout);
                false
            }
        }
    }
}

/// HTTP GET against a health endpoint, healthy on an expected status.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    endpoint: String,
    timeout: Duration,
    expected_status: Vec<u16>,
}

impl HttpProbe {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
            expected_status: vec![200],
        }
    }

    pub fn with_expected_status(mut self, status_codes: Vec<u16>) -> Self {
        self.expected_status = status_codes;
        self
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    fn describe(&self) -> String {
        self.endpoint.clone()
    }

    async fn probe(&self) -> bool {
        let uri: Uri = match self.endpoint.parse() {
            Ok(uri) => uri,
            Err(e) => {
                debug!("HTTP probe has invalid URI {}: {}", self.endpoint, e);
                return false;
            }
        };

        let client = Client::builder(TokioExecutor::new()).build_http();
        let request = match Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header("User-Agent", "shellbench/0.1")
            .body(Empty::<Bytes>::new())
        {
            Ok(request) => request,
            Err(e) => {
                debug!("HTTP probe failed to build request: {}", e);
                return false;
            }
        };

        match timeout(self.timeout, client.request(request)).await {
            Ok(Ok(response)) => {
                let status = response.status().as_u16();
                let healthy = self.expected_status.contains(&status);
                debug!("HTTP probe {} -> {} (healthy: {})", self.endpoint, status, healthy);
                healthy
            }
            Ok(Err(e)) => {
                debug!("HTTP probe {} connection failed: {}", self.endpoint, e);
                false
            }
            Err(_) => {
                debug!("HTTP probe {} timed out after {:?}", self.endpoint, self.timeout);
                false
            }
        }
    }
}

/// Probe backed by a plain predicate, for deterministic runs and tests.
pub struct FnProbe<F> {
    name: String,
    check: F,
}

impl<F> FnProbe<F>
where
    F: Fn() -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

#[async_trait]
impl<F> ConnectivityProbe for FnProbe<F>
where
    F: Fn() -> bool + Send + Sync,
{
    fn describe(&self) -> String {
        self.name.clone()
    }

    async fn probe(&self) -> bool {
        (self.check)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_probe_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let probe = TcpProbe::new(address.clone(), Duration::from_secs(1));
        assert!(probe.probe().await);

        drop(listener);
        let probe = TcpProbe::new(address, Duration::from_secs(1));
        assert!(!probe.probe().await);
    }

    #[tokio::test]
    async fn test_http_probe_checks_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/health", listener.local_addr().unwrap());

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .await;
            }
        });

        let probe = HttpProbe::new(endpoint.clone(), Duration::from_secs(2));
        assert!(!probe.probe().await);

        let probe = HttpProbe::new(endpoint, Duration::from_secs(2)).with_expected_status(vec![503]);
        assert!(probe.probe().await);

        let probe = HttpProbe::new("not a uri", Duration::from_secs(1));
        assert!(!probe.probe().await);
    }

    #[tokio::test]
    async fn test_fn_probe() {
        let probe = FnProbe::new("always-up", || true);
        assert!(probe.probe().await);
        assert_eq!(probe.describe(), "always-up");
    }
}
