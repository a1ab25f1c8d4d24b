//! Probe executors.
//!
//! Every executor performs exactly one attempt and folds every failure mode
//! into a [`ProbeOutcome`]; nothing here returns an error once constructed.

use crate::types::{ProbeKind, ProbeOutcome, ProbeProtocol, ProbeTarget};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::error::Error as StdError;
use std::io;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Probe executor trait
#[async_trait]
pub trait Prober: Send + Sync {
    /// Perform one probe attempt against `target`
    async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome;

    /// Get the name of this prober
    fn name(&self) -> &str;
}

/// Parse `Name=Value` header entries.
pub fn parse_http_headers(entries: &[String]) -> common::Result<Vec<(String, String)>> {
    entries
        .iter()
        .map(|entry| {
            let (name, value) = entry
                .split_once('=')
                .ok_or_else(|| common::Error::config(format!("invalid http header '{}': expected Name=Value", entry)))?;
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() || value.is_empty() {
                return Err(common::Error::config(format!(
                    "invalid http header '{}': empty name or value",
                    entry
                )));
            }
            Ok((name.to_string(), value.to_string()))
        })
        .collect()
}

fn header_map(headers: &[(String, String)]) -> common::Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| common::Error::config(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| common::Error::config(format!("invalid header value for '{}': {}", name, e)))?;
        map.append(name, value);
    }
    Ok(map)
}

/// TCP prober: a successful connect is a healthy probe.
pub struct TcpProber {
    timeout_duration: Duration,
}

impl TcpProber {
    /// Create a new TCP prober
    pub fn new(timeout_duration: Duration) -> Self {
        Self { timeout_duration }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome {
        let start = Instant::now();

        match timeout(
            self.timeout_duration,
            TcpStream::connect((target.address.as_str(), target.port)),
        )
        .await
        {
            Ok(Ok(_stream)) => {
                let latency = start.elapsed();
                debug!(service_id = %target.service_id, target = %target.authority(), latency_ms = latency.as_millis(), "TCP probe successful");
                ProbeOutcome::success(latency, "TCP connection successful")
            }
            Ok(Err(e)) => {
                let latency = start.elapsed();
                warn!(service_id = %target.service_id, target = %target.authority(), error = %e, "TCP probe failed");
                ProbeOutcome::failure(classify_io(&e), latency, format!("Connection failed: {}", e))
            }
            Err(_) => {
                let latency = start.elapsed();
                warn!(service_id = %target.service_id, target = %target.authority(), "TCP probe timed out");
                ProbeOutcome::timeout(latency)
            }
        }
    }

    fn name(&self) -> &str {
        "tcp"
    }
}

/// HTTP prober: any 2xx response is a healthy probe.
pub struct HttpProber {
    timeout_duration: Duration,
    client: reqwest::Client,
}

impl HttpProber {
    /// Create a new HTTP prober attaching `headers` to every request
    pub fn new(timeout_duration: Duration, headers: &[(String, String)]) -> common::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout_duration)
            .default_headers(header_map(headers)?)
            .build()
            .map_err(|e| common::Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            timeout_duration,
            client,
        })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome {
        let start = Instant::now();
        let url = target.url();

        match timeout(self.timeout_duration, self.client.get(&url).send()).await {
            Ok(Ok(response)) => {
                let latency = start.elapsed();
                let status = response.status();
                let code = status.as_u16();

                if status.is_success() {
                    debug!(service_id = %target.service_id, url = %url, status = code, latency_ms = latency.as_millis(),
                           "HTTP probe successful");
                    ProbeOutcome::success(latency, format!("HTTP {}", code)).with_status_code(code)
                } else {
                    warn!(service_id = %target.service_id, url = %url, status = code, "HTTP probe failed: unexpected status code");
                    ProbeOutcome::failure(ProbeKind::ProtocolError, latency, format!("HTTP {}", code))
                        .with_status_code(code)
                }
            }
            Ok(Err(e)) => {
                let latency = start.elapsed();
                warn!(service_id = %target.service_id, url = %url, error = %e, "HTTP probe failed");
                ProbeOutcome::failure(classify_reqwest(&e), latency, format!("HTTP request failed: {}", e))
            }
            Err(_) => {
                let latency = start.elapsed();
                warn!(service_id = %target.service_id, url = %url, "HTTP probe timed out");
                ProbeOutcome::timeout(latency)
            }
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Dispatches to the HTTP or TCP prober according to the target's protocol.
pub struct NetworkProber {
    http: HttpProber,
    tcp: TcpProber,
}

impl NetworkProber {
    pub fn new(
        http_timeout: Duration,
        tcp_timeout: Duration,
        http_headers: &[(String, String)],
    ) -> common::Result<Self> {
        Ok(Self {
            http: HttpProber::new(http_timeout, http_headers)?,
            tcp: TcpProber::new(tcp_timeout),
        })
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome {
        match target.protocol {
            ProbeProtocol::Http => self.http.probe(target).await,
            ProbeProtocol::Tcp => self.tcp.probe(target).await,
        }
    }

    fn name(&self) -> &str {
        "network"
    }
}

fn classify_io(e: &io::Error) -> ProbeKind {
    match e.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::AddrNotAvailable => ProbeKind::ConnectionRefused,
        io::ErrorKind::TimedOut => ProbeKind::Timeout,
        _ => ProbeKind::Unknown,
    }
}

fn classify_reqwest(e: &reqwest::Error) -> ProbeKind {
    if e.is_timeout() {
        return ProbeKind::Timeout;
    }
    if e.is_connect() {
        // connect errors wrap the io error a few levels down
        let mut source = e.source();
        while let Some(err) = source {
            if let Some(io_err) = err.downcast_ref::<io::Error>() {
                return match classify_io(io_err) {
                    ProbeKind::Timeout => ProbeKind::Timeout,
                    _ => ProbeKind::ConnectionRefused,
                };
            }
            source = err.source();
        }
        return ProbeKind::ConnectionRefused;
    }
    if e.is_request() || e.is_body() || e.is_decode() || e.is_redirect() || e.is_status() {
        return ProbeKind::ProtocolError;
    }
    ProbeKind::Unknown
}
