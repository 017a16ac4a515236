//! Network module: probe primitives and the transport seam the engines drive

pub mod http;
pub mod interface;
pub mod protocol;
pub mod range;
pub mod socket;

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::network::http::HttpPinger;
use crate::network::socket::TcpConnectScanner;

/// How a host was found to be alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    Tcp,
    Http,
    None,
}

impl ProbeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMethod::Tcp => "tcp",
            ProbeMethod::Http => "http",
            ProbeMethod::None => "none",
        }
    }
}

impl std::fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a probe did not find the target alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    Timeout,
    Refused,
    Unreachable,
    Other,
    /// Terminal liveness verdict: every TCP candidate and the HTTP fallback failed
    AllMethodsFailed,
}

impl std::fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeErrorKind::Timeout => write!(f, "timeout"),
            ProbeErrorKind::Refused => write!(f, "refused"),
            ProbeErrorKind::Unreachable => write!(f, "unreachable"),
            ProbeErrorKind::Other => write!(f, "other"),
            ProbeErrorKind::AllMethodsFailed => write!(f, "all methods failed"),
        }
    }
}

/// Result of a single probe or of a whole liveness check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub address: Ipv4Addr,
    pub alive: bool,
    pub method: ProbeMethod,
    pub responding_port: Option<u16>,
    pub error_kind: Option<ProbeErrorKind>,
    /// Time until the probe settled
    pub rtt: Option<Duration>,
}

impl ProbeOutcome {
    /// A TCP handshake completed on `port`
    pub fn connected(address: Ipv4Addr, port: u16) -> Self {
        Self {
            address,
            alive: true,
            method: ProbeMethod::Tcp,
            responding_port: Some(port),
            error_kind: None,
            rtt: None,
        }
    }

    /// A TCP probe that did not connect
    pub fn failed(address: Ipv4Addr, port: u16, error_kind: ProbeErrorKind) -> Self {
        Self {
            address,
            alive: false,
            method: ProbeMethod::Tcp,
            responding_port: Some(port),
            error_kind: Some(error_kind),
            rtt: None,
        }
    }

    /// The HTTP fallback got a response from `port`
    pub fn http_alive(address: Ipv4Addr, port: u16) -> Self {
        Self {
            address,
            alive: true,
            method: ProbeMethod::Http,
            responding_port: Some(port),
            error_kind: None,
            rtt: None,
        }
    }

    /// Liveness verdict when every method failed
    pub fn unresponsive(address: Ipv4Addr) -> Self {
        Self {
            address,
            alive: false,
            method: ProbeMethod::None,
            responding_port: None,
            error_kind: Some(ProbeErrorKind::AllMethodsFailed),
            rtt: None,
        }
    }

    pub fn with_rtt(mut self, rtt: Duration) -> Self {
        self.rtt = Some(rtt);
        self
    }
}

/// A port confirmed open on a host. Closed and filtered ports produce no finding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortFinding {
    pub address: Ipv4Addr,
    pub port: u16,
    pub service: String,
}

impl PortFinding {
    pub fn new(address: Ipv4Addr, port: u16, service: impl Into<String>) -> Self {
        Self {
            address,
            port,
            service: service.into(),
        }
    }
}

/// The socket-level operations every engine is built on.
///
/// `connect` only returns `Err` for scan-level faults (the local socket layer
/// itself failing); a closed or silent port is an `Ok` outcome with
/// `alive == false`.
#[async_trait::async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn connect(
        &self,
        address: Ipv4Addr,
        port: u16,
        timeout: Duration,
    ) -> crate::Result<ProbeOutcome>;

    /// Whether an HTTP HEAD request to `address:port` got any response
    async fn http_head(&self, address: Ipv4Addr, port: u16, timeout: Duration) -> bool;
}

/// Real transport: TCP connect probes and HTTP HEAD over the host network stack
#[derive(Clone)]
pub struct NetworkTransport {
    tcp: TcpConnectScanner,
    http: HttpPinger,
}

impl NetworkTransport {
    pub fn new() -> crate::Result<Self> {
        Ok(Self {
            tcp: TcpConnectScanner::new(),
            http: HttpPinger::new()?,
        })
    }
}

#[async_trait::async_trait]
impl ProbeTransport for NetworkTransport {
    async fn connect(
        &self,
        address: Ipv4Addr,
        port: u16,
        timeout: Duration,
    ) -> crate::Result<ProbeOutcome> {
        self.tcp.connect(address, port, timeout).await
    }

    async fn http_head(&self, address: Ipv4Addr, port: u16, timeout: Duration) -> bool {
        self.http.head(address, port, timeout).await
    }
}
