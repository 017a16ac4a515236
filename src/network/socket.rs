//! TCP connect probing

use crate::network::{ProbeErrorKind, ProbeOutcome};
use crate::ScanError;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

/// TCP connect scanner.
///
/// A port counts as open the moment the handshake completes; no data is sent.
/// The stream is dropped immediately, and a connect future that outlives its
/// timeout is dropped together with its half-open socket.
#[derive(Debug, Clone, Default)]
pub struct TcpConnectScanner;

impl TcpConnectScanner {
    pub fn new() -> Self {
        Self
    }

    /// Probe one port. Transport faults are reported as [`ProbeErrorKind::Other`].
    pub async fn probe(&self, target: Ipv4Addr, port: u16, timeout: Duration) -> ProbeOutcome {
        match self.connect(target, port, timeout).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::trace!("{}:{} transport fault: {}", target, port, e);
                ProbeOutcome::failed(target, port, ProbeErrorKind::Other)
            }
        }
    }

    /// Probe one port, surfacing scan-level transport faults as `Err`
    pub async fn connect(
        &self,
        target: Ipv4Addr,
        port: u16,
        timeout: Duration,
    ) -> crate::Result<ProbeOutcome> {
        let addr = SocketAddr::new(IpAddr::V4(target), port);
        let start_time = Instant::now();

        let outcome = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                ProbeOutcome::connected(target, port)
            }
            Ok(Err(e)) => {
                if is_transport_fault(&e) {
                    return Err(ScanError::TransportUnavailable(format!(
                        "connect to {} failed: {}",
                        addr, e
                    )));
                }
                ProbeOutcome::failed(target, port, classify_io_error(&e))
            }
            Err(_) => ProbeOutcome::failed(target, port, ProbeErrorKind::Timeout),
        };

        let rtt = start_time.elapsed();
        log::trace!(
            "{}:{} -> {} in {}ms",
            target,
            port,
            if outcome.alive { "open" } else { "closed" },
            rtt.as_millis()
        );

        Ok(outcome.with_rtt(rtt))
    }
}

/// Map a connect error onto the per-probe error taxonomy
pub fn classify_io_error(error: &io::Error) -> ProbeErrorKind {
    if error.kind() == io::ErrorKind::ConnectionRefused {
        return ProbeErrorKind::Refused;
    }
    if error.kind() == io::ErrorKind::TimedOut {
        return ProbeErrorKind::Timeout;
    }

    match error.raw_os_error() {
        Some(code) if is_unreachable_errno(code) => ProbeErrorKind::Unreachable,
        Some(code) if is_timeout_errno(code) => ProbeErrorKind::Timeout,
        _ => ProbeErrorKind::Other,
    }
}

/// Errors that mean the local socket layer itself is failing, not the target
pub fn is_transport_fault(error: &io::Error) -> bool {
    match error.raw_os_error() {
        Some(code) => is_fault_errno(code),
        None => false,
    }
}

#[cfg(unix)]
fn is_unreachable_errno(code: i32) -> bool {
    code == libc::EHOSTUNREACH || code == libc::ENETUNREACH || code == libc::EHOSTDOWN
}

#[cfg(unix)]
fn is_timeout_errno(code: i32) -> bool {
    code == libc::ETIMEDOUT
}

#[cfg(unix)]
fn is_fault_errno(code: i32) -> bool {
    code == libc::EMFILE
        || code == libc::ENFILE
        || code == libc::ENOBUFS
        || code == libc::ENOMEM
        || code == libc::ENETDOWN
}

// WSAEHOSTUNREACH / WSAENETUNREACH / WSAEHOSTDOWN
#[cfg(not(unix))]
fn is_unreachable_errno(code: i32) -> bool {
    code == 10065 || code == 10051 || code == 10064
}

#[cfg(not(unix))]
fn is_timeout_errno(code: i32) -> bool {
    code == 10060
}

// WSAEMFILE / WSAENOBUFS / WSAENETDOWN
#[cfg(not(unix))]
fn is_fault_errno(code: i32) -> bool {
    code == 10024 || code == 10055 || code == 10050
}
