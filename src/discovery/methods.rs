//! Liveness detection ("smart ping")
//!
//! A host is alive if any candidate port completes a TCP handshake. The
//! candidates are raced rather than tried in turn, so a dead host costs one
//! timeout instead of one timeout per port. When every candidate fails, an
//! HTTP HEAD request gets the last word.

use crate::config::ScanConfig;
use crate::network::{ProbeOutcome, ProbeTransport};
use crate::ScanError;
use futures::stream::{FuturesUnordered, StreamExt};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

/// Races TCP connect probes across the candidate ports, then falls back to HTTP
#[derive(Clone)]
pub struct LivenessDetector {
    transport: Arc<dyn ProbeTransport>,
    candidates: Vec<u16>,
    http_port: u16,
    http_timeout: Duration,
}

impl LivenessDetector {
    pub fn new(transport: Arc<dyn ProbeTransport>) -> Self {
        Self::from_config(transport, &ScanConfig::default())
    }

    pub fn from_config(transport: Arc<dyn ProbeTransport>, config: &ScanConfig) -> Self {
        Self {
            transport,
            candidates: config.liveness_ports.clone(),
            http_port: config.http_port,
            http_timeout: config.http_timeout(),
        }
    }

    pub fn with_candidates(mut self, ports: Vec<u16>) -> Self {
        self.candidates = ports;
        self
    }

    pub fn with_http_fallback(mut self, port: u16, timeout: Duration) -> Self {
        self.http_port = port;
        self.http_timeout = timeout;
        self
    }

    pub fn candidates(&self) -> &[u16] {
        &self.candidates
    }

    /// Decide whether `address` is alive.
    ///
    /// The first candidate that connects wins and is returned with
    /// `method == Tcp`. The remaining probes keep running as detached tasks,
    /// each bounded by `timeout`, and their results are dropped. `Err` is
    /// returned only when a probe hit a scan-level transport fault.
    pub async fn detect(&self, address: Ipv4Addr, timeout: Duration) -> crate::Result<ProbeOutcome> {
        let mut probes: FuturesUnordered<_> = self
            .candidates
            .iter()
            .map(|&port| {
                let transport = Arc::clone(&self.transport);
                tokio::spawn(async move { transport.connect(address, port, timeout).await })
            })
            .collect();

        let mut fault: Option<ScanError> = None;

        while let Some(joined) = probes.next().await {
            match joined {
                Ok(Ok(outcome)) if outcome.alive => {
                    log::debug!(
                        "{} alive via tcp/{}",
                        address,
                        outcome.responding_port.unwrap_or_default()
                    );
                    // Dropping the JoinHandles detaches the stragglers
                    return Ok(outcome);
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    if fault.is_none() {
                        fault = Some(e);
                    }
                }
                Err(e) => log::warn!("Liveness probe task for {} failed: {}", address, e),
            }
        }

        if let Some(e) = fault {
            return Err(e);
        }

        if self
            .transport
            .http_head(address, self.http_port, self.http_timeout)
            .await
        {
            log::debug!("{} alive via http/{}", address, self.http_port);
            return Ok(ProbeOutcome::http_alive(address, self.http_port));
        }

        log::trace!("{} did not answer any liveness method", address);
        Ok(ProbeOutcome::unresponsive(address))
    }
}

impl std::fmt::Debug for LivenessDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivenessDetector")
            .field("candidates", &self.candidates)
            .field("http_port", &self.http_port)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}
