//! Scripted in-memory transport shared by the integration tests

#![allow(dead_code)]

use hypescan::{ProbeErrorKind, ProbeOutcome, ProbeTransport, ScanError};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Answers connects and HEAD requests from a fixed script instead of the network
#[derive(Default)]
pub struct ScriptedTransport {
    open: HashMap<Ipv4Addr, HashSet<u16>>,
    http: HashMap<Ipv4Addr, u16>,
    faults: HashSet<Ipv4Addr>,
    port_faults: HashSet<u16>,
    host_delays: HashMap<Ipv4Addr, Duration>,
    port_delays: HashMap<u16, Duration>,
    default_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    attempts: Mutex<Vec<(Ipv4Addr, u16)>>,
    http_attempts: Mutex<Vec<(Ipv4Addr, u16)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// `ports` complete the handshake on `address`
    pub fn with_open(mut self, address: Ipv4Addr, ports: &[u16]) -> Self {
        self.open.entry(address).or_default().extend(ports);
        self
    }

    /// `address` answers HTTP HEAD on `port`
    pub fn with_http(mut self, address: Ipv4Addr, port: u16) -> Self {
        self.http.insert(address, port);
        self
    }

    /// Every connect to `address` fails at the socket layer
    pub fn with_fault(mut self, address: Ipv4Addr) -> Self {
        self.faults.insert(address);
        self
    }

    /// Every connect to `port`, on any host, fails at the socket layer
    pub fn with_port_fault(mut self, port: u16) -> Self {
        self.port_faults.insert(port);
        self
    }

    pub fn with_host_delay(mut self, address: Ipv4Addr, delay: Duration) -> Self {
        self.host_delays.insert(address, delay);
        self
    }

    pub fn with_port_delay(mut self, port: u16, delay: Duration) -> Self {
        self.port_delays.insert(port, delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn attempts(&self) -> Vec<(Ipv4Addr, u16)> {
        self.attempts.lock().unwrap().clone()
    }

    /// Distinct addresses that saw at least one connect
    pub fn attempted_hosts(&self) -> HashSet<Ipv4Addr> {
        self.attempts().into_iter().map(|(address, _)| address).collect()
    }

    pub fn http_attempts(&self) -> Vec<(Ipv4Addr, u16)> {
        self.http_attempts.lock().unwrap().clone()
    }

    fn delay_for(&self, address: Ipv4Addr, port: u16) -> Duration {
        self.port_delays
            .get(&port)
            .or_else(|| self.host_delays.get(&address))
            .copied()
            .unwrap_or(self.default_delay)
    }
}

#[async_trait::async_trait]
impl ProbeTransport for ScriptedTransport {
    async fn connect(
        &self,
        address: Ipv4Addr,
        port: u16,
        timeout: Duration,
    ) -> hypescan::Result<ProbeOutcome> {
        self.attempts.lock().unwrap().push((address, port));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delay_for(address, port);
        if !delay.is_zero() {
            tokio::time::sleep(delay.min(timeout)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.faults.contains(&address) || self.port_faults.contains(&port) {
            return Err(ScanError::TransportUnavailable(format!(
                "connect to {}:{}: Too many open files",
                address, port
            )));
        }
        if delay > timeout {
            return Ok(ProbeOutcome::failed(address, port, ProbeErrorKind::Timeout));
        }

        let open = self
            .open
            .get(&address)
            .map(|ports| ports.contains(&port))
            .unwrap_or(false);

        if open {
            Ok(ProbeOutcome::connected(address, port))
        } else {
            Ok(ProbeOutcome::failed(address, port, ProbeErrorKind::Refused))
        }
    }

    async fn http_head(&self, address: Ipv4Addr, port: u16, _timeout: Duration) -> bool {
        self.http_attempts.lock().unwrap().push((address, port));
        self.http.get(&address) == Some(&port)
    }
}

pub fn host(last_octet: u8) -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 1, last_octet)
}
