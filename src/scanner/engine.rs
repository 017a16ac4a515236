//! Per-host port scanner

use crate::network::protocol::{ServicePort, SERVICE_TABLE};
use crate::network::{PortFinding, ProbeTransport};
use futures::stream::{self, StreamExt};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Probes a port/service table on one confirmed-live host.
///
/// Runs with its own concurrency cap, kept well below the host-discovery
/// ceiling so one host never sees every port at once.
#[derive(Clone)]
pub struct PortScanner {
    transport: Arc<dyn ProbeTransport>,
}

impl PortScanner {
    pub fn new(transport: Arc<dyn ProbeTransport>) -> Self {
        Self { transport }
    }

    /// Probe every entry of `table` and return the open ones in table order.
    ///
    /// Closed, filtered and timed-out ports are simply absent. `Err` only
    /// surfaces a scan-level transport fault.
    pub async fn scan_ports(
        &self,
        address: Ipv4Addr,
        table: &[ServicePort],
        concurrency: usize,
        timeout: Duration,
    ) -> crate::Result<Vec<PortFinding>> {
        let start_time = Instant::now();

        let mut probes = stream::iter(table.iter().copied().enumerate())
            .map(|(index, entry)| {
                let transport = Arc::clone(&self.transport);
                async move {
                    let result = transport.connect(address, entry.port, timeout).await;
                    (index, entry, result)
                }
            })
            .buffer_unordered(concurrency.max(1));

        let mut open = Vec::new();
        while let Some((index, entry, result)) = probes.next().await {
            if result?.alive {
                log::trace!("{}:{} open ({})", address, entry.port, entry.service);
                open.push((index, PortFinding::new(address, entry.port, entry.service)));
            }
        }

        // Completion order is arbitrary; report in table order
        open.sort_by_key(|(index, _)| *index);

        log::debug!(
            "{}: {}/{} ports open in {}ms",
            address,
            open.len(),
            table.len(),
            start_time.elapsed().as_millis()
        );

        Ok(open.into_iter().map(|(_, finding)| finding).collect())
    }

    /// Probe the built-in service table
    pub async fn scan_services(
        &self,
        address: Ipv4Addr,
        concurrency: usize,
        timeout: Duration,
    ) -> crate::Result<Vec<PortFinding>> {
        self.scan_ports(address, &SERVICE_TABLE, concurrency, timeout)
            .await
    }
}
