//! Result aggregation: a finished session in, a stable summary out

use crate::discovery::{ScanSession, SessionStatus};
use crate::intelligence::{DeviceCategory, HostProfile, RiskLevel};
use crate::network::ProbeMethod;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// One live host as reported in a summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSummary {
    pub address: Ipv4Addr,
    pub open_ports: Vec<u16>,
    pub services: Vec<String>,
    pub port_count: usize,
    pub category: DeviceCategory,
    pub role: Option<String>,
    pub risk: RiskLevel,
    pub liveness: ProbeMethod,
}

impl HostSummary {
    pub fn from_profile(profile: &HostProfile) -> Self {
        Self {
            address: profile.address,
            open_ports: profile.port_numbers(),
            services: profile.open_ports.iter().map(|f| f.service.clone()).collect(),
            port_count: profile.open_ports.len(),
            category: profile.category,
            role: profile.role.clone(),
            risk: profile.risk,
            liveness: profile.liveness,
        }
    }

    fn bare(address: Ipv4Addr, liveness: ProbeMethod) -> Self {
        Self {
            address,
            open_ports: Vec::new(),
            services: Vec::new(),
            port_count: 0,
            category: DeviceCategory::Unknown,
            role: None,
            risk: RiskLevel::Low,
            liveness,
        }
    }
}

/// Derived statistics over one scan session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub target: String,
    pub status: SessionStatus,
    pub total_probed: usize,
    pub total_alive: usize,
    pub total_inactive: usize,
    /// Percentage of probed hosts found alive, one decimal place
    pub success_rate: f64,
    /// Live hosts in ascending numeric address order
    pub hosts: Vec<HostSummary>,
    pub total_open_ports: usize,
    pub developer_machines: usize,
    pub web_servers: usize,
    /// Inferred developer role -> number of hosts
    pub roles: BTreeMap<String, usize>,
}

impl SummaryReport {
    pub fn host(&self, address: Ipv4Addr) -> Option<&HostSummary> {
        self.hosts.iter().find(|h| h.address == address)
    }

    pub fn live_addresses(&self) -> Vec<Ipv4Addr> {
        self.hosts.iter().map(|h| h.address).collect()
    }

    /// Hosts with an inferred developer role, ascending
    pub fn developers(&self) -> Vec<&HostSummary> {
        self.hosts.iter().filter(|h| h.role.is_some()).collect()
    }
}

/// Builds [`SummaryReport`]s. Holds no state, so finalizing the same session
/// twice gives identical reports.
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn finalize(session: &ScanSession) -> SummaryReport {
        let total_probed = session.total_probed();
        let total_alive = session.total_alive();

        let hosts: Vec<HostSummary> = Self::sort_addresses(session.live_hosts())
            .into_iter()
            .map(|address| match session.profile(address) {
                Some(profile) => HostSummary::from_profile(profile),
                None => {
                    let liveness = session
                        .outcome(address)
                        .map(|o| o.method)
                        .unwrap_or(ProbeMethod::None);
                    HostSummary::bare(address, liveness)
                }
            })
            .collect();

        let mut roles = BTreeMap::new();
        for role in hosts.iter().filter_map(|h| h.role.as_ref()) {
            *roles.entry(role.clone()).or_insert(0) += 1;
        }

        let profiles = session.profiles().values();

        SummaryReport {
            target: session.range().to_string(),
            status: session.status(),
            total_probed,
            total_alive,
            total_inactive: total_probed.saturating_sub(total_alive),
            success_rate: Self::success_rate(total_alive, total_probed),
            total_open_ports: hosts.iter().map(|h| h.port_count).sum(),
            developer_machines: hosts.iter().filter(|h| h.role.is_some()).count(),
            web_servers: profiles.filter(|p| p.serves_web()).count(),
            roles,
            hosts,
        }
    }

    /// Ascending numeric order, without duplicates
    pub fn sort_addresses(addresses: &[Ipv4Addr]) -> Vec<Ipv4Addr> {
        let mut sorted = addresses.to_vec();
        sorted.sort_by_key(|address| u32::from(*address));
        sorted.dedup();
        sorted
    }

    /// `alive / total` as a percentage rounded to one decimal; 0 when nothing was probed
    pub fn success_rate(alive: usize, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        (alive as f64 / total as f64 * 1000.0).round() / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate_rounding() {
        assert_eq!(ResultAggregator::success_rate(0, 0), 0.0);
        assert_eq!(ResultAggregator::success_rate(0, 6), 0.0);
        assert_eq!(ResultAggregator::success_rate(1, 3), 33.3);
        assert_eq!(ResultAggregator::success_rate(2, 3), 66.7);
        assert_eq!(ResultAggregator::success_rate(254, 254), 100.0);
    }

    #[test]
    fn test_developers_only_lists_hosts_with_a_role() {
        let mut dev = HostSummary::bare(Ipv4Addr::new(10, 0, 0, 12), ProbeMethod::Tcp);
        dev.role = Some("Python Developer".to_string());
        let printer = HostSummary::bare(Ipv4Addr::new(10, 0, 0, 3), ProbeMethod::Tcp);

        let report = SummaryReport {
            target: "10.0.0.0/28".to_string(),
            status: SessionStatus::Completed,
            total_probed: 14,
            total_alive: 2,
            total_inactive: 12,
            success_rate: 14.3,
            hosts: vec![printer, dev],
            total_open_ports: 0,
            developer_machines: 1,
            web_servers: 0,
            roles: BTreeMap::new(),
        };

        let developers = report.developers();
        assert_eq!(developers.len(), 1);
        assert_eq!(developers[0].address, Ipv4Addr::new(10, 0, 0, 12));
    }

    #[test]
    fn test_numeric_not_lexical_sort() {
        let sorted = ResultAggregator::sort_addresses(&[
            Ipv4Addr::new(10, 0, 0, 10),
            Ipv4Addr::new(10, 0, 0, 2),
            Ipv4Addr::new(10, 0, 0, 100),
            Ipv4Addr::new(9, 255, 255, 255),
        ]);
        assert_eq!(
            sorted,
            vec![
                Ipv4Addr::new(9, 255, 255, 255),
                Ipv4Addr::new(10, 0, 0, 2),
                Ipv4Addr::new(10, 0, 0, 10),
                Ipv4Addr::new(10, 0, 0, 100),
            ]
        );
    }
}
