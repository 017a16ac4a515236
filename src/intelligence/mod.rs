//! Device intelligence - host profiles and heuristic classification
//!
//! A profile is derived once per host per scan pass from the liveness outcome
//! and the open-port findings. Classification is a weak signal by nature:
//! it only knows which ports accepted a TCP connection.

pub mod classifier;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

use crate::network::protocol::WEB_PORTS;
use crate::network::{PortFinding, ProbeMethod, ProbeOutcome};

pub use classifier::{DeviceClassifier, PortHeuristicClassifier};

/// Coarse device category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceCategory {
    Unknown,
    GenericDevice,
    /// Development server without a developer-table match. Never assigned by
    /// [`PortHeuristicClassifier`]; available to custom classifiers.
    DevelopmentMachine,
    ActiveDevelopment,
}

impl DeviceCategory {
    pub fn label(&self) -> &'static str {
        match self {
            DeviceCategory::Unknown => "Unknown",
            DeviceCategory::GenericDevice => "Generic Device",
            DeviceCategory::DevelopmentMachine => "Development Machine",
            DeviceCategory::ActiveDevelopment => "Active Development",
        }
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Risk level. Ordered, so escalation is `max`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Raise to `floor` if currently below it; never lowers
    pub fn escalate(self, floor: RiskLevel) -> RiskLevel {
        self.max(floor)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Output of a classifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification {
    pub category: DeviceCategory,
    pub role: Option<String>,
    pub risk: RiskLevel,
}

impl Classification {
    /// What a host gets when no classifier is configured
    pub fn unclassified() -> Self {
        Self {
            category: DeviceCategory::Unknown,
            role: None,
            risk: RiskLevel::Low,
        }
    }
}

impl Default for Classification {
    fn default() -> Self {
        Self::unclassified()
    }
}

/// Everything learned about one live host in one scan pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostProfile {
    pub address: Ipv4Addr,
    /// Open ports, in service-table order
    pub open_ports: Vec<PortFinding>,
    pub category: DeviceCategory,
    pub role: Option<String>,
    pub risk: RiskLevel,
    /// How the host answered the liveness check
    pub liveness: ProbeMethod,
    pub observed_at: DateTime<Utc>,
}

impl HostProfile {
    /// Assemble a profile. Pure: the timestamp is an input.
    pub fn build(
        outcome: &ProbeOutcome,
        findings: Vec<PortFinding>,
        classification: Classification,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            address: outcome.address,
            open_ports: findings,
            category: classification.category,
            role: classification.role,
            risk: classification.risk,
            liveness: outcome.method,
            observed_at,
        }
    }

    pub fn port_numbers(&self) -> Vec<u16> {
        self.open_ports.iter().map(|f| f.port).collect()
    }

    pub fn has_port(&self, port: u16) -> bool {
        self.open_ports.iter().any(|f| f.port == port)
    }

    pub fn serves_web(&self) -> bool {
        self.open_ports.iter().any(|f| WEB_PORTS.contains(&f.port))
    }

    pub fn is_developer_machine(&self) -> bool {
        self.role.is_some()
    }

    /// Short service labels, e.g. `Web:80` or `Flask Dev Server:5000`
    pub fn service_labels(&self) -> Vec<String> {
        self.open_ports
            .iter()
            .map(|f| format!("{}:{}", f.service, f.port))
            .collect()
    }
}
