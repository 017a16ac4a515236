//! Heuristic device classification from open-port signatures

use crate::intelligence::{Classification, DeviceCategory, RiskLevel};
use crate::network::protocol::{ServiceDatabase, FLASK_PORT};
use crate::network::{PortFinding, ProbeOutcome};

/// Strategy that turns a host's liveness outcome and open ports into a
/// category, an inferred role and a risk level.
///
/// Implementations must be pure: the same inputs always give the same answer.
pub trait DeviceClassifier: Send + Sync {
    fn classify(&self, outcome: &ProbeOutcome, findings: &[PortFinding]) -> Classification;
}

/// Ordered rule cascade over the developer-tooling table.
///
/// Later rules override category and role; risk only ever escalates.
#[derive(Debug, Clone, Default)]
pub struct PortHeuristicClassifier {
    services: ServiceDatabase,
}

impl PortHeuristicClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceClassifier for PortHeuristicClassifier {
    fn classify(&self, outcome: &ProbeOutcome, findings: &[PortFinding]) -> Classification {
        let mut result = Classification::unclassified();

        if findings.is_empty() {
            if outcome.alive {
                result.category = DeviceCategory::GenericDevice;
            }
            return result;
        }

        let has_port = |port: u16| findings.iter().any(|f| f.port == port);

        // Flask. 5000 is also a developer-table port, so the table rule below
        // always settles the category; this rule only fixes role and risk.
        if has_port(FLASK_PORT) {
            result.role = self
                .services
                .dev_entry(FLASK_PORT)
                .map(|entry| entry.role.to_string());
            result.risk = result.risk.escalate(RiskLevel::Medium);
        }

        // Table order decides the role, not port order on the host
        if let Some(entry) = self
            .services
            .dev_table()
            .iter()
            .find(|entry| has_port(entry.port))
        {
            result.category = DeviceCategory::ActiveDevelopment;
            result.role = Some(entry.role.to_string());
            result.risk = result.risk.escalate(RiskLevel::Medium);
        }

        log::debug!(
            "{} classified as {} ({})",
            outcome.address,
            result.category,
            result.role.as_deref().unwrap_or("no role")
        );

        result
    }
}
