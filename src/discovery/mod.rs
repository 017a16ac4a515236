//! Host discovery - liveness detection, the scan scheduler and session state

pub mod engine;
pub mod methods;
pub mod session;

use serde::Serialize;

use crate::network::ProbeOutcome;
use crate::output::summary::SummaryReport;

pub use engine::{DeepScanReport, HostDiscoveryEngine};
pub use methods::LivenessDetector;
pub use session::{ScanSession, SessionBuilder, SessionStatus};

/// Progress after one more host completed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanProgress {
    pub completed: usize,
    pub total: usize,
    pub latest: ProbeOutcome,
}

impl ScanProgress {
    /// Completion percentage; 0 for an empty scan
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

/// Events pushed to a presentation sink while a scan runs
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Progress(ScanProgress),
    Finished(Box<SummaryReport>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_percentage() {
        let latest = ProbeOutcome::unresponsive(Ipv4Addr::new(10, 0, 0, 1));
        let progress = ScanProgress {
            completed: 3,
            total: 6,
            latest: latest.clone(),
        };
        assert_eq!(progress.percentage(), 50.0);

        let empty = ScanProgress {
            completed: 0,
            total: 0,
            latest,
        };
        assert_eq!(empty.percentage(), 0.0);
    }
}
