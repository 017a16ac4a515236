//! HypeScan - local subnet host discovery and device profiling
//!
//! Finds live hosts on an IPv4 subnet with a multi-strategy TCP-connect
//! liveness test, probes well-known service ports on the hosts that answer,
//! and classifies each device from its open-port signature.

pub mod config;
pub mod discovery;
pub mod error;
pub mod intelligence;
pub mod network;
pub mod output;
pub mod scanner;

// Re-export commonly used types
pub use config::ScanConfig;
pub use discovery::{
    DeepScanReport, HostDiscoveryEngine, LivenessDetector, ScanEvent, ScanProgress, ScanSession,
    SessionStatus,
};
pub use error::ScanError;
pub use intelligence::{
    Classification, DeviceCategory, DeviceClassifier, HostProfile, PortHeuristicClassifier,
    RiskLevel,
};
pub use network::range::AddressRange;
pub use network::{
    NetworkTransport, PortFinding, ProbeErrorKind, ProbeMethod, ProbeOutcome, ProbeTransport,
};
pub use output::summary::{ResultAggregator, SummaryReport};
pub use scanner::PortScanner;

pub type Result<T> = std::result::Result<T, ScanError>;
