//! Error handling for the hypescan engine
//!
//! Only failures that invalidate a whole operation live here. A host that
//! does not answer, refuses a connection or times out is an ordinary scan
//! result and is recorded as [`crate::ProbeErrorKind`] data instead.

use crate::discovery::ScanSession;
use crate::network::ProbeOutcome;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Main error type for scanning operations
#[derive(Debug, Error)]
pub enum ScanError {
    /// Malformed CIDR, or a range without usable host addresses
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The local socket layer cannot serve any more probes
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// A scan-level fault stopped the run. Everything recorded before the
    /// fault (and every probe that was already in flight) is kept in `partial`.
    #[error("Scan aborted: {reason}")]
    Aborted {
        reason: String,
        partial: Box<ScanSession>,
    },

    /// A single-port sweep hit a transport fault. `partial` holds the
    /// servers found before the sweep stopped, ascending.
    #[error("Port sweep aborted: {reason}")]
    SweepAborted {
        reason: String,
        partial: Vec<Ipv4Addr>,
    },

    /// The service-table scan of a deep scan hit a transport fault after
    /// the liveness check had already answered
    #[error("Deep scan of {} aborted: {}", .outcome.address, .reason)]
    DeepScanAborted {
        reason: String,
        outcome: Box<ProbeOutcome>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Output error: {0}")]
    OutputError(String),
}

impl ScanError {
    /// Whether this error is the scan-level fault class
    pub fn is_transport_fault(&self) -> bool {
        matches!(
            self,
            ScanError::TransportUnavailable(_)
                | ScanError::Aborted { .. }
                | ScanError::SweepAborted { .. }
                | ScanError::DeepScanAborted { .. }
        )
    }

    /// Partial results carried by an aborted scan
    pub fn partial_session(&self) -> Option<&ScanSession> {
        match self {
            ScanError::Aborted { partial, .. } => Some(&**partial),
            _ => None,
        }
    }

    /// Take ownership of the partial results carried by an aborted scan
    pub fn into_partial_session(self) -> Option<ScanSession> {
        match self {
            ScanError::Aborted { partial, .. } => Some(*partial),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_fault_classification() {
        assert!(ScanError::TransportUnavailable("EMFILE".to_string()).is_transport_fault());
        assert!(!ScanError::InvalidRange("10.0.0.0/31".to_string()).is_transport_fault());
        assert!(!ScanError::ConfigError("zero".to_string()).is_transport_fault());
    }

    #[test]
    fn test_sweep_fault_keeps_found_servers() {
        let err = ScanError::SweepAborted {
            reason: "Too many open files".to_string(),
            partial: vec![Ipv4Addr::new(10, 0, 0, 2)],
        };
        assert!(err.is_transport_fault());
        assert_eq!(err.to_string(), "Port sweep aborted: Too many open files");

        let outcome = ProbeOutcome::connected(Ipv4Addr::new(10, 0, 0, 9), 22);
        let err = ScanError::DeepScanAborted {
            reason: "Too many open files".to_string(),
            outcome: Box::new(outcome),
        };
        assert!(err.is_transport_fault());
        assert_eq!(
            err.to_string(),
            "Deep scan of 10.0.0.9 aborted: Too many open files"
        );
    }

    #[test]
    fn test_error_messages() {
        let err = ScanError::InvalidRange("not-a-cidr".to_string());
        assert_eq!(err.to_string(), "Invalid range: not-a-cidr");
        assert!(err.partial_session().is_none());
    }
}
