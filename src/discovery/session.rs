//! Scan session: the value that owns everything one scan pass produced

use crate::config::ScanConfig;
use crate::intelligence::HostProfile;
use crate::network::range::AddressRange;
use crate::network::ProbeOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use uuid::Uuid;

const MAX_PREALLOCATED: usize = 1 << 16;

/// How a scan pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Every address in the range has an outcome
    Completed,
    /// Submission stopped on request; in-flight probes were drained
    Cancelled,
    /// Submission stopped on a transport fault; in-flight probes were drained
    Aborted,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
            SessionStatus::Aborted => write!(f, "aborted"),
        }
    }
}

/// Finalized result of one scan pass.
///
/// Outcomes and live addresses are kept in completion order; sorting is left
/// to [`crate::ResultAggregator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSession {
    id: Uuid,
    range: AddressRange,
    config: ScanConfig,
    outcomes: Vec<ProbeOutcome>,
    live: Vec<Ipv4Addr>,
    profiles: BTreeMap<Ipv4Addr, HostProfile>,
    status: SessionStatus,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl ScanSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn range(&self) -> &AddressRange {
        &self.range
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Every recorded outcome, in completion order
    pub fn outcomes(&self) -> &[ProbeOutcome] {
        &self.outcomes
    }

    /// Live addresses, in completion order
    pub fn live_hosts(&self) -> &[Ipv4Addr] {
        &self.live
    }

    pub fn profiles(&self) -> &BTreeMap<Ipv4Addr, HostProfile> {
        &self.profiles
    }

    pub fn profile(&self, address: Ipv4Addr) -> Option<&HostProfile> {
        self.profiles.get(&address)
    }

    pub fn outcome(&self, address: Ipv4Addr) -> Option<&ProbeOutcome> {
        self.outcomes.iter().find(|o| o.address == address)
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn total_probed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn total_alive(&self) -> usize {
        self.live.len()
    }

    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

/// Single writer that accumulates completions into a [`ScanSession`].
///
/// Owned by the aggregation loop; workers never touch it directly.
#[derive(Debug)]
pub struct SessionBuilder {
    id: Uuid,
    range: AddressRange,
    config: ScanConfig,
    outcomes: Vec<ProbeOutcome>,
    live: Vec<Ipv4Addr>,
    profiles: BTreeMap<Ipv4Addr, HostProfile>,
    started_at: DateTime<Utc>,
}

impl SessionBuilder {
    pub fn new(range: AddressRange, config: ScanConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            range,
            config,
            outcomes: Vec::with_capacity(range.len().min(MAX_PREALLOCATED)),
            live: Vec::new(),
            profiles: BTreeMap::new(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Append one host's verdict. Returns the number of outcomes recorded so far.
    pub fn record(&mut self, outcome: ProbeOutcome, profile: Option<HostProfile>) -> usize {
        let address = outcome.address;

        if outcome.alive {
            self.live.push(address);
        }
        if let Some(profile) = profile {
            self.profiles.insert(address, profile);
        }
        self.outcomes.push(outcome);

        self.outcomes.len()
    }

    pub fn recorded(&self) -> usize {
        self.outcomes.len()
    }

    pub fn finish(self, status: SessionStatus) -> ScanSession {
        ScanSession {
            id: self.id,
            range: self.range,
            config: self.config,
            outcomes: self.outcomes,
            live: self.live,
            profiles: self.profiles,
            status,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}
