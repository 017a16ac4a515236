//! Host Discovery Engine - scan scheduler and profiling pipeline
//!
//! Addresses are submitted in ascending order to a bounded pool of worker
//! tasks. Each worker runs the liveness check and, for live hosts, the
//! service-table scan and classification, then reports over a channel to the
//! single aggregation loop that owns the session under construction.

use crate::config::ScanConfig;
use crate::discovery::methods::LivenessDetector;
use crate::discovery::session::{ScanSession, SessionBuilder, SessionStatus};
use crate::discovery::{ScanEvent, ScanProgress};
use crate::intelligence::{
    Classification, DeviceClassifier, HostProfile, PortHeuristicClassifier,
};
use crate::network::range::AddressRange;
use crate::network::{NetworkTransport, PortFinding, ProbeOutcome, ProbeTransport};
use crate::output::summary::ResultAggregator;
use crate::scanner::PortScanner;
use crate::ScanError;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

/// Everything learned about a single host by [`HostDiscoveryEngine::deep_scan`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeepScanReport {
    pub outcome: ProbeOutcome,
    pub findings: Vec<PortFinding>,
    pub profile: HostProfile,
}

/// One worker's verdict for one address
struct HostReport {
    address: Ipv4Addr,
    result: crate::Result<(ProbeOutcome, Option<HostProfile>)>,
}

/// Per-host work, shared by every worker task of a scan
struct HostPipeline {
    config: ScanConfig,
    detector: LivenessDetector,
    ports: PortScanner,
    classifier: Option<Arc<dyn DeviceClassifier>>,
}

impl HostPipeline {
    async fn run(&self, address: Ipv4Addr) -> crate::Result<(ProbeOutcome, Option<HostProfile>)> {
        let outcome = self.detector.detect(address, self.config.timeout()).await?;
        if !outcome.alive {
            return Ok((outcome, None));
        }

        let findings = if self.config.port_scan {
            self.ports
                .scan_services(address, self.config.port_concurrency, self.config.port_timeout())
                .await?
        } else {
            Vec::new()
        };

        let profile = self.profile(&outcome, findings);
        Ok((outcome, Some(profile)))
    }

    fn profile(&self, outcome: &ProbeOutcome, findings: Vec<PortFinding>) -> HostProfile {
        let classification = match &self.classifier {
            Some(classifier) => classifier.classify(outcome, &findings),
            None => Classification::unclassified(),
        };
        HostProfile::build(outcome, findings, classification, Utc::now())
    }
}

/// Main host discovery engine
pub struct HostDiscoveryEngine {
    config: ScanConfig,
    transport: Arc<dyn ProbeTransport>,
    classifier: Option<Arc<dyn DeviceClassifier>>,
    events: Option<mpsc::UnboundedSender<ScanEvent>>,
}

impl HostDiscoveryEngine {
    /// Engine over the host network stack, with the port heuristic installed
    pub fn new(config: ScanConfig) -> crate::Result<Self> {
        let transport: Arc<dyn ProbeTransport> = Arc::new(NetworkTransport::new()?);
        Self::with_transport(config, transport)
    }

    /// Engine over a caller-supplied transport
    pub fn with_transport(
        config: ScanConfig,
        transport: Arc<dyn ProbeTransport>,
    ) -> crate::Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            transport,
            classifier: Some(Arc::new(PortHeuristicClassifier::new())),
            events: None,
        })
    }

    /// Replace the classification strategy. `None` leaves every host unclassified.
    pub fn with_classifier(mut self, classifier: Option<Arc<dyn DeviceClassifier>>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Stream progress and the final summary to `events`
    pub fn with_events(mut self, events: mpsc::UnboundedSender<ScanEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan every usable address in `range`
    pub async fn scan(&self, range: &AddressRange) -> crate::Result<ScanSession> {
        self.scan_with_cancel(range, CancellationToken::new()).await
    }

    /// Scan `range` until done or until `cancel` fires.
    ///
    /// Cancelling stops submission; probes already in flight are drained and
    /// recorded. A transport fault does the same internally and is returned
    /// as [`ScanError::Aborted`] carrying the partial session.
    pub async fn scan_with_cancel(
        &self,
        range: &AddressRange,
        cancel: CancellationToken,
    ) -> crate::Result<ScanSession> {
        let range = *range;
        let total = range.len();
        let concurrency = self.config.concurrency.max(1);

        log::info!(
            "Scanning {} ({} hosts, concurrency {}, port scan {})",
            range,
            total,
            concurrency,
            if self.config.port_scan { "on" } else { "off" }
        );

        let pipeline = Arc::new(self.pipeline());
        let stop = cancel.child_token();
        let (tx, mut rx) = mpsc::channel::<HostReport>(concurrency);

        let submitter = tokio::spawn(submit_hosts(
            range,
            pipeline,
            Arc::new(Semaphore::new(concurrency)),
            stop.clone(),
            tx,
        ));

        let mut builder = SessionBuilder::new(range, self.config.clone());
        let mut fault: Option<ScanError> = None;

        while let Some(report) = rx.recv().await {
            match report.result {
                Ok((outcome, profile)) => {
                    let completed = builder.record(outcome.clone(), profile);
                    self.emit(ScanEvent::Progress(ScanProgress {
                        completed,
                        total,
                        latest: outcome,
                    }));
                }
                Err(e) => {
                    log::warn!("Transport fault while probing {}: {}", report.address, e);
                    if fault.is_none() {
                        stop.cancel();
                        fault = Some(e);
                    }
                }
            }
        }

        let submitted_all = match submitter.await {
            Ok(submitted_all) => submitted_all,
            Err(e) => {
                log::warn!("Submission task failed: {}", e);
                false
            }
        };

        let status = if fault.is_some() {
            SessionStatus::Aborted
        } else if submitted_all {
            SessionStatus::Completed
        } else {
            SessionStatus::Cancelled
        };

        let session = builder.finish(status);
        let summary = ResultAggregator::finalize(&session);

        log::info!(
            "Scan of {} {}: {}/{} hosts alive ({:.1}%)",
            range,
            status,
            summary.total_alive,
            summary.total_probed,
            summary.success_rate
        );
        self.emit(ScanEvent::Finished(Box::new(summary)));

        match fault {
            Some(e) => Err(ScanError::Aborted {
                reason: e.to_string(),
                partial: Box::new(session),
            }),
            None => Ok(session),
        }
    }

    /// Addresses in `range` with `port` open, ascending.
    ///
    /// A transport fault stops submission; connects already in flight are
    /// drained and every server found so far is returned inside
    /// [`ScanError::SweepAborted`].
    pub async fn find_servers_on_port(
        &self,
        range: &AddressRange,
        port: u16,
    ) -> crate::Result<Vec<Ipv4Addr>> {
        let timeout = self.config.timeout();
        log::info!("Looking for tcp/{} across {}", port, range);

        let stop = CancellationToken::new();
        let stopped = stop.clone();

        let mut probes = stream::iter(range.hosts())
            .take_until(Box::pin(async move { stopped.cancelled().await }))
            .map(|address| {
                let transport = Arc::clone(&self.transport);
                async move { transport.connect(address, port, timeout).await }
            })
            .buffer_unordered(self.config.concurrency.max(1));

        let mut found = Vec::new();
        let mut fault: Option<ScanError> = None;

        while let Some(result) = probes.next().await {
            match result {
                Ok(outcome) if outcome.alive => found.push(outcome.address),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Transport fault during tcp/{} sweep: {}", port, e);
                    if fault.is_none() {
                        stop.cancel();
                        fault = Some(e);
                    }
                }
            }
        }

        found.sort();
        log::info!("{} host(s) with tcp/{} open", found.len(), port);

        match fault {
            Some(e) => Err(ScanError::SweepAborted {
                reason: e.to_string(),
                partial: found,
            }),
            None => Ok(found),
        }
    }

    /// Liveness, full service-table scan and classification of one host.
    ///
    /// A host that fails every liveness method is not port scanned; its
    /// report carries no findings.
    pub async fn deep_scan(&self, address: Ipv4Addr) -> crate::Result<DeepScanReport> {
        let pipeline = self.pipeline();

        let outcome = pipeline
            .detector
            .detect(address, self.config.timeout())
            .await?;

        if !outcome.alive {
            log::info!("{} is not responding, skipping port scan", address);
            let profile = pipeline.profile(&outcome, Vec::new());
            return Ok(DeepScanReport {
                outcome,
                findings: Vec::new(),
                profile,
            });
        }

        let findings = match pipeline
            .ports
            .scan_services(address, self.config.port_concurrency, self.config.port_timeout())
            .await
        {
            Ok(findings) => findings,
            Err(e) => {
                return Err(ScanError::DeepScanAborted {
                    reason: e.to_string(),
                    outcome: Box::new(outcome),
                })
            }
        };
        let profile = pipeline.profile(&outcome, findings.clone());

        Ok(DeepScanReport {
            outcome,
            findings,
            profile,
        })
    }

    fn pipeline(&self) -> HostPipeline {
        HostPipeline {
            config: self.config.clone(),
            detector: LivenessDetector::from_config(Arc::clone(&self.transport), &self.config),
            ports: PortScanner::new(Arc::clone(&self.transport)),
            classifier: self.classifier.clone(),
        }
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is watching
            let _ = events.send(event);
        }
    }
}

/// Submit every host of `range` in ascending order, at most `semaphore`
/// permits at a time. Returns `false` if `stop` fired before the last
/// address was submitted.
async fn submit_hosts(
    range: AddressRange,
    pipeline: Arc<HostPipeline>,
    semaphore: Arc<Semaphore>,
    stop: CancellationToken,
    tx: mpsc::Sender<HostReport>,
) -> bool {
    for address in range.hosts() {
        let permit = tokio::select! {
            biased;
            _ = stop.cancelled() => return false,
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return false,
            },
        };

        let pipeline = Arc::clone(&pipeline);
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = pipeline.run(address).await;
            let _ = tx.send(HostReport { address, result }).await;
            drop(permit);
        });
    }

    true
}
