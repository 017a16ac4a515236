//! Liveness detection ("smart ping") tests

mod common;

use common::{host, ScriptedTransport};
use hypescan::{LivenessDetector, ProbeErrorKind, ProbeMethod, ScanError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

const TIMEOUT: Duration = Duration::from_millis(500);

#[tokio::test]
async fn test_any_open_candidate_marks_host_alive() {
    let transport = Arc::new(ScriptedTransport::new().with_open(host(10), &[3389]));
    let detector = LivenessDetector::new(transport.clone());

    let outcome = detector.detect(host(10), TIMEOUT).await.unwrap();

    assert!(outcome.alive);
    assert_eq!(outcome.method, ProbeMethod::Tcp);
    assert_eq!(outcome.responding_port, Some(3389));
    assert!(transport.http_attempts().is_empty());
}

#[tokio::test]
async fn test_all_candidates_are_raced() {
    let transport = Arc::new(ScriptedTransport::new().with_default_delay(Duration::from_millis(50)));
    let detector = LivenessDetector::new(transport.clone());

    let _ = detector.detect(host(11), TIMEOUT).await.unwrap();

    let mut ports: Vec<u16> = transport.attempts().into_iter().map(|(_, p)| p).collect();
    ports.sort_unstable();
    assert_eq!(ports, vec![21, 22, 23, 25, 53, 80, 443, 3389]);
    assert_eq!(transport.max_in_flight(), 8);
}

#[tokio::test]
async fn test_first_success_does_not_wait_for_stragglers() {
    let mut transport = ScriptedTransport::new().with_open(host(12), &[22]);
    for port in [80, 443, 21, 23, 25, 53, 3389] {
        transport = transport.with_port_delay(port, Duration::from_secs(3));
    }
    let detector = LivenessDetector::new(Arc::new(transport));

    let start = Instant::now();
    let outcome = timeout(
        Duration::from_secs(2),
        detector.detect(host(12), Duration::from_secs(5)),
    )
    .await
    .expect("detect should return as soon as port 22 connects")
    .unwrap();

    assert!(outcome.alive);
    assert_eq!(outcome.responding_port, Some(22));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_http_only_host_is_alive_via_http() {
    let transport = Arc::new(ScriptedTransport::new().with_http(host(13), 80));
    let detector = LivenessDetector::new(transport.clone());

    let outcome = detector.detect(host(13), TIMEOUT).await.unwrap();

    assert!(outcome.alive);
    assert_eq!(outcome.method, ProbeMethod::Http);
    assert_eq!(outcome.responding_port, Some(80));
    assert_eq!(outcome.error_kind, None);
    assert_eq!(transport.http_attempts(), vec![(host(13), 80)]);
}

#[tokio::test]
async fn test_silent_host_fails_all_methods() {
    let transport = Arc::new(ScriptedTransport::new());
    let detector = LivenessDetector::new(transport.clone());

    let outcome = detector.detect(host(14), TIMEOUT).await.unwrap();

    assert!(!outcome.alive);
    assert_eq!(outcome.method, ProbeMethod::None);
    assert_eq!(outcome.responding_port, None);
    assert_eq!(outcome.error_kind, Some(ProbeErrorKind::AllMethodsFailed));
    assert_eq!(transport.http_attempts().len(), 1);
}

#[tokio::test]
async fn test_timed_out_candidates_still_fall_back() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_default_delay(Duration::from_secs(1))
            .with_http(host(15), 80),
    );
    let detector = LivenessDetector::new(transport);

    let outcome = detector
        .detect(host(15), Duration::from_millis(50))
        .await
        .unwrap();

    assert!(outcome.alive);
    assert_eq!(outcome.method, ProbeMethod::Http);
}

#[tokio::test]
async fn test_fallback_port_is_configurable() {
    let transport = Arc::new(ScriptedTransport::new().with_http(host(16), 8080));
    let detector = LivenessDetector::new(transport.clone())
        .with_candidates(vec![22])
        .with_http_fallback(8080, Duration::from_millis(100));

    let outcome = detector.detect(host(16), TIMEOUT).await.unwrap();

    assert!(outcome.alive);
    assert_eq!(outcome.responding_port, Some(8080));
    assert_eq!(transport.attempts(), vec![(host(16), 22)]);
}

#[tokio::test]
async fn test_transport_fault_is_surfaced() {
    let transport = Arc::new(ScriptedTransport::new().with_fault(host(17)));
    let detector = LivenessDetector::new(transport.clone());

    let result = detector.detect(host(17), TIMEOUT).await;

    assert!(matches!(result, Err(ScanError::TransportUnavailable(_))));
    assert!(transport.http_attempts().is_empty());
}
