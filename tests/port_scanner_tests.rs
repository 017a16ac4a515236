//! Per-host port scanner tests

mod common;

use common::{host, ScriptedTransport};
use hypescan::network::protocol::SERVICE_TABLE;
use hypescan::{PortScanner, ProbeTransport, ScanError};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_findings_keep_table_order_when_completions_race() {
    // 5000 answers first, 22 last; the table lists 22 before 3000 before 5000
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_open(host(7), &[5000, 3000, 22])
            .with_port_delay(22, Duration::from_millis(40))
            .with_port_delay(3000, Duration::from_millis(20)),
    );
    let scanner = PortScanner::new(transport.clone() as Arc<dyn ProbeTransport>);

    let findings = scanner
        .scan_services(host(7), 18, Duration::from_millis(200))
        .await
        .unwrap();

    let ports: Vec<u16> = findings.iter().map(|f| f.port).collect();
    assert_eq!(ports, vec![22, 3000, 5000]);
    assert_eq!(findings[0].service, "SSH");
    assert_eq!(findings[2].service, "Flask Dev Server");
    assert!(findings.iter().all(|f| f.address == host(7)));
}

#[tokio::test]
async fn test_port_concurrency_cap_is_respected() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_open(host(8), &[80])
            .with_default_delay(Duration::from_millis(10)),
    );
    let scanner = PortScanner::new(transport.clone() as Arc<dyn ProbeTransport>);

    scanner
        .scan_services(host(8), 4, Duration::from_millis(200))
        .await
        .unwrap();

    assert!(transport.max_in_flight() <= 4);
    assert_eq!(transport.attempts().len(), SERVICE_TABLE.len());
}

#[tokio::test]
async fn test_closed_and_timed_out_ports_are_absent() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_open(host(9), &[443, 8080])
            .with_port_delay(8080, Duration::from_secs(1)),
    );
    let scanner = PortScanner::new(transport as Arc<dyn ProbeTransport>);

    let findings = scanner
        .scan_services(host(9), 8, Duration::from_millis(50))
        .await
        .unwrap();

    let ports: Vec<u16> = findings.iter().map(|f| f.port).collect();
    assert_eq!(ports, vec![443]);
}

#[tokio::test]
async fn test_transport_fault_is_an_error() {
    let transport = Arc::new(ScriptedTransport::new().with_fault(host(10)));
    let scanner = PortScanner::new(transport as Arc<dyn ProbeTransport>);

    let err = scanner
        .scan_services(host(10), 8, Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::TransportUnavailable(_)));
}
