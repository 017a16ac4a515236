//! Network layer tests against real loopback sockets

use hypescan::network::http::HttpPinger;
use hypescan::network::protocol::ServicePort;
use hypescan::network::socket::TcpConnectScanner;
use hypescan::{
    LivenessDetector, NetworkTransport, PortScanner, ProbeErrorKind, ProbeMethod, ProbeTransport,
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;

/// A loopback port with nothing listening on it
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// Answer every request with an empty 404
async fn serve_http(listener: TcpListener) {
    while let Ok((mut stream, _)) = listener.accept().await {
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let _ = stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await;
            let _ = stream.shutdown().await;
        });
    }
}

fn transport() -> Arc<dyn ProbeTransport> {
    Arc::new(NetworkTransport::new().unwrap())
}

#[tokio::test]
async fn test_tcp_connect_scanner_open_and_closed() {
    let (_listener, open) = listener().await;
    let scanner = TcpConnectScanner::new();

    let start = Instant::now();
    let up = scanner
        .probe(Ipv4Addr::LOCALHOST, open, Duration::from_secs(1))
        .await;
    let down = scanner
        .probe(Ipv4Addr::LOCALHOST, closed_port(), Duration::from_secs(1))
        .await;

    assert!(up.alive);
    assert_eq!(up.method, ProbeMethod::Tcp);
    assert!(!down.alive);
    assert_eq!(down.error_kind, Some(ProbeErrorKind::Refused));

    // Loopback should settle well within the timeout
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_liveness_over_real_sockets() {
    let (_listener, open) = listener().await;
    let detector = LivenessDetector::new(transport()).with_candidates(vec![closed_port(), open]);

    let outcome = timeout(
        Duration::from_secs(5),
        detector.detect(Ipv4Addr::LOCALHOST, Duration::from_secs(1)),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(outcome.alive);
    assert_eq!(outcome.responding_port, Some(open));
}

#[tokio::test]
async fn test_http_fallback_over_real_sockets() {
    let (http_listener, http_port) = listener().await;
    tokio::spawn(serve_http(http_listener));

    let detector = LivenessDetector::new(transport())
        .with_candidates(vec![closed_port()])
        .with_http_fallback(http_port, Duration::from_secs(2));

    let outcome = detector
        .detect(Ipv4Addr::LOCALHOST, Duration::from_millis(500))
        .await
        .unwrap();

    assert!(outcome.alive);
    assert_eq!(outcome.method, ProbeMethod::Http);
    assert_eq!(outcome.responding_port, Some(http_port));
}

#[tokio::test]
async fn test_http_pinger_counts_error_status() {
    let (http_listener, http_port) = listener().await;
    tokio::spawn(serve_http(http_listener));

    let pinger = HttpPinger::new().unwrap();
    assert!(
        pinger
            .head(Ipv4Addr::LOCALHOST, http_port, Duration::from_secs(2))
            .await
    );
}

#[tokio::test]
async fn test_port_scanner_reports_table_order() {
    let (_a, first) = listener().await;
    let (_b, second) = listener().await;

    // Declare the higher port first to check table order, not numeric order
    let (hi, lo) = if first > second { (first, second) } else { (second, first) };
    let table = [
        ServicePort::new(hi, "High"),
        ServicePort::new(closed_port(), "Closed"),
        ServicePort::new(lo, "Low"),
    ];

    let findings = PortScanner::new(transport())
        .scan_ports(Ipv4Addr::LOCALHOST, &table, 2, Duration::from_secs(1))
        .await
        .unwrap();

    let ports: Vec<u16> = findings.iter().map(|f| f.port).collect();
    assert_eq!(ports, vec![hi, lo]);
    assert_eq!(findings[0].service, "High");
    assert_eq!(findings[1].service, "Low");
}

#[test]
fn test_probe_from_blocking_context() {
    let (std_listener, port) = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = l.local_addr().unwrap().port();
        (l, port)
    };

    let outcome = tokio_test::block_on(async {
        TcpConnectScanner::new()
            .probe(Ipv4Addr::LOCALHOST, port, Duration::from_secs(1))
            .await
    });

    assert!(outcome.alive);
    drop(std_listener);
}
