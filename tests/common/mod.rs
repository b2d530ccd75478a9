//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use nginx_request_exporter::config::{load_config, Overrides};
use nginx_request_exporter::lifecycle::StartupError;
use nginx_request_exporter::{Exporter, Shutdown};

/// A running exporter bound to ephemeral local ports.
pub struct TestExporter {
    pub http_addr: SocketAddr,
    pub syslog_addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), StartupError>>,
}

/// Start an exporter on 127.0.0.1 with ephemeral ports.
pub async fn start_exporter(buckets: &str) -> TestExporter {
    let overrides = Overrides {
        web_listen_address: Some("127.0.0.1:0".into()),
        syslog_address: Some("127.0.0.1:0".into()),
        histogram_buckets: Some(buckets.into()),
        ..Overrides::default()
    };
    let settings = load_config(None, &overrides).unwrap();
    let exporter = Exporter::bind(&settings).await.unwrap();

    let http_addr = exporter.http_addr().unwrap();
    let syslog_addr = exporter.syslog_addr().unwrap();
    let shutdown = Shutdown::new();

    let task_shutdown = shutdown.clone();
    let task = tokio::spawn(async move { exporter.run(&task_shutdown).await });

    TestExporter {
        http_addr,
        syslog_addr,
        shutdown,
        task,
    }
}

/// Send each payload as one syslog datagram.
pub async fn send_datagrams(target: SocketAddr, payloads: &[&str]) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for payload in payloads {
        socket.send_to(payload.as_bytes(), target).await.unwrap();
    }
}

/// Fetch a URL from the exporter.
pub async fn get(addr: SocketAddr, path: &str) -> reqwest::Response {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
        .get(format!("http://{addr}{path}"))
        .send()
        .await
        .expect("exporter unreachable")
}

/// Value of `series` in a text exposition, if present.
pub fn sample(text: &str, series: &str) -> Option<f64> {
    text.lines()
        .find_map(|line| line.strip_prefix(series)?.strip_prefix(' '))
        .and_then(|v| v.trim().parse().ok())
}

/// Scrape until `series` reaches `expected` or a few seconds pass.
pub async fn wait_for_sample(addr: SocketAddr, series: &str, expected: f64) -> String {
    let mut text = String::new();
    for _ in 0..50 {
        text = get(addr, "/metrics").await.text().await.unwrap();
        if sample(&text, series) == Some(expected) {
            return text;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("{series} never reached {expected}; last scrape:\n{text}");
}
