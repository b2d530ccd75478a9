//! Syslog in, Prometheus text out.

use nginx_request_exporter::config::{load_config, Overrides};
use nginx_request_exporter::lifecycle::StartupError;
use nginx_request_exporter::Exporter;

mod common;

const MESSAGES: &str = "nginx_request_exporter_syslog_messages";
const FAILURES: &str = "nginx_request_exporter_syslog_parse_failure";

#[tokio::test]
async fn observations_are_scraped() {
    let exporter = common::start_exporter(".1,.5,1").await;

    common::send_datagrams(
        exporter.syslog_addr,
        &[
            "<190>Oct 19 10:00:00 srv1 nginx: time:0.25 hostname=srv1",
            "<190>Oct 19 10:00:01 srv1 nginx: time:0.75 hostname=srv1",
            "<190>Oct 19 10:00:02 srv1 nginx: time:2 hostname=srv1",
        ],
    )
    .await;

    let text =
        common::wait_for_sample(exporter.http_addr, "nginx_request_time_count{hostname=\"srv1\"}", 3.0).await;

    assert!(text.contains("# TYPE nginx_request_time histogram"));
    assert!(text.contains("# HELP nginx_request_time Nginx request log value for time"));
    assert_eq!(common::sample(&text, "nginx_request_time_sum{hostname=\"srv1\"}"), Some(3.0));
    assert_eq!(
        common::sample(&text, "nginx_request_time_bucket{hostname=\"srv1\",le=\"0.5\"}"),
        Some(1.0)
    );
    assert_eq!(common::sample(&text, MESSAGES), Some(3.0));
    assert_eq!(common::sample(&text, FAILURES).unwrap_or(0.0), 0.0);

    exporter.shutdown.trigger();
    exporter.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn failures_are_counted_per_message() {
    let exporter = common::start_exporter(".1,.5,1").await;

    common::send_datagrams(
        exporter.syslog_addr,
        &[
            "<190>Oct 19 10:00:00 srv1 apache: time:1 hostname=srv1",
            "<190>Oct 19 10:00:00 nginx: time:1 hostname=srv1",
            "<190>Oct 19 10:00:00 srv1 nginx: time:oops hostname=srv1",
            "<190>Oct 19 10:00:00 srv1 nginx: time:1 status=200",
            "not syslog at all",
            "<190>Oct 19 10:00:00 srv1 nginx: time:1 hostname=srv1",
        ],
    )
    .await;

    common::wait_for_sample(exporter.http_addr, MESSAGES, 6.0).await;
    common::wait_for_sample(exporter.http_addr, FAILURES, 5.0).await;

    exporter.shutdown.trigger();
    exporter.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn landing_page_links_to_telemetry() {
    let exporter = common::start_exporter(".1").await;

    let response = common::get(exporter.http_addr, "/").await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("<a href='/metrics'>Metrics</a>"));

    exporter.shutdown.trigger();
    exporter.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn occupied_http_port_is_fatal() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let overrides = Overrides {
        web_listen_address: Some(taken.local_addr().unwrap().to_string()),
        syslog_address: Some("127.0.0.1:0".into()),
        ..Overrides::default()
    };
    let settings = load_config(None, &overrides).unwrap();

    let err = Exporter::bind(&settings).await.err().unwrap();
    assert!(matches!(err, StartupError::HttpBind { .. }));
}
