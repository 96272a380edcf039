// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scrape the exporter over HTTP while it runs.
//!
//! Lives in its own test binary: the recorder is process-global.

use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use switchboard_core::traits::adapter::PluginAdapter;
use switchboard_prometheus::{PrometheusAdapter, record_notification_failure, set_queue_depth};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn free_local_addr() -> SocketAddr {
    let socket = TcpListener::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap()
}

async fn scrape(addr: SocketAddr) -> String {
    for _ in 0..50 {
        if let Ok(mut stream) = TcpStream::connect(addr).await {
            stream
                .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            let mut body = String::new();
            stream.read_to_string(&mut body).await.unwrap();
            return body;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("metrics endpoint never came up on {addr}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn live_metrics_are_scrapeable() {
    let addr = free_local_addr();
    let adapter = PrometheusAdapter::with_http_listener(addr).unwrap();

    record_notification_failure("queue_position");
    set_queue_depth("t1", 4);

    let body = scrape(addr).await;
    assert!(body.starts_with("HTTP/1.1 200"), "unexpected response: {body}");
    assert!(body.contains("switchboard_notifications_failed_total"));
    assert!(body.contains("switchboard_queue_depth"));
    assert!(adapter.render().contains("switchboard_queue_depth"));

    adapter.shutdown().await.unwrap();
}
