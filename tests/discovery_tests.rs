// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for camera discovery

mod common;

use camera_timelapse::DiscoveryError;
use camera_timelapse::backends::discovery::DiscoveryClient;
use common::{FakeFetcher, FakeTransport, description_xml, reply};
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_millis(300);

#[tokio::test]
async fn test_no_responders_completes_empty() {
    let client = DiscoveryClient::with_transport(FakeTransport::default(), FakeFetcher::default());

    let started = Instant::now();
    let results: Vec<_> = client.search(WINDOW).collect().await;

    assert!(results.is_empty());
    assert!(started.elapsed() >= WINDOW);
    assert!(started.elapsed() < WINDOW * 4);
}

#[tokio::test]
async fn test_failed_resolution_is_dropped() {
    let transport = FakeTransport::with_replies(vec![
        reply("http://10.0.0.1:64321/dd.xml", "10.0.0.1"),
        reply("http://10.0.0.2:64321/dd.xml", "10.0.0.2"),
    ]);
    let fetcher = FakeFetcher::default().serve(
        "http://10.0.0.2:64321/dd.xml",
        description_xml("ILCE-6000", "10.0.0.2"),
    );
    let client = DiscoveryClient::with_transport(transport, fetcher);

    let results: Vec<_> = client.search(WINDOW).collect().await;

    assert_eq!(results.len(), 1);
    let device = results[0].as_ref().unwrap();
    assert_eq!(device.id, 0);
    assert_eq!(device.friendly_name, "ILCE-6000");
    assert_eq!(device.url, "http://10.0.0.2:10000/sony/camera");
    assert_eq!(device.ip, "10.0.0.2");
}

#[tokio::test]
async fn test_duplicate_replies_yield_one_device() {
    let transport = FakeTransport::with_replies(vec![
        reply("http://10.0.0.1:64321/dd.xml", "10.0.0.1"),
        reply("http://10.0.0.1:64321/dd.xml", "10.0.0.1"),
        // Same camera announcing a second description location
        reply("http://10.0.0.1:64321/other.xml", "10.0.0.1"),
    ]);
    let fetcher = FakeFetcher::default()
        .serve("http://10.0.0.1:64321/dd.xml", description_xml("DSC-QX10", "10.0.0.1"))
        .serve("http://10.0.0.1:64321/other.xml", description_xml("DSC-QX10", "10.0.0.1"));
    let client = DiscoveryClient::with_transport(transport, fetcher);

    let results: Vec<_> = client.search(WINDOW).collect().await;
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_transport_failure_is_single_error() {
    let client = DiscoveryClient::with_transport(FakeTransport::failing(), FakeFetcher::default());

    let results: Vec<_> = client.search(WINDOW).collect().await;

    assert_eq!(results.len(), 1);
    assert!(matches!(
        results[0],
        Err(DiscoveryError::TransportUnavailable(_))
    ));
}

#[tokio::test]
async fn test_devices_arrive_before_deadline() {
    let transport =
        FakeTransport::with_replies(vec![reply("http://10.0.0.1:64321/dd.xml", "10.0.0.1")]);
    let fetcher = FakeFetcher::default()
        .serve("http://10.0.0.1:64321/dd.xml", description_xml("DSC-QX10", "10.0.0.1"));
    let client = DiscoveryClient::with_transport(transport, fetcher);

    let started = Instant::now();
    let stream = client.search(Duration::from_secs(2));
    tokio::pin!(stream);

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.friendly_name, "DSC-QX10");
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_ids_restart_for_each_search() {
    let transport = FakeTransport::with_replies(vec![
        reply("http://10.0.0.1:64321/dd.xml", "10.0.0.1"),
        reply("http://10.0.0.2:64321/dd.xml", "10.0.0.2"),
    ]);
    let fetcher = FakeFetcher::default()
        .serve("http://10.0.0.1:64321/dd.xml", description_xml("DSC-QX10", "10.0.0.1"))
        .serve("http://10.0.0.2:64321/dd.xml", description_xml("ILCE-6000", "10.0.0.2"));
    let client = DiscoveryClient::with_transport(transport, fetcher);

    for _ in 0..2 {
        let mut ids: Vec<u32> = client
            .search(WINDOW)
            .map(|item| item.unwrap().id)
            .collect()
            .await;
        ids.sort();
        assert_eq!(ids, vec![0, 1]);
    }
}

#[tokio::test]
async fn test_slow_resolution_dropped_at_deadline() {
    let transport = FakeTransport::with_replies(vec![
        reply("http://10.0.0.1:64321/dd.xml", "10.0.0.1"),
        reply("http://10.0.0.2:64321/dd.xml", "10.0.0.2"),
    ]);
    let fetcher = FakeFetcher::default()
        .serve("http://10.0.0.1:64321/dd.xml", description_xml("DSC-QX10", "10.0.0.1"))
        .serve("http://10.0.0.2:64321/dd.xml", description_xml("ILCE-6000", "10.0.0.2"))
        .delay("http://10.0.0.2:64321/dd.xml", Duration::from_secs(5));
    let client = DiscoveryClient::with_transport(transport, fetcher);

    let started = Instant::now();
    let results: Vec<_> = client.search(WINDOW).collect().await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_ref().unwrap().friendly_name, "DSC-QX10");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_spawn_search_delivers_to_callback() {
    let transport =
        FakeTransport::with_replies(vec![reply("http://10.0.0.1:64321/dd.xml", "10.0.0.1")]);
    let fetcher = FakeFetcher::default()
        .serve("http://10.0.0.1:64321/dd.xml", description_xml("DSC-QX10", "10.0.0.1"));
    let client = DiscoveryClient::with_transport(transport, fetcher);

    let found = Arc::new(Mutex::new(Vec::new()));
    let sink = found.clone();
    let handle = client.spawn_search(WINDOW, move |device| sink.lock().unwrap().push(device));

    assert_eq!(handle.wait().await, Ok(1));
    assert_eq!(found.lock().unwrap()[0].friendly_name, "DSC-QX10");
}

#[tokio::test]
async fn test_spawn_search_reports_transport_failure() {
    let client = DiscoveryClient::with_transport(FakeTransport::failing(), FakeFetcher::default());

    let handle = client.spawn_search(WINDOW, |_| {});
    assert!(handle.wait().await.is_err());
}
