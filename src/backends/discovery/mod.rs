// SPDX-License-Identifier: GPL-3.0-only

//! Camera discovery
//!
//! A search broadcasts one query, then listens for replies until the timeout
//! elapses. Each reply points at a description document which is fetched and
//! parsed concurrently with further listening, so devices are yielded as soon
//! as they resolve.
//!
//! ```text
//! open ──► reply ──► fetch description ──► parse ──► dedupe ──► yield
//!            ▲                                                    │
//!            └────────────── until timeout ◄──────────────────────┘
//! ```
//!
//! A candidate whose description cannot be fetched or parsed is dropped
//! without affecting the rest of the search. The only terminal error is a
//! transport that cannot be opened.

pub mod description;
pub mod ssdp;

pub use description::{DeviceDescription, HttpDescriptionFetcher};
pub use ssdp::SsdpTransport;

use crate::backends::types::DeviceDescriptor;
use crate::config::Config;
use crate::errors::DiscoveryError;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use futures::FutureExt;
use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// A reply to the discovery query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReply {
    /// Where the description document lives
    pub location: String,
    /// Address the reply came from
    pub address: IpAddr,
    pub search_target: Option<String>,
    pub usn: Option<String>,
}

/// Opens a search: binds the socket and sends the query
pub trait SearchTransport: Send + Sync + 'static {
    type Channel: SearchChannel;

    fn open(&self) -> impl Future<Output = io::Result<Self::Channel>> + Send;
}

/// An open search listening for replies
pub trait SearchChannel: Send + 'static {
    /// Wait for the next reply addressed to this search
    fn next_reply(&mut self) -> impl Future<Output = io::Result<SearchReply>> + Send;
}

/// Retrieves the description document a reply points at
pub trait DescriptionFetcher: Send + Sync + 'static {
    fn fetch(&self, location: &str) -> impl Future<Output = Result<String, String>> + Send;
}

/// Runs bounded-time searches for cameras
pub struct DiscoveryClient<T = SsdpTransport, F = HttpDescriptionFetcher> {
    transport: Arc<T>,
    fetcher: Arc<F>,
}

impl DiscoveryClient {
    /// Client using SSDP and HTTP with settings from the config
    pub fn new(config: &Config) -> Self {
        Self::with_transport(
            SsdpTransport::new(config.search_target.clone()),
            HttpDescriptionFetcher::new(config.request_timeout()),
        )
    }
}

impl<T, F> Clone for DiscoveryClient<T, F> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            fetcher: Arc::clone(&self.fetcher),
        }
    }
}

/// What woke the search loop
enum SearchEvent {
    Deadline,
    Reply(io::Result<SearchReply>),
    Resolved(Option<DeviceDescriptor>),
}

impl<T: SearchTransport, F: DescriptionFetcher> DiscoveryClient<T, F> {
    pub fn with_transport(transport: T, fetcher: F) -> Self {
        Self {
            transport: Arc::new(transport),
            fetcher: Arc::new(fetcher),
        }
    }

    /// Search for cameras for `timeout`
    ///
    /// The stream yields each device once, as soon as it is resolved, and
    /// ends when the timeout elapses. If the transport cannot be opened the
    /// stream yields a single error and ends. Every call starts a fresh
    /// search with identifiers counting from zero.
    pub fn search(
        &self,
        timeout: Duration,
    ) -> impl Stream<Item = Result<DeviceDescriptor, DiscoveryError>> + Send + 'static {
        let transport = Arc::clone(&self.transport);
        let fetcher = Arc::clone(&self.fetcher);

        async_stream::stream! {
            let deadline = tokio::time::Instant::now() + timeout;

            let mut channel = match transport.open().await {
                Ok(channel) => channel,
                Err(e) => {
                    warn!(error = %e, "Discovery transport unavailable");
                    yield Err(DiscoveryError::TransportUnavailable(e.to_string()));
                    return;
                }
            };
            info!(timeout_ms = timeout.as_millis() as u64, "Discovery started");

            let sleep = tokio::time::sleep_until(deadline);
            tokio::pin!(sleep);

            let mut pending: FuturesUnordered<BoxFuture<'static, Option<DeviceDescriptor>>> =
                FuturesUnordered::new();
            let mut seen_locations = HashSet::new();
            let mut seen_endpoints = HashSet::new();
            let mut receiving = true;
            let mut next_id = 0u32;

            loop {
                let event = tokio::select! {
                    _ = &mut sleep => SearchEvent::Deadline,
                    reply = channel.next_reply(), if receiving => SearchEvent::Reply(reply),
                    Some(resolved) = pending.next(), if !pending.is_empty() => {
                        SearchEvent::Resolved(resolved)
                    }
                };

                match event {
                    SearchEvent::Deadline => break,
                    SearchEvent::Reply(Ok(reply)) => {
                        if seen_locations.insert(reply.location.clone()) {
                            debug!(location = %reply.location, from = %reply.address, "Discovery reply");
                            pending.push(resolve_candidate(Arc::clone(&fetcher), reply).boxed());
                        }
                    }
                    SearchEvent::Reply(Err(e)) => {
                        warn!(error = %e, "Discovery socket failed, waiting for pending candidates");
                        receiving = false;
                    }
                    SearchEvent::Resolved(Some(mut device)) => {
                        if seen_endpoints.insert(device.url.clone()) {
                            device.id = next_id;
                            next_id += 1;
                            info!(device = %device, endpoint = %device.url, "Camera discovered");
                            yield Ok(device);
                        }
                    }
                    SearchEvent::Resolved(None) => {}
                }
            }

            if !pending.is_empty() {
                debug!(unresolved = pending.len(), "Dropping candidates still resolving at deadline");
            }
            info!(found = next_id, "Discovery finished");
        }
    }

    /// Run a search in the background, delivering devices to a callback
    ///
    /// The returned handle resolves once the search reaches its terminal
    /// outcome. Must be called from within a tokio runtime.
    pub fn spawn_search<C>(&self, timeout: Duration, mut on_device: C) -> SearchHandle
    where
        C: FnMut(DeviceDescriptor) + Send + 'static,
    {
        let stream = self.search(timeout);
        let (sender, outcome) = oneshot::channel();

        tokio::spawn(async move {
            tokio::pin!(stream);
            let mut found = 0usize;
            let mut result = Ok(());
            while let Some(item) = stream.next().await {
                match item {
                    Ok(device) => {
                        found += 1;
                        on_device(device);
                    }
                    Err(e) => result = Err(e),
                }
            }
            let _ = sender.send(result.map(|_| found));
        });

        SearchHandle { outcome }
    }
}

/// Fetch and parse one candidate's description
async fn resolve_candidate<F: DescriptionFetcher>(
    fetcher: Arc<F>,
    reply: SearchReply,
) -> Option<DeviceDescriptor> {
    let xml = match fetcher.fetch(&reply.location).await {
        Ok(xml) => xml,
        Err(e) => {
            debug!(location = %reply.location, error = %e, "Skipping candidate");
            return None;
        }
    };

    let description = match DeviceDescription::parse(&xml) {
        Ok(description) => description,
        Err(e) => {
            debug!(location = %reply.location, error = %e, "Skipping candidate");
            return None;
        }
    };

    let Some(endpoint) = description.control_endpoint() else {
        debug!(location = %reply.location, "Candidate has no camera service");
        return None;
    };

    Some(DeviceDescriptor::new(
        0,
        description.friendly_name,
        endpoint,
        reply.address.to_string(),
    ))
}

/// Completion gate for a background search
pub struct SearchHandle {
    outcome: oneshot::Receiver<Result<usize, DiscoveryError>>,
}

impl SearchHandle {
    /// Wait for the search to end; returns how many devices were delivered
    pub async fn wait(self) -> Result<usize, DiscoveryError> {
        self.outcome.await.unwrap_or_else(|_| {
            Err(DiscoveryError::TransportUnavailable(
                "search task ended unexpectedly".to_string(),
            ))
        })
    }

    /// Blocking variant of [`wait`](Self::wait) for callers outside the runtime
    pub fn wait_blocking(self) -> Result<usize, DiscoveryError> {
        self.outcome.blocking_recv().unwrap_or_else(|_| {
            Err(DiscoveryError::TransportUnavailable(
                "search task ended unexpectedly".to_string(),
            ))
        })
    }
}
