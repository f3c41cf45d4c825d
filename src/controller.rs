// SPDX-License-Identifier: GPL-3.0-only

//! Single entry point tying discovery, the remote session and the capture
//! scheduler together
//!
//! One controller owns one scheduler and at most one bound camera. It is
//! created by the host and lives as long as the host wants captures to keep
//! running; nothing here is global.

use crate::backends::discovery::{
    DescriptionFetcher, DiscoveryClient, HttpDescriptionFetcher, SearchTransport, SsdpTransport,
};
use crate::backends::remote::{CameraSession, RemoteCameraSession};
use crate::backends::types::{DeviceDescriptor, SessionMode};
use crate::config::Config;
use crate::errors::{AppError, AppResult, DiscoveryError, SessionResult};
use crate::pipelines::timelapse::{
    CaptureScheduler, ListenerRegistry, ProgressListener, SchedulerSnapshot, SchedulerState,
};
use futures::stream::{Stream, StreamExt};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{info, warn};

/// Builds a session for a discovered device
pub type SessionFactory =
    Box<dyn Fn(&DeviceDescriptor) -> Box<dyn CameraSession> + Send + Sync + 'static>;

pub struct Controller<T = SsdpTransport, F = HttpDescriptionFetcher> {
    config: Config,
    discovery: DiscoveryClient<T, F>,
    scheduler: CaptureScheduler,
    sessions: SessionFactory,
    /// Devices delivered by the latest search
    devices: Arc<Mutex<Vec<DeviceDescriptor>>>,
}

impl Controller {
    /// Controller talking to real cameras, scheduled on the boot clock
    pub fn new(config: Config) -> Self {
        let request_timeout = config.request_timeout();
        let discovery = DiscoveryClient::new(&config);
        let scheduler = CaptureScheduler::with_system_clock(Arc::new(ListenerRegistry::new()));
        let sessions: SessionFactory = Box::new(move |device| {
            Box::new(RemoteCameraSession::connect_http(
                device.clone(),
                request_timeout,
            ))
        });
        Self::with_parts(config, discovery, scheduler, sessions)
    }
}

impl<T: SearchTransport, F: DescriptionFetcher> Controller<T, F> {
    pub fn with_parts(
        config: Config,
        discovery: DiscoveryClient<T, F>,
        scheduler: CaptureScheduler,
        sessions: SessionFactory,
    ) -> Self {
        Self {
            config,
            discovery,
            scheduler,
            sessions,
            devices: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scheduler(&self) -> &CaptureScheduler {
        &self.scheduler
    }

    /// Start a search; devices it yields are remembered for
    /// [`connect_by_id`](Self::connect_by_id)
    pub fn search(
        &self,
        timeout: Duration,
    ) -> impl Stream<Item = Result<DeviceDescriptor, DiscoveryError>> + Send + 'static {
        let devices = Arc::clone(&self.devices);
        devices.lock().unwrap_or_else(PoisonError::into_inner).clear();

        self.discovery.search(timeout).inspect(move |item| {
            if let Ok(device) = item {
                devices
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(device.clone());
            }
        })
    }

    /// Devices found by the latest search, in discovery order
    pub fn devices(&self) -> Vec<DeviceDescriptor> {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Open a session to `device` and enter recording mode
    ///
    /// The configured focus mode, if any, is applied afterwards; failing to
    /// apply it does not fail the connection.
    pub fn connect(&self, device: &DeviceDescriptor) -> SessionResult<()> {
        self.scheduler.connect((self.sessions)(device))?;
        info!(device = %device, "Camera connected");

        if let Some(mode) = &self.config.focus_mode
            && let Err(e) = self.scheduler.set_focus_mode(mode)
        {
            warn!(mode = %mode, error = %e, "Could not apply configured focus mode");
        }
        Ok(())
    }

    /// Connect to a device from the latest search by its identifier
    pub fn connect_by_id(&self, id: u32) -> AppResult<DeviceDescriptor> {
        let device = self
            .devices()
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| AppError::DeviceNotFound(format!("no device with id {}", id)))?;
        self.connect(&device)?;
        Ok(device)
    }

    pub fn disconnect(&self) -> bool {
        self.scheduler.disconnect()
    }

    pub fn start_capture(&self, period_secs: u32, max_repeats: u32) -> bool {
        self.scheduler.start(period_secs, max_repeats)
    }

    pub fn modify_capture(&self, period_secs: u32, max_repeats: u32) -> bool {
        self.scheduler.modify(period_secs, max_repeats)
    }

    pub fn cancel_capture(&self) -> bool {
        self.scheduler.cancel()
    }

    pub fn set_focus_mode(&self, mode: &str) -> SessionResult<Value> {
        self.scheduler.set_focus_mode(mode)
    }

    pub fn list_capabilities(&self) -> SessionResult<Vec<String>> {
        self.scheduler.list_capabilities()
    }

    pub fn add_listener(&self, listener: Arc<dyn ProgressListener>) {
        self.scheduler.listeners().add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ProgressListener>) -> bool {
        self.scheduler.listeners().remove(listener)
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.scheduler.snapshot()
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn mode(&self) -> SessionMode {
        self.snapshot().mode
    }

    pub fn period(&self) -> u32 {
        self.snapshot().period_secs
    }

    pub fn max_repeats(&self) -> u32 {
        self.snapshot().max_repeats
    }

    pub fn current_count(&self) -> u32 {
        self.snapshot().current_count
    }
}
