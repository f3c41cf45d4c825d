// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for timelapse operations
//!
//! This module provides command-line functionality for:
//! - Searching for cameras on the local network
//! - Running a timelapse capture plan
//! - Listing a camera's remote operations

use camera_timelapse::backends::DeviceDescriptor;
use camera_timelapse::config::Config;
use camera_timelapse::controller::Controller;
use camera_timelapse::pipelines::timelapse::{LogProgressListener, ProgressListener};
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::Duration;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Search for cameras and print them as they are found
pub fn search_cameras(timeout: Option<u64>, json: bool) -> CliResult {
    let config = Config::load();
    let timeout = search_timeout(&config, timeout);
    let controller = Controller::new(config);

    if !json {
        println!("Searching for {}s...", timeout.as_secs());
    }
    let devices = discover(&controller, timeout, |device| {
        if json {
            match device.to_json() {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("Failed to serialize device: {}", e),
            }
        } else {
            println!("  [{}] {}", device.id, device);
            println!("      Endpoint: {}", device.url);
        }
    })?;

    if devices.is_empty() && !json {
        println!("No cameras found.");
    }
    Ok(())
}

/// Run a capture plan on the selected camera until it finishes or Ctrl+C
pub fn shoot(
    device_index: u32,
    period: Option<u32>,
    repeats: Option<u32>,
    focus_mode: Option<String>,
    timeout: Option<u64>,
) -> CliResult {
    let mut config = Config::load();
    if focus_mode.is_some() {
        config.focus_mode = focus_mode;
    }
    let period = period.unwrap_or(config.default_period_secs);
    let repeats = repeats.unwrap_or(config.default_repeats);
    if period == 0 || repeats == 0 {
        return Err("Period and repeats must both be at least 1".into());
    }

    let timeout = search_timeout(&config, timeout);
    let controller = Controller::new(config.clone());

    println!("Searching for cameras...");
    discover(&controller, timeout, |_| {})?;
    let device = controller.connect_by_id(device_index)?;
    println!("Using camera: {}", device);

    let (done_tx, done_rx) = mpsc::channel();
    controller.add_listener(Arc::new(LogProgressListener::stdout()));
    controller.add_listener(Arc::new(CompletionSignal(done_tx)));

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!(
        "Capturing {} pictures every {}s (press Ctrl+C to cancel)",
        repeats, period
    );
    if !controller.start_capture(period, repeats) {
        controller.disconnect();
        return Err("Camera is not ready to capture".into());
    }

    let mut cancel_sent = false;
    loop {
        match done_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if stop_flag.load(Ordering::SeqCst) && !cancel_sent {
                    println!();
                    println!("Canceling...");
                    cancel_sent = true;
                    if !controller.cancel_capture() {
                        break;
                    }
                }
            }
        }
    }

    let taken = controller.current_count();
    controller.disconnect();

    config.last_device = Some(device);
    config.default_period_secs = period;
    config.default_repeats = repeats;
    if let Err(e) = config.save() {
        eprintln!("Warning: failed to save settings: {}", e);
    }

    if !cancel_sent {
        println!("Done: {} of {} repeats", taken, repeats);
    }
    Ok(())
}

/// Print the remote operations the selected camera accepts
pub fn list_capabilities(device_index: u32, timeout: Option<u64>) -> CliResult {
    let config = Config::load();
    let timeout = search_timeout(&config, timeout);
    let controller = Controller::new(config);

    discover(&controller, timeout, |_| {})?;
    let device = controller.connect_by_id(device_index)?;

    let capabilities = controller.list_capabilities();
    controller.disconnect();
    let capabilities = capabilities?;

    println!("{} supports {} operations:", device, capabilities.len());
    for name in capabilities {
        println!("  {}", name);
    }
    Ok(())
}

fn search_timeout(config: &Config, override_secs: Option<u64>) -> Duration {
    override_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.search_timeout())
}

/// Run one search to completion, reporting devices as they arrive
fn discover(
    controller: &Controller,
    timeout: Duration,
    mut on_device: impl FnMut(&DeviceDescriptor),
) -> Result<Vec<DeviceDescriptor>, Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let stream = controller.search(timeout);
        tokio::pin!(stream);
        while let Some(item) = stream.next().await {
            on_device(&item?);
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(controller.devices())
}

/// Signals the waiting CLI when a run ends
struct CompletionSignal(Sender<()>);

impl ProgressListener for CompletionSignal {
    fn capture_finished(&self) {
        let _ = self.0.send(());
    }

    fn capture_canceled(&self) {
        let _ = self.0.send(());
    }
}
