// SPDX-License-Identifier: GPL-3.0-only

//! Human-readable capture progress
//!
//! [`LogProgressListener`] writes one timestamped status line per event,
//! the terminal counterpart of a persistent progress notification.

use super::listeners::{CaptureEvent, ProgressListener};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

/// Share of a plan completed, rounded to the nearest percent
pub fn percent_complete(current: u32, max: u32) -> u32 {
    if max == 0 {
        return 0;
    }
    let current = u64::from(current.min(max));
    ((current * 200 + u64::from(max)) / (2 * u64::from(max))) as u32
}

/// Remaining duration of `repeats` shots spaced `period_secs` apart
///
/// Formatted like `1h 2m 3s`, omitting zero units.
pub fn format_time_left(period_secs: u32, repeats: u32) -> String {
    let total = u64::from(period_secs) * u64::from(repeats);
    if total == 0 {
        return "0s".to_string();
    }

    let units = [
        (total / 86_400, "d"),
        (total % 86_400 / 3_600, "h"),
        (total % 3_600 / 60, "m"),
        (total % 60, "s"),
    ];
    units
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Status line for an event
///
/// `period_secs` is the period of the running plan, used to estimate the
/// time left after each picture.
pub fn status_text(event: &CaptureEvent, period_secs: u32) -> String {
    match *event {
        CaptureEvent::Started {
            period_secs,
            max_repeats,
        } => format!(
            "Timelapse in progress: {} shots every {}s, about {} left",
            max_repeats,
            period_secs,
            format_time_left(period_secs, max_repeats.saturating_sub(1))
        ),
        CaptureEvent::PictureTaken { current, max } => format!(
            "Timelapse in progress: {}% ({}/{}), about {} left",
            percent_complete(current, max),
            current,
            max,
            format_time_left(period_secs, max.saturating_sub(current))
        ),
        CaptureEvent::Finished => "Timelapse finished".to_string(),
        CaptureEvent::Canceled => "Timelapse canceled".to_string(),
    }
}

/// Writes a timestamped status line for every capture event
pub struct LogProgressListener {
    out: Mutex<Box<dyn Write + Send>>,
    period_secs: AtomicU32,
}

impl LogProgressListener {
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            period_secs: AtomicU32::new(0),
        }
    }

    fn emit(&self, event: CaptureEvent) {
        let text = status_text(&event, self.period_secs.load(Ordering::Relaxed));
        info!(status = %text, "Capture progress");

        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "[{}] {}", timestamp, text).and_then(|_| out.flush()) {
            debug!(error = %e, "Failed to write progress line");
        }
    }
}

impl ProgressListener for LogProgressListener {
    fn capture_started(&self, period_secs: u32, max_repeats: u32) {
        self.period_secs.store(period_secs, Ordering::Relaxed);
        self.emit(CaptureEvent::Started {
            period_secs,
            max_repeats,
        });
    }

    fn capture_canceled(&self) {
        self.emit(CaptureEvent::Canceled);
    }

    fn capture_finished(&self) {
        self.emit(CaptureEvent::Finished);
    }

    fn picture_taken(&self, current: u32, max: u32) {
        self.emit(CaptureEvent::PictureTaken { current, max });
    }
}
