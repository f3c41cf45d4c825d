// SPDX-License-Identifier: GPL-3.0-only

//! Camera Timelapse - timed remote capture for network cameras
//!
//! This library finds cameras on the local network, takes remote control of
//! one and triggers a picture on a fixed cadence, reporting progress to any
//! number of listeners.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera discovery and the remote control session
//! - [`pipelines`]: The capture scheduler, its wake source and listeners
//! - [`controller`]: Facade the host drives
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let controller = Controller::new(Config::load());
//! let devices = controller.search(Duration::from_secs(5));
//! // ... pick one
//! controller.connect(&device)?;
//! controller.start_capture(10, 60);
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod controller;
pub mod errors;
pub mod pipelines;

// Re-export commonly used types
pub use backends::{DeviceDescriptor, PictureRef, SessionMode};
pub use config::Config;
pub use controller::Controller;
pub use errors::{AppError, AppResult, DiscoveryError, SessionError, SessionFailure};
pub use pipelines::timelapse::{
    CaptureEvent, CaptureScheduler, ListenerRegistry, ProgressListener, SchedulerSnapshot,
    SchedulerState,
};
