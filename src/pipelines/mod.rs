// SPDX-License-Identifier: GPL-3.0-only

//! Capture pipelines
//!
//! ```text
//! ┌────────────┐  wake   ┌──────────────────┐  actTakePicture  ┌────────┐
//! │ WakeSource │ ──────▶ │ CaptureScheduler │ ───────────────▶ │ Camera │
//! │ (boot clk) │         │ (serial thread)  │                  │        │
//! └────────────┘         └──────────────────┘                  └────────┘
//!                                 │ events
//!                                 ▼
//!                        ┌──────────────────┐
//!                        │ ListenerRegistry │
//!                        └──────────────────┘
//! ```
//!
//! - [`timelapse`]: timed capture plans against a remote camera

pub mod timelapse;
