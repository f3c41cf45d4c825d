// SPDX-License-Identifier: GPL-3.0-only

//! Timelapse capture scheduling
//!
//! ```text
//!            connect                 start
//!   Idle ───────────────► Connected ───────────► Capturing ──┐ tick
//!    ▲                      │  ▲   ◄── cancel ───  │    ▲    │
//!    └────── disconnect ────┘  └──── finished ─────┘    └────┘
//! ```
//!
//! The scheduler owns the camera session and the capture plan on a dedicated
//! worker thread. Public operations are messages to that thread, and wakes
//! from the [`WakeSource`] are turned into messages too, so commands and
//! ticks never interleave.
//!
//! Ticks are scheduled against the plan's start time: the next deadline is
//! the previous *scheduled* deadline plus the period, so time spent in the
//! remote call never accumulates as drift.

pub mod listeners;
pub mod plan;
pub mod progress;
pub mod wake;

pub use listeners::{CaptureEvent, ListenerRegistry, ProgressListener};
pub use plan::CapturePlan;
pub use progress::{LogProgressListener, format_time_left};
pub use wake::{ManualWakeSource, SystemWakeSource, WakeCallback, WakeSource};

use crate::backends::remote::CameraSession;
use crate::backends::types::{DeviceDescriptor, SessionMode};
use crate::errors::{RemoteOperation, SessionError, SessionFailure, SessionResult};
use serde_json::Value;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Scheduler lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    /// No session bound
    #[default]
    Idle,
    /// Session bound, no plan running
    Connected,
    /// A plan is running
    Capturing,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "idle"),
            SchedulerState::Connected => write!(f, "connected"),
            SchedulerState::Capturing => write!(f, "capturing"),
        }
    }
}

/// Point-in-time view of the scheduler, published after every change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    pub state: SchedulerState,
    pub mode: SessionMode,
    pub period_secs: u32,
    pub max_repeats: u32,
    pub current_count: u32,
    pub device: Option<DeviceDescriptor>,
}

impl Default for SchedulerSnapshot {
    fn default() -> Self {
        let plan = CapturePlan::default();
        Self {
            state: SchedulerState::Idle,
            mode: SessionMode::Disconnected,
            period_secs: plan.period_secs(),
            max_repeats: plan.max_repeats(),
            current_count: plan.current_count(),
            device: None,
        }
    }
}

enum Command {
    Connect(Box<dyn CameraSession>, Sender<SessionResult<()>>),
    Disconnect(Sender<bool>),
    Start {
        period_secs: u32,
        max_repeats: u32,
        reply: Sender<bool>,
    },
    Modify {
        period_secs: u32,
        max_repeats: u32,
        reply: Sender<bool>,
    },
    Cancel(Sender<bool>),
    SetFocusMode(String, Sender<SessionResult<Value>>),
    ListCapabilities(Sender<SessionResult<Vec<String>>>),
    Wake {
        generation: u64,
        deadline: Duration,
    },
    Flush(Sender<()>),
    Shutdown,
}

/// Drives one camera session through timed capture plans
///
/// Out-of-state commands are ignored rather than reported as errors; the
/// boolean results say whether a command took effect.
pub struct CaptureScheduler {
    commands: Sender<Command>,
    snapshot: Arc<Mutex<SchedulerSnapshot>>,
    listeners: Arc<ListenerRegistry>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureScheduler {
    pub fn new(wake: Arc<dyn WakeSource>, listeners: Arc<ListenerRegistry>) -> Self {
        let (commands, inbox) = mpsc::channel();
        let snapshot = Arc::new(Mutex::new(SchedulerSnapshot::default()));

        let worker = Worker {
            wake,
            listeners: Arc::clone(&listeners),
            commands: commands.clone(),
            snapshot: Arc::clone(&snapshot),
            session: None,
            state: SchedulerState::Idle,
            plan: CapturePlan::default(),
            generation: 0,
        };
        let handle = thread::spawn(move || worker.run(inbox));

        Self {
            commands,
            snapshot,
            listeners,
            worker: Some(handle),
        }
    }

    /// Scheduler on the system boot clock
    pub fn with_system_clock(listeners: Arc<ListenerRegistry>) -> Self {
        Self::new(Arc::new(SystemWakeSource::new()), listeners)
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    fn request<R>(&self, command: impl FnOnce(Sender<R>) -> Command) -> Option<R> {
        let (reply, response) = mpsc::channel();
        if self.commands.send(command(reply)).is_err() {
            warn!("Scheduler thread is gone");
            return None;
        }
        response.recv().ok()
    }

    /// Bind a session and switch it into recording mode
    ///
    /// A session already bound is released first. On failure the scheduler
    /// stays idle.
    pub fn connect(&self, session: Box<dyn CameraSession>) -> SessionResult<()> {
        self.request(|reply| Command::Connect(session, reply))
            .unwrap_or_else(|| Err(gone(RemoteOperation::EnterRecordingMode)))
    }

    /// Cancel any running plan, leave recording mode and unbind the session
    pub fn disconnect(&self) -> bool {
        self.request(Command::Disconnect).unwrap_or(false)
    }

    /// Start a plan of `max_repeats` shots every `period_secs`
    ///
    /// The first shot is taken immediately. Ignored unless connected and
    /// idle, or if either parameter is zero.
    pub fn start(&self, period_secs: u32, max_repeats: u32) -> bool {
        self.request(|reply| Command::Start {
            period_secs,
            max_repeats,
            reply,
        })
        .unwrap_or(false)
    }

    /// Change the plan parameters in place
    ///
    /// A running plan keeps its pending wake; the new period applies from
    /// the tick after it.
    pub fn modify(&self, period_secs: u32, max_repeats: u32) -> bool {
        self.request(|reply| Command::Modify {
            period_secs,
            max_repeats,
            reply,
        })
        .unwrap_or(false)
    }

    /// Stop the running plan; a tick already in progress completes first
    pub fn cancel(&self) -> bool {
        self.request(Command::Cancel).unwrap_or(false)
    }

    pub fn set_focus_mode(&self, mode: &str) -> SessionResult<Value> {
        let mode = mode.to_string();
        self.request(|reply| Command::SetFocusMode(mode, reply))
            .unwrap_or_else(|| Err(gone(RemoteOperation::SetFocusMode)))
    }

    pub fn list_capabilities(&self) -> SessionResult<Vec<String>> {
        self.request(Command::ListCapabilities)
            .unwrap_or_else(|| Err(gone(RemoteOperation::ListCapabilities)))
    }

    /// Wait until every command queued before this call, wakes included,
    /// has been handled
    pub fn flush(&self) {
        let _ = self.request(Command::Flush);
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.snapshot().state
    }
}

impl Drop for CaptureScheduler {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.worker.take()
            && handle.join().is_err()
        {
            warn!("Scheduler thread panicked");
        }
    }
}

fn gone(operation: RemoteOperation) -> SessionError {
    SessionError::new(operation, SessionFailure::NotConnected)
}

/// State owned by the scheduler thread
struct Worker {
    wake: Arc<dyn WakeSource>,
    listeners: Arc<ListenerRegistry>,
    /// Handed to wake callbacks so they can re-enter this thread
    commands: Sender<Command>,
    snapshot: Arc<Mutex<SchedulerSnapshot>>,
    session: Option<Box<dyn CameraSession>>,
    state: SchedulerState,
    plan: CapturePlan,
    /// Bumped whenever a run ends so stale wakes are recognised
    generation: u64,
}

impl Worker {
    fn run(mut self, inbox: Receiver<Command>) {
        debug!("Scheduler thread started");

        while let Ok(command) = inbox.recv() {
            match command {
                Command::Connect(session, reply) => {
                    let _ = reply.send(self.connect(session));
                }
                Command::Disconnect(reply) => {
                    let _ = reply.send(self.disconnect());
                }
                Command::Start {
                    period_secs,
                    max_repeats,
                    reply,
                } => {
                    let _ = reply.send(self.start(period_secs, max_repeats));
                }
                Command::Modify {
                    period_secs,
                    max_repeats,
                    reply,
                } => {
                    let _ = reply.send(self.modify(period_secs, max_repeats));
                }
                Command::Cancel(reply) => {
                    let _ = reply.send(self.cancel());
                }
                Command::SetFocusMode(mode, reply) => {
                    let _ = reply.send(self.set_focus_mode(&mode));
                }
                Command::ListCapabilities(reply) => {
                    let _ = reply.send(self.list_capabilities());
                }
                Command::Wake {
                    generation,
                    deadline,
                } => self.on_wake(generation, deadline),
                Command::Flush(reply) => {
                    let _ = reply.send(());
                }
                Command::Shutdown => break,
            }
        }

        self.wake.disarm();
        if self.state != SchedulerState::Idle {
            self.disconnect();
        }
        debug!("Scheduler thread exiting");
    }

    fn publish(&self) {
        let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        *snapshot = SchedulerSnapshot {
            state: self.state,
            mode: self
                .session
                .as_ref()
                .map_or(SessionMode::Disconnected, |s| s.mode()),
            period_secs: self.plan.period_secs(),
            max_repeats: self.plan.max_repeats(),
            current_count: self.plan.current_count(),
            device: self.session.as_ref().map(|s| s.descriptor().clone()),
        };
    }

    /// Publish the new state, then tell the listeners
    fn emit(&self, event: CaptureEvent) {
        self.publish();
        self.listeners.notify(event);
    }

    fn connect(&mut self, mut session: Box<dyn CameraSession>) -> SessionResult<()> {
        if self.session.is_some() {
            self.disconnect();
        }

        let device = session.descriptor().clone();
        info!(device = %device, endpoint = %device.url, "Connecting to camera");
        if let Err(e) = session.enter_recording_mode() {
            warn!(device = %device, error = %e, "Failed to enter recording mode");
            return Err(e);
        }

        self.session = Some(session);
        self.state = SchedulerState::Connected;
        self.publish();
        Ok(())
    }

    fn disconnect(&mut self) -> bool {
        if self.state == SchedulerState::Idle {
            debug!("Disconnect ignored, no session bound");
            return false;
        }
        if self.state == SchedulerState::Capturing {
            self.cancel();
        }

        if let Some(mut session) = self.session.take() {
            session.exit_recording_mode();
            info!(device = %session.descriptor(), "Disconnected from camera");
        }
        self.state = SchedulerState::Idle;
        self.publish();
        true
    }

    fn start(&mut self, period_secs: u32, max_repeats: u32) -> bool {
        if self.state != SchedulerState::Connected {
            debug!(state = %self.state, "Start ignored");
            return false;
        }
        let Some(plan) = CapturePlan::new(period_secs, max_repeats) else {
            debug!(period_secs, max_repeats, "Start ignored, empty plan");
            return false;
        };

        self.plan = plan;
        self.generation += 1;
        self.state = SchedulerState::Capturing;
        info!(period_secs, max_repeats, "Capture started");
        self.emit(CaptureEvent::Started {
            period_secs,
            max_repeats,
        });

        let origin = self.wake.now();
        self.tick(origin);
        true
    }

    fn modify(&mut self, period_secs: u32, max_repeats: u32) -> bool {
        if self.state == SchedulerState::Idle {
            debug!("Modify ignored, no session bound");
            return false;
        }
        if !self.plan.modify(period_secs, max_repeats) {
            debug!(period_secs, max_repeats, "Modify ignored, empty plan");
            return false;
        }

        info!(
            period_secs,
            max_repeats,
            current = self.plan.current_count(),
            "Capture plan modified"
        );
        self.publish();
        true
    }

    fn cancel(&mut self) -> bool {
        if self.state != SchedulerState::Capturing {
            debug!(state = %self.state, "Cancel ignored");
            return false;
        }

        self.wake.disarm();
        self.generation += 1;
        let taken = self.plan.current_count();
        // Only the count resets; period and max stay readable until the next start
        self.plan.reset();
        self.state = SchedulerState::Connected;
        info!(taken, max = self.plan.max_repeats(), "Capture canceled");
        self.emit(CaptureEvent::Canceled);
        true
    }

    fn set_focus_mode(&mut self, mode: &str) -> SessionResult<Value> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| gone(RemoteOperation::SetFocusMode))?;
        let ack = session.set_focus_mode(mode)?;
        info!(mode, "Focus mode set");
        Ok(ack)
    }

    fn list_capabilities(&mut self) -> SessionResult<Vec<String>> {
        self.session
            .as_mut()
            .ok_or_else(|| gone(RemoteOperation::ListCapabilities))?
            .list_capabilities()
    }

    fn on_wake(&mut self, generation: u64, deadline: Duration) {
        if generation != self.generation || self.state != SchedulerState::Capturing {
            debug!(generation, current = self.generation, "Dropping stale wake");
            return;
        }
        self.tick(deadline);
    }

    /// Run the tick scheduled for `scheduled`, then arm the next one
    fn tick(&mut self, scheduled: Duration) {
        if self.plan.is_complete() {
            self.finish();
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let outcome = session.take_picture();
        let current = self.plan.advance();
        let max = self.plan.max_repeats();
        match outcome {
            Ok(picture) => {
                info!(current, max, picture = picture.url(), "Picture taken");
                self.emit(CaptureEvent::PictureTaken { current, max });
            }
            Err(e) => {
                warn!(current, max, error = %e, "Capture tick failed");
                self.publish();
            }
        }

        if self.plan.is_complete() {
            self.finish();
        } else {
            self.arm(scheduled + self.plan.period());
        }
    }

    fn arm(&self, deadline: Duration) {
        let generation = self.generation;
        let commands = self.commands.clone();
        debug!(deadline_ms = deadline.as_millis() as u64, "Next tick armed");
        self.wake.arm(
            deadline,
            Box::new(move || {
                let _ = commands.send(Command::Wake {
                    generation,
                    deadline,
                });
            }),
        );
    }

    fn finish(&mut self) {
        self.wake.disarm();
        self.generation += 1;
        self.state = SchedulerState::Connected;
        info!(taken = self.plan.current_count(), "Capture finished");
        self.emit(CaptureEvent::Finished);
    }
}
