// SPDX-License-Identifier: GPL-3.0-only

//! Wake sources for the capture scheduler
//!
//! A wake source keeps a single pending deadline and invokes a callback once
//! it passes. Deadlines are measured on a clock that keeps counting while the
//! host is suspended, so a plan resumes on its planned cadence after a
//! suspend instead of slipping by the time spent asleep.
//!
//! The callback runs on the wake source's own thread. It must only hand the
//! wake over to the scheduler's serial context, never touch scheduler state.

use crate::constants::WAKE_POLL_SLICE;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Callback invoked when a deadline passes
pub type WakeCallback = Box<dyn FnOnce() + Send + 'static>;

/// Clock plus one re-armable wake-up
pub trait WakeSource: Send + Sync {
    /// Current time on the wake clock
    fn now(&self) -> Duration;

    /// Arm a wake at `deadline`, replacing any pending one
    ///
    /// A deadline already in the past fires as soon as possible.
    fn arm(&self, deadline: Duration, on_wake: WakeCallback);

    /// Drop the pending wake, if any
    fn disarm(&self);
}

struct PendingWake {
    deadline: Duration,
    on_wake: WakeCallback,
}

/// Time since an arbitrary point, used where no boot clock is available
fn process_clock_now() -> Duration {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    ORIGIN.get_or_init(Instant::now).elapsed()
}

/// Time since boot, including time spent suspended
#[cfg(target_os = "linux")]
pub fn boot_clock_now() -> Duration {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let result = unsafe { libc::clock_gettime(libc::CLOCK_BOOTTIME, &mut ts) };
    if result == 0 {
        Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
    } else {
        process_clock_now()
    }
}

#[cfg(not(target_os = "linux"))]
pub fn boot_clock_now() -> Duration {
    process_clock_now()
}

/// Kernel alarm that resumes a suspended host at the deadline
///
/// Requires `CAP_WAKE_ALARM`; without it the wake source still fires after
/// the host resumes for another reason.
#[cfg(target_os = "linux")]
struct HostAlarm {
    fd: std::os::fd::OwnedFd,
}

#[cfg(target_os = "linux")]
impl HostAlarm {
    fn open() -> Option<Self> {
        use std::os::fd::FromRawFd;

        let fd = unsafe {
            libc::timerfd_create(
                libc::CLOCK_BOOTTIME_ALARM,
                libc::TFD_CLOEXEC | libc::TFD_NONBLOCK,
            )
        };
        if fd < 0 {
            debug!(
                error = %std::io::Error::last_os_error(),
                "Host wake alarm unavailable, wakes fire after resume"
            );
            return None;
        }
        Some(Self {
            fd: unsafe { std::os::fd::OwnedFd::from_raw_fd(fd) },
        })
    }

    fn set(&self, deadline: Duration) {
        // An all-zero value disarms the timer.
        let deadline = deadline.max(Duration::from_nanos(1));
        self.settime(libc::timespec {
            tv_sec: deadline.as_secs() as _,
            tv_nsec: deadline.subsec_nanos() as _,
        });
    }

    fn clear(&self) {
        self.settime(libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        });
    }

    fn settime(&self, value: libc::timespec) {
        use std::os::fd::AsRawFd;

        let spec = libc::itimerspec {
            it_interval: libc::timespec {
                tv_sec: 0,
                tv_nsec: 0,
            },
            it_value: value,
        };
        let result = unsafe {
            libc::timerfd_settime(
                self.fd.as_raw_fd(),
                libc::TFD_TIMER_ABSTIME,
                &spec,
                std::ptr::null_mut(),
            )
        };
        if result < 0 {
            warn!(error = %std::io::Error::last_os_error(), "Failed to program host wake alarm");
        }
    }
}

struct WakeShared {
    pending: Mutex<Option<PendingWake>>,
    changed: Condvar,
    shutdown: AtomicBool,
    #[cfg(target_os = "linux")]
    alarm: Option<HostAlarm>,
}

/// Wake source backed by the boot clock and a dedicated timer thread
pub struct SystemWakeSource {
    shared: Arc<WakeShared>,
    thread: Option<JoinHandle<()>>,
}

impl SystemWakeSource {
    pub fn new() -> Self {
        let shared = Arc::new(WakeShared {
            pending: Mutex::new(None),
            changed: Condvar::new(),
            shutdown: AtomicBool::new(false),
            #[cfg(target_os = "linux")]
            alarm: HostAlarm::open(),
        });

        let thread_shared = Arc::clone(&shared);
        let thread = thread::spawn(move || run_timer(thread_shared));

        Self {
            shared,
            thread: Some(thread),
        }
    }
}

impl Default for SystemWakeSource {
    fn default() -> Self {
        Self::new()
    }
}

fn run_timer(shared: Arc<WakeShared>) {
    debug!("Wake timer thread started");
    let mut pending = shared.pending.lock().unwrap_or_else(PoisonError::into_inner);

    while !shared.shutdown.load(Ordering::SeqCst) {
        let Some(deadline) = pending.as_ref().map(|wake| wake.deadline) else {
            pending = shared
                .changed
                .wait_timeout(pending, WAKE_POLL_SLICE)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
            continue;
        };

        let now = boot_clock_now();
        if now >= deadline {
            if let Some(wake) = pending.take() {
                drop(pending);
                trace!(deadline_ms = deadline.as_millis() as u64, "Wake deadline reached");
                (wake.on_wake)();
                pending = shared.pending.lock().unwrap_or_else(PoisonError::into_inner);
            }
            continue;
        }

        // Sliced so time spent suspended is noticed promptly after resume.
        let wait = (deadline - now).min(WAKE_POLL_SLICE);
        pending = shared
            .changed
            .wait_timeout(pending, wait)
            .unwrap_or_else(PoisonError::into_inner)
            .0;
    }

    debug!("Wake timer thread exiting");
}

impl WakeSource for SystemWakeSource {
    fn now(&self) -> Duration {
        boot_clock_now()
    }

    fn arm(&self, deadline: Duration, on_wake: WakeCallback) {
        let mut pending = self.shared.pending.lock().unwrap_or_else(PoisonError::into_inner);
        *pending = Some(PendingWake { deadline, on_wake });
        #[cfg(target_os = "linux")]
        if let Some(alarm) = &self.shared.alarm {
            alarm.set(deadline);
        }
        self.shared.changed.notify_one();
    }

    fn disarm(&self) {
        let mut pending = self.shared.pending.lock().unwrap_or_else(PoisonError::into_inner);
        *pending = None;
        #[cfg(target_os = "linux")]
        if let Some(alarm) = &self.shared.alarm {
            alarm.clear();
        }
        self.shared.changed.notify_one();
    }
}

impl Drop for SystemWakeSource {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.changed.notify_one();
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            warn!("Wake timer thread panicked");
        }
    }
}

/// Wake source driven by hand, for deterministic tests and simulations
///
/// Time only moves when told to; [`fire`](Self::fire) jumps to the pending
/// deadline and runs its callback on the calling thread.
#[derive(Default)]
pub struct ManualWakeSource {
    now: Mutex<Duration>,
    pending: Mutex<Option<PendingWake>>,
    armed: Mutex<Vec<Duration>>,
}

impl ManualWakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward without firing anything
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }

    pub fn pending_deadline(&self) -> Option<Duration> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|wake| wake.deadline)
    }

    /// Every deadline armed so far, in order
    pub fn armed_deadlines(&self) -> Vec<Duration> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Advance to the pending deadline and fire it
    ///
    /// Returns the deadline fired, or `None` if nothing was armed.
    pub fn fire(&self) -> Option<Duration> {
        let wake = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take()?;
        {
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            *now = (*now).max(wake.deadline);
        }
        (wake.on_wake)();
        Some(wake.deadline)
    }
}

impl WakeSource for ManualWakeSource {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm(&self, deadline: Duration, on_wake: WakeCallback) {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner).push(deadline);
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(PendingWake { deadline, on_wake });
    }

    fn disarm(&self) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
