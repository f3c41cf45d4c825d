// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// SSDP multicast group and port used for camera discovery
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// Search target advertised by cameras exposing the remote control API
pub const SSDP_SEARCH_TARGET: &str = "urn:schemas-sony-com:service:ScalarWebAPI:1";

/// Maximum wait (seconds) a responder may delay its reply, sent in the MX header
pub const SSDP_MX_SECONDS: u32 = 1;

/// Largest SSDP datagram we are prepared to read
pub const SSDP_RECV_BUFFER: usize = 1024;

/// Service type in the device description that carries the capture commands
pub const CAMERA_SERVICE_TYPE: &str = "camera";

/// Remote API protocol version sent with every request
pub const RPC_VERSION: &str = "1.0";

/// Remote error code meaning the shot is still being processed
pub const RPC_STILL_CAPTURING: i64 = 40403;

/// Default discovery window
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-request HTTP timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default capture period in seconds
pub const DEFAULT_PERIOD_SECS: u32 = 10;

/// Default number of pictures per plan
pub const DEFAULT_REPEATS: u32 = 60;

/// Longest the wake thread sleeps before re-reading the boot clock.
///
/// Condition variables measure time on a clock that stops while the host is
/// suspended, so long sleeps are sliced and re-checked against the boot clock.
pub const WAKE_POLL_SLICE: Duration = Duration::from_millis(250);

/// Directory name under the user config dir
pub const CONFIG_DIR_NAME: &str = "camera-timelapse";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.json";
