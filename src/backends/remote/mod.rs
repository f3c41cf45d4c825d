// SPDX-License-Identifier: GPL-3.0-only

//! Remote control session with one camera
//!
//! Every call is a single blocking round trip to the control endpoint.
//! Failures of any kind (connection, timeout, malformed answer, error code
//! reported by the camera) surface uniformly as [`SessionError`]. Nothing is
//! retried here; the caller decides what a failure means.

pub mod rpc;

pub use rpc::{HttpRpcTransport, RpcRequest, RpcResponse, RpcTransport, TransportError};

use crate::backends::types::{DeviceDescriptor, PictureRef, SessionMode};
use crate::constants::RPC_STILL_CAPTURING;
use crate::errors::{RemoteOperation, SessionError, SessionFailure, SessionResult};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Remote-control operations the capture scheduler drives
pub trait CameraSession: Send {
    /// Device this session is bound to
    fn descriptor(&self) -> &DeviceDescriptor;

    fn mode(&self) -> SessionMode;

    /// Switch the camera into remote shooting mode
    fn enter_recording_mode(&mut self) -> SessionResult<()>;

    /// Leave remote shooting mode; failures are logged and the session
    /// ends up disconnected regardless
    fn exit_recording_mode(&mut self);

    /// Returns the camera's acknowledgement payload
    fn set_focus_mode(&mut self, mode: &str) -> SessionResult<Value>;

    /// Trigger one shot
    fn take_picture(&mut self) -> SessionResult<PictureRef>;

    /// Remote operations the camera currently accepts
    fn list_capabilities(&mut self) -> SessionResult<Vec<String>>;
}

/// Session speaking JSON-RPC over an injected transport
pub struct RemoteCameraSession<T: RpcTransport = HttpRpcTransport> {
    device: DeviceDescriptor,
    transport: T,
    mode: SessionMode,
    next_id: u64,
}

impl RemoteCameraSession {
    /// Session over HTTP with the given request timeout
    pub fn connect_http(device: DeviceDescriptor, timeout: Duration) -> Self {
        Self::new(device, HttpRpcTransport::new(timeout))
    }
}

impl<T: RpcTransport> RemoteCameraSession<T> {
    pub fn new(device: DeviceDescriptor, transport: T) -> Self {
        Self {
            device,
            transport,
            mode: SessionMode::Disconnected,
            next_id: 1,
        }
    }

    /// Issue one call and return its `result` array
    fn call(&mut self, operation: RemoteOperation, params: Vec<Value>) -> SessionResult<Vec<Value>> {
        let request = RpcRequest::new(operation.method(), params, self.next_id);
        self.next_id += 1;

        let response = self
            .transport
            .call(&self.device.url, &request)
            .map_err(|e| SessionError::new(operation, transport_failure(e)))?;

        if let Some((code, message)) = response.error {
            debug!(%operation, code, message = %message, "Camera returned error");
            return Err(SessionError::new(
                operation,
                SessionFailure::Remote { code, message },
            ));
        }

        response.result.ok_or_else(|| {
            SessionError::new(
                operation,
                SessionFailure::Malformed("response has neither result nor error".to_string()),
            )
        })
    }

    fn require_recording_mode(&self, operation: RemoteOperation) -> SessionResult<()> {
        if self.mode == SessionMode::RecordingModeActive {
            Ok(())
        } else {
            Err(SessionError::new(operation, SessionFailure::NotConnected))
        }
    }
}

fn transport_failure(err: TransportError) -> SessionFailure {
    match err {
        TransportError::Connection(msg) => SessionFailure::Connection(msg),
        TransportError::Timeout => SessionFailure::Timeout,
        TransportError::Malformed(msg) => SessionFailure::Malformed(msg),
    }
}

/// Pull the first postview URL out of a picture result (`[["url", ...]]`)
fn picture_from_result(operation: RemoteOperation, result: &[Value]) -> SessionResult<PictureRef> {
    result
        .first()
        .and_then(Value::as_array)
        .and_then(|urls| urls.first())
        .and_then(Value::as_str)
        .map(|url| PictureRef(url.to_string()))
        .ok_or_else(|| {
            SessionError::new(
                operation,
                SessionFailure::Malformed("picture result has no URL".to_string()),
            )
        })
}

impl<T: RpcTransport> CameraSession for RemoteCameraSession<T> {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.device
    }

    fn mode(&self) -> SessionMode {
        self.mode
    }

    fn enter_recording_mode(&mut self) -> SessionResult<()> {
        self.call(RemoteOperation::EnterRecordingMode, Vec::new())?;
        self.mode = SessionMode::RecordingModeActive;
        info!(device = %self.device, "Recording mode active");
        Ok(())
    }

    fn exit_recording_mode(&mut self) {
        if let Err(e) = self.call(RemoteOperation::ExitRecordingMode, Vec::new()) {
            warn!(device = %self.device, error = %e, "Failed to leave recording mode");
        }
        self.mode = SessionMode::Disconnected;
    }

    fn set_focus_mode(&mut self, mode: &str) -> SessionResult<Value> {
        self.require_recording_mode(RemoteOperation::SetFocusMode)?;
        let result = self.call(
            RemoteOperation::SetFocusMode,
            vec![Value::String(mode.to_string())],
        )?;
        Ok(result.into_iter().next().unwrap_or(Value::Null))
    }

    fn take_picture(&mut self) -> SessionResult<PictureRef> {
        self.require_recording_mode(RemoteOperation::TakePicture)?;
        match self.call(RemoteOperation::TakePicture, Vec::new()) {
            Ok(result) => picture_from_result(RemoteOperation::TakePicture, &result),
            // The shot was taken but is still being written; collect it.
            Err(e) if e.remote_code() == Some(RPC_STILL_CAPTURING) => {
                debug!("Picture still processing, awaiting result");
                let result = self.call(RemoteOperation::AwaitPicture, Vec::new())?;
                picture_from_result(RemoteOperation::AwaitPicture, &result)
            }
            Err(e) => Err(e),
        }
    }

    fn list_capabilities(&mut self) -> SessionResult<Vec<String>> {
        let result = self.call(RemoteOperation::ListCapabilities, Vec::new())?;
        Ok(result
            .first()
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}
