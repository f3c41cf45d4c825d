// SPDX-License-Identifier: GPL-3.0-only

//! JSON-RPC envelope spoken by the camera's control endpoint
//!
//! Requests are `{"method", "params", "id", "version"}`; responses carry
//! either `result` (an array) or `error` (`[code, message]`).

use crate::constants::RPC_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{trace, warn};

/// One remote call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
    pub version: String,
}

impl RpcRequest {
    pub fn new(method: &str, params: Vec<Value>, id: u64) -> Self {
        Self {
            method: method.to_string(),
            params,
            id,
            version: RPC_VERSION.to_string(),
        }
    }
}

/// Response to one remote call
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Vec<Value>>,
    #[serde(default)]
    pub error: Option<(i64, String)>,
}

/// Transport-level failure, before any response could be interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Could not reach the endpoint
    Connection(String),
    /// No answer within the request timeout
    Timeout,
    /// Answer was not a valid response envelope
    Malformed(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Connection(msg) => write!(f, "connection failed: {}", msg),
            TransportError::Timeout => write!(f, "request timed out"),
            TransportError::Malformed(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// Request/response channel to a control endpoint
///
/// Calls block for the full round trip.
pub trait RpcTransport: Send {
    fn call(&self, endpoint: &str, request: &RpcRequest) -> Result<RpcResponse, TransportError>;
}

/// JSON-over-HTTP transport
///
/// The blocking client owns an internal runtime, so it is built on first use
/// on the thread that issues the calls rather than at construction time.
pub struct HttpRpcTransport {
    timeout: Duration,
    client: OnceLock<Result<reqwest::blocking::Client, String>>,
}

impl HttpRpcTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, TransportError> {
        self.client
            .get_or_init(|| {
                reqwest::blocking::Client::builder()
                    .timeout(self.timeout)
                    .build()
                    .map_err(|e| {
                        warn!(error = %e, "Failed to build HTTP client for remote calls");
                        e.to_string()
                    })
            })
            .as_ref()
            .map_err(|msg| TransportError::Connection(format!("HTTP client unavailable: {}", msg)))
    }
}

impl RpcTransport for HttpRpcTransport {
    fn call(&self, endpoint: &str, request: &RpcRequest) -> Result<RpcResponse, TransportError> {
        trace!(endpoint, method = %request.method, id = request.id, "Sending remote call");

        let response = self
            .client()?
            .post(endpoint)
            .json(request)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(map_reqwest_error)?;

        response.json::<RpcResponse>().map_err(map_reqwest_error)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_decode() || err.is_body() {
        TransportError::Malformed(err.to_string())
    } else {
        TransportError::Connection(err.to_string())
    }
}
