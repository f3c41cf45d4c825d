// SPDX-License-Identifier: GPL-3.0-only

//! Error types for discovery, remote sessions and configuration

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type for remote session calls
pub type SessionResult<T> = Result<T, SessionError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Discovery could not run
    Discovery(DiscoveryError),
    /// A remote control call failed
    Session(SessionError),
    /// Configuration errors
    Config(ConfigError),
    /// No device matched the requested selection
    DeviceNotFound(String),
    /// Generic error with message
    Other(String),
}

/// Terminal error of a discovery run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The search socket could not be opened or the query could not be sent
    TransportUnavailable(String),
}

/// Remote operations issued against the control endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    EnterRecordingMode,
    ExitRecordingMode,
    SetFocusMode,
    TakePicture,
    AwaitPicture,
    ListCapabilities,
}

impl RemoteOperation {
    /// Method name on the wire
    pub fn method(&self) -> &'static str {
        match self {
            RemoteOperation::EnterRecordingMode => "startRecMode",
            RemoteOperation::ExitRecordingMode => "stopRecMode",
            RemoteOperation::SetFocusMode => "setFocusMode",
            RemoteOperation::TakePicture => "actTakePicture",
            RemoteOperation::AwaitPicture => "awaitTakePicture",
            RemoteOperation::ListCapabilities => "getAvailableApiList",
        }
    }
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// Underlying cause of a failed remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFailure {
    /// Connection refused, reset or otherwise not established
    Connection(String),
    /// No response within the request timeout
    Timeout,
    /// Response could not be understood
    Malformed(String),
    /// The camera answered with an error
    Remote { code: i64, message: String },
    /// The session has no live recording mode
    NotConnected,
}

/// A failed remote control call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub operation: RemoteOperation,
    pub cause: SessionFailure,
}

impl SessionError {
    pub fn new(operation: RemoteOperation, cause: SessionFailure) -> Self {
        Self { operation, cause }
    }

    /// Remote error code, if the camera reported one
    pub fn remote_code(&self) -> Option<i64> {
        match &self.cause {
            SessionFailure::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Reading or writing the file failed
    Io(String),
    /// The file exists but does not parse
    Parse(String),
    /// No config directory for this user
    NoConfigDir,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Discovery(e) => write!(f, "Discovery error: {}", e),
            AppError::Session(e) => write!(f, "Session error: {}", e),
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::TransportUnavailable(msg) => {
                write!(f, "Search transport unavailable: {}", msg)
            }
        }
    }
}

impl fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionFailure::Connection(msg) => write!(f, "connection failed: {}", msg),
            SessionFailure::Timeout => write!(f, "request timed out"),
            SessionFailure::Malformed(msg) => write!(f, "malformed response: {}", msg),
            SessionFailure::Remote { code, message } => {
                write!(f, "camera reported error {}: {}", code, message)
            }
            SessionFailure::NotConnected => write!(f, "not in recording mode"),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.cause)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::NoConfigDir => write!(f, "No config directory available"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for DiscoveryError {}
impl std::error::Error for SessionFailure {}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl std::error::Error for ConfigError {}

impl From<DiscoveryError> for AppError {
    fn from(err: DiscoveryError) -> Self {
        AppError::Discovery(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display_names_operation() {
        let err = SessionError::new(
            RemoteOperation::TakePicture,
            SessionFailure::Remote {
                code: 1,
                message: "Any".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "actTakePicture failed: camera reported error 1: Any"
        );
        assert_eq!(err.remote_code(), Some(1));
    }

    #[test]
    fn test_remote_code_absent_for_transport_failures() {
        let err = SessionError::new(RemoteOperation::EnterRecordingMode, SessionFailure::Timeout);
        assert_eq!(err.remote_code(), None);
    }
}
