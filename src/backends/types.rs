// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for network camera backends

use serde::{Deserialize, Serialize};

/// A camera found by discovery
///
/// The identifier is only stable for one discovery run. The serialized form
/// (`{id, friendlyName, url, ip}`) is what gets handed across process
/// boundaries, so field names are fixed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub id: u32,
    pub friendly_name: String,
    /// Control endpoint accepting remote-control requests
    pub url: String,
    /// Address the discovery reply came from
    pub ip: String,
}

impl DeviceDescriptor {
    pub fn new(
        id: u32,
        friendly_name: impl Into<String>,
        url: impl Into<String>,
        ip: impl Into<String>,
    ) -> Self {
        Self {
            id,
            friendly_name: friendly_name.into(),
            url: url.into(),
            ip: ip.into(),
        }
    }

    /// Control endpoint address
    pub fn control_endpoint(&self) -> &str {
        &self.url
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.friendly_name, self.ip)
    }
}

/// Connection mode of a remote session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionMode {
    #[default]
    Disconnected,
    RecordingModeActive,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::Disconnected => write!(f, "disconnected"),
            SessionMode::RecordingModeActive => write!(f, "recording mode"),
        }
    }
}

/// Handle to a picture stored on the camera (its postview URL)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureRef(pub String);

impl PictureRef {
    pub fn url(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_serialized_field_names() {
        let device = DeviceDescriptor::new(3, "DSC-QX10", "http://10.0.0.1:10000/sony/camera", "10.0.0.1");
        let value: serde_json::Value = serde_json::from_str(&device.to_json().unwrap()).unwrap();

        assert_eq!(value["id"], 3);
        assert_eq!(value["friendlyName"], "DSC-QX10");
        assert_eq!(value["url"], "http://10.0.0.1:10000/sony/camera");
        assert_eq!(value["ip"], "10.0.0.1");
    }

    #[test]
    fn test_descriptor_from_handoff_json() {
        let json = r#"{"id":0,"friendlyName":"ILCE-6000","url":"http://192.168.122.1:8080/sony/camera","ip":"192.168.122.1"}"#;
        let device = DeviceDescriptor::from_json(json).unwrap();
        assert_eq!(device.friendly_name, "ILCE-6000");
        assert_eq!(device.control_endpoint(), "http://192.168.122.1:8080/sony/camera");
    }

    #[test]
    fn test_descriptor_rejects_missing_fields() {
        assert!(DeviceDescriptor::from_json(r#"{"id":1,"friendlyName":"x"}"#).is_err());
    }
}
