// SPDX-License-Identifier: GPL-3.0-only

//! Device description documents
//!
//! The description is a small UPnP XML document. Only a handful of elements
//! matter here, so they are located by local name regardless of namespace.

use super::DescriptionFetcher;
use crate::constants::CAMERA_SERVICE_TYPE;
use roxmltree::{Document, Node};
use std::time::Duration;
use tracing::{debug, warn};

/// One remote API service advertised by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiService {
    pub service_type: String,
    pub action_list_url: String,
}

/// The parts of a device description this application uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescription {
    pub friendly_name: String,
    pub model_name: Option<String>,
    pub udn: Option<String>,
    pub services: Vec<ApiService>,
}

impl DeviceDescription {
    /// Parse a description document
    ///
    /// Fails when the document is not well-formed XML or has no `friendlyName`.
    pub fn parse(xml: &str) -> Result<Self, String> {
        let document =
            Document::parse(xml).map_err(|e| format!("Malformed description: {}", e))?;
        let root = document.root_element();

        let friendly_name = element_text(root, "friendlyName")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| "description has no friendlyName".to_string())?;

        let services = elements(root, "X_ScalarWebAPI_Service")
            .filter_map(|block| {
                Some(ApiService {
                    service_type: element_text(block, "X_ScalarWebAPI_ServiceType")?,
                    action_list_url: element_text(block, "X_ScalarWebAPI_ActionList_URL")?,
                })
            })
            .collect();

        Ok(Self {
            friendly_name,
            model_name: element_text(root, "modelName"),
            udn: element_text(root, "UDN"),
            services,
        })
    }

    /// Action list URL of a service, if advertised
    pub fn action_list_url(&self, service_type: &str) -> Option<&str> {
        self.services
            .iter()
            .find(|s| s.service_type == service_type)
            .map(|s| s.action_list_url.as_str())
    }

    /// Endpoint accepting the capture commands
    pub fn control_endpoint(&self) -> Option<String> {
        self.action_list_url(CAMERA_SERVICE_TYPE)
            .map(|url| format!("{}/{}", url.trim_end_matches('/'), CAMERA_SERVICE_TYPE))
    }
}

/// Elements below `scope` with the given local name, in document order
fn elements<'a, 'input>(
    scope: Node<'a, 'input>,
    local_name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    scope
        .descendants()
        .filter(move |node| node.is_element() && node.tag_name().name() == local_name)
}

/// Trimmed text of the first element with the given local name
fn element_text(scope: Node<'_, '_>, local_name: &str) -> Option<String> {
    elements(scope, local_name).next().map(|node| {
        node.descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect::<String>()
            .trim()
            .to_string()
    })
}

/// Fetches description documents over HTTP
#[derive(Debug, Clone)]
pub struct HttpDescriptionFetcher {
    client: Result<reqwest::Client, String>,
}

impl HttpDescriptionFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                warn!(error = %e, "Failed to build HTTP client for descriptions");
                format!("HTTP client unavailable: {}", e)
            });
        Self { client }
    }
}

impl DescriptionFetcher for HttpDescriptionFetcher {
    async fn fetch(&self, location: &str) -> Result<String, String> {
        debug!(location, "Fetching device description");
        let client = self.client.as_ref().map_err(Clone::clone)?;
        let response = client
            .get(location)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| format!("Failed to fetch description: {}", e))?;

        response
            .text()
            .await
            .map_err(|e| format!("Failed to read description: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0" xmlns:av="urn:schemas-sony-com:av">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:Basic:1</deviceType>
    <friendlyName>DSC-QX10</friendlyName>
    <manufacturer>Sony Corporation</manufacturer>
    <modelName>SonyImagingDevice</modelName>
    <UDN>uuid:00000000-0005-0010-8000-10a5d0a3b1c6</UDN>
    <av:X_ScalarWebAPI_DeviceInfo xmlns:av="urn:schemas-sony-com:av">
      <av:X_ScalarWebAPI_Version>1.0</av:X_ScalarWebAPI_Version>
      <av:X_ScalarWebAPI_ServiceList>
        <av:X_ScalarWebAPI_Service>
          <av:X_ScalarWebAPI_ServiceType>guide</av:X_ScalarWebAPI_ServiceType>
          <av:X_ScalarWebAPI_ActionList_URL>http://10.0.0.1:10000/sony</av:X_ScalarWebAPI_ActionList_URL>
        </av:X_ScalarWebAPI_Service>
        <av:X_ScalarWebAPI_Service>
          <av:X_ScalarWebAPI_ServiceType>camera</av:X_ScalarWebAPI_ServiceType>
          <av:X_ScalarWebAPI_ActionList_URL>http://10.0.0.1:10000/sony/</av:X_ScalarWebAPI_ActionList_URL>
        </av:X_ScalarWebAPI_Service>
      </av:X_ScalarWebAPI_ServiceList>
    </av:X_ScalarWebAPI_DeviceInfo>
  </device>
</root>"#;

    #[test]
    fn test_parse_description() {
        let description = DeviceDescription::parse(DESCRIPTION).unwrap();
        assert_eq!(description.friendly_name, "DSC-QX10");
        assert_eq!(description.model_name.as_deref(), Some("SonyImagingDevice"));
        assert_eq!(description.services.len(), 2);
        assert_eq!(
            description.control_endpoint().as_deref(),
            Some("http://10.0.0.1:10000/sony/camera")
        );
    }

    #[test]
    fn test_missing_friendly_name_is_error() {
        assert!(DeviceDescription::parse("<root><device></device></root>").is_err());
        assert!(DeviceDescription::parse("not xml at all").is_err());
    }

    #[test]
    fn test_no_camera_service_has_no_endpoint() {
        let xml = "<root><device><friendlyName>Speaker &amp; Co</friendlyName></device></root>";
        let description = DeviceDescription::parse(xml).unwrap();
        assert_eq!(description.friendly_name, "Speaker & Co");
        assert_eq!(description.control_endpoint(), None);
    }

    #[test]
    fn test_self_closing_friendly_name_is_error() {
        assert!(DeviceDescription::parse("<root><friendlyName/></root>").is_err());
    }

    #[test]
    fn test_commented_out_elements_are_ignored() {
        let xml = r#"<root xmlns:av="urn:schemas-sony-com:av"><device>
            <!-- <friendlyName>OLD</friendlyName> -->
            <friendlyName>QX10</friendlyName>
            <!--
            <av:X_ScalarWebAPI_Service>
              <av:X_ScalarWebAPI_ServiceType>camera</av:X_ScalarWebAPI_ServiceType>
              <av:X_ScalarWebAPI_ActionList_URL>http://10.0.0.9/sony</av:X_ScalarWebAPI_ActionList_URL>
            </av:X_ScalarWebAPI_Service>
            -->
        </device></root>"#;
        let description = DeviceDescription::parse(xml).unwrap();
        assert_eq!(description.friendly_name, "QX10");
        assert!(description.services.is_empty());
        assert_eq!(description.control_endpoint(), None);
    }

    #[test]
    fn test_character_references_are_decoded() {
        let xml = "<root><device><friendlyName>Tom&#39;s QX10 &#x26; more</friendlyName></device></root>";
        let description = DeviceDescription::parse(xml).unwrap();
        assert_eq!(description.friendly_name, "Tom's QX10 & more");
    }

    #[test]
    fn test_cdata_text_is_unwrapped() {
        let xml = "<root><device><friendlyName><![CDATA[QX<10>]]></friendlyName></device></root>";
        let description = DeviceDescription::parse(xml).unwrap();
        assert_eq!(description.friendly_name, "QX<10>");
    }

    #[tokio::test]
    async fn test_unbuilt_client_fails_fetch() {
        let fetcher = HttpDescriptionFetcher {
            client: Err("HTTP client unavailable: no TLS backend".to_string()),
        };
        let err = fetcher
            .fetch("http://10.0.0.1:64321/dd.xml")
            .await
            .unwrap_err();
        assert!(err.contains("no TLS backend"));
    }
}
