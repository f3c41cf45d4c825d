// SPDX-License-Identifier: GPL-3.0-only

//! In-memory discovery transport and description fetcher shared by the
//! integration tests

#![allow(dead_code)]

use camera_timelapse::backends::discovery::{
    DescriptionFetcher, SearchChannel, SearchReply, SearchTransport,
};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::IpAddr;
use std::time::Duration;

/// Description document of a camera whose control endpoint is
/// `http://<ip>:10000/sony/camera`
pub fn description_xml(name: &str, ip: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <device>
    <friendlyName>{name}</friendlyName>
    <modelName>SonyImagingDevice</modelName>
    <av:X_ScalarWebAPI_DeviceInfo xmlns:av="urn:schemas-sony-com:av">
      <av:X_ScalarWebAPI_ServiceList>
        <av:X_ScalarWebAPI_Service>
          <av:X_ScalarWebAPI_ServiceType>camera</av:X_ScalarWebAPI_ServiceType>
          <av:X_ScalarWebAPI_ActionList_URL>http://{ip}:10000/sony</av:X_ScalarWebAPI_ActionList_URL>
        </av:X_ScalarWebAPI_Service>
      </av:X_ScalarWebAPI_ServiceList>
    </av:X_ScalarWebAPI_DeviceInfo>
  </device>
</root>"#
    )
}

pub fn reply(location: &str, ip: &str) -> SearchReply {
    SearchReply {
        location: location.to_string(),
        address: ip.parse::<IpAddr>().unwrap(),
        search_target: Some("urn:schemas-sony-com:service:ScalarWebAPI:1".to_string()),
        usn: None,
    }
}

/// Delivers a fixed list of replies, then stays silent
#[derive(Default)]
pub struct FakeTransport {
    pub replies: Vec<SearchReply>,
    pub fail_open: bool,
}

impl FakeTransport {
    pub fn with_replies(replies: Vec<SearchReply>) -> Self {
        Self {
            replies,
            fail_open: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            replies: Vec::new(),
            fail_open: true,
        }
    }
}

pub struct FakeChannel {
    replies: VecDeque<SearchReply>,
}

impl SearchTransport for FakeTransport {
    type Channel = FakeChannel;

    async fn open(&self) -> io::Result<FakeChannel> {
        if self.fail_open {
            return Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no multicast route",
            ));
        }
        Ok(FakeChannel {
            replies: self.replies.iter().cloned().collect(),
        })
    }
}

impl SearchChannel for FakeChannel {
    async fn next_reply(&mut self) -> io::Result<SearchReply> {
        match self.replies.pop_front() {
            Some(reply) => Ok(reply),
            None => std::future::pending().await,
        }
    }
}

/// Serves description documents by location; unknown locations fail
#[derive(Default)]
pub struct FakeFetcher {
    pub documents: HashMap<String, String>,
    pub delays: HashMap<String, Duration>,
}

impl FakeFetcher {
    pub fn serve(mut self, location: &str, document: String) -> Self {
        self.documents.insert(location.to_string(), document);
        self
    }

    pub fn delay(mut self, location: &str, delay: Duration) -> Self {
        self.delays.insert(location.to_string(), delay);
        self
    }
}

impl DescriptionFetcher for FakeFetcher {
    async fn fetch(&self, location: &str) -> Result<String, String> {
        if let Some(delay) = self.delays.get(location) {
            tokio::time::sleep(*delay).await;
        }
        self.documents
            .get(location)
            .cloned()
            .ok_or_else(|| format!("connection refused: {}", location))
    }
}
