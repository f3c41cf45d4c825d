// SPDX-License-Identifier: GPL-3.0-only

//! SSDP search over UDP multicast
//!
//! One `M-SEARCH` datagram goes to the multicast group; responders answer
//! with a unicast HTTP-style response whose `LOCATION` header points at their
//! device description document.

use super::{SearchChannel, SearchReply, SearchTransport};
use crate::constants::{SSDP_MULTICAST_ADDR, SSDP_MX_SECONDS, SSDP_RECV_BUFFER, SSDP_SEARCH_TARGET};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::{debug, trace};

/// Build the `M-SEARCH` request for a search target
pub fn build_search_request(search_target: &str, mx: u32) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\
         \r\n",
        SSDP_MULTICAST_ADDR, mx, search_target
    )
}

/// Parse a search response datagram
///
/// Returns `None` for anything that is not a `200` response with a
/// `LOCATION` header. Header names are matched case-insensitively.
pub fn parse_search_reply(datagram: &str, address: IpAddr) -> Option<SearchReply> {
    let mut lines = datagram.lines();
    let status = lines.next()?.trim();
    let mut status_parts = status.split_whitespace();
    if !status_parts.next()?.starts_with("HTTP/") || status_parts.next()? != "200" {
        return None;
    }

    let mut reply = SearchReply {
        location: String::new(),
        address,
        search_target: None,
        usn: None,
    };

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match name.trim().to_ascii_uppercase().as_str() {
            "LOCATION" => reply.location = value,
            "ST" => reply.search_target = Some(value),
            "USN" => reply.usn = Some(value),
            _ => {}
        }
    }

    if reply.location.is_empty() {
        None
    } else {
        Some(reply)
    }
}

/// UDP multicast search transport
#[derive(Debug, Clone)]
pub struct SsdpTransport {
    group: String,
    search_target: String,
    mx: u32,
}

impl SsdpTransport {
    pub fn new(search_target: impl Into<String>) -> Self {
        Self {
            group: SSDP_MULTICAST_ADDR.to_string(),
            search_target: search_target.into(),
            mx: SSDP_MX_SECONDS,
        }
    }
}

impl Default for SsdpTransport {
    fn default() -> Self {
        Self::new(SSDP_SEARCH_TARGET)
    }
}

impl SearchTransport for SsdpTransport {
    type Channel = SsdpChannel;

    async fn open(&self) -> io::Result<SsdpChannel> {
        let socket = UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)).await?;
        socket.set_multicast_ttl_v4(4)?;

        let request = build_search_request(&self.search_target, self.mx);
        socket.send_to(request.as_bytes(), self.group.as_str()).await?;
        debug!(group = %self.group, st = %self.search_target, "Sent SSDP search");

        Ok(SsdpChannel {
            socket,
            search_target: self.search_target.clone(),
        })
    }
}

/// Socket listening for unicast search replies
pub struct SsdpChannel {
    socket: UdpSocket,
    search_target: String,
}

impl SearchChannel for SsdpChannel {
    async fn next_reply(&mut self) -> io::Result<SearchReply> {
        let mut buf = [0u8; SSDP_RECV_BUFFER];
        loop {
            let (len, from) = self.socket.recv_from(&mut buf).await?;
            let datagram = String::from_utf8_lossy(&buf[..len]);

            match parse_search_reply(&datagram, from.ip()) {
                Some(reply)
                    if reply
                        .search_target
                        .as_deref()
                        .is_none_or(|st| st == self.search_target) =>
                {
                    return Ok(reply);
                }
                _ => trace!(from = %from, "Ignoring unrelated SSDP datagram"),
            }
        }
    }
}
