// SPDX-License-Identifier: GPL-3.0-only

//! Network camera backends
//!
//! This module provides the two network-facing halves of the application:
//! - Discovery of cameras on the local network (SSDP search + description fetch)
//! - Remote control of one discovered camera over its JSON-RPC endpoint
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Controller facade              │
//! └──────────┬──────────────────────┬───────────┘
//!            │                      │
//! ┌──────────┴──────────┐  ┌────────┴───────────┐
//! │   DiscoveryClient   │  │ RemoteCameraSession │
//! │  SearchTransport    │  │    RpcTransport     │
//! │  DescriptionFetcher │  │                     │
//! └─────────────────────┘  └─────────────────────┘
//! ```
//!
//! Transports are injected capabilities, so everything above the socket and
//! HTTP layer can be exercised with in-memory fakes.
//!
//! # Modules
//!
//! - [`discovery`]: bounded-time search yielding [`DeviceDescriptor`]s
//! - [`remote`]: control session bound to one descriptor
//! - [`types`]: shared value types

pub mod discovery;
pub mod remote;
pub mod types;

pub use types::*;
