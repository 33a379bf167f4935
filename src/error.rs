// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Crate-wide error taxonomy.
//!
//! Construction errors surface to the caller of [`crate::engine::GossipEngine::new`].
//! Runtime errors (`TransportError`, `WireError`) are mostly handled internally
//! per the error taxonomy in the design document; they're typed so the engine
//! can log and count them instead of matching on `io::Error::kind()` ad hoc.

use std::io;
use thiserror::Error;

/// Errors that can occur while constructing a [`crate::engine::GossipEngine`].
#[derive(Debug, Error)]
pub enum GossipError {
    /// The configured listen address could not be parsed.
    #[error("invalid listen address {addr:?}: {source}")]
    InvalidListenAddress {
        /// The offending address string.
        addr: String,
        /// Underlying parse error.
        source: std::net::AddrParseError,
    },
    /// Socket creation, option, or bind failed.
    #[error("failed to bind UDP socket: {0}")]
    Bind(#[source] io::Error),
    /// Reading the bound local address back from the socket failed.
    #[error("failed to read local socket address: {0}")]
    LocalAddr(#[source] io::Error),
    /// The bound local address is not IPv4 (the wire identity format is IPv4-only).
    #[error("local address {0} is not IPv4")]
    NotIpv4(std::net::SocketAddr),
    /// The metrics registry failed to construct.
    #[error("failed to construct metrics: {0}")]
    Metrics(#[from] crate::metrics::MetricsError),
}

/// Errors classified on the transceiver's hot paths.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A batched send failed. The outbound batch is left intact so a later
    /// flush can retry draining it.
    #[error("send failed: {0}")]
    Send(#[source] io::Error),
    /// A batched receive failed. Treated as fatal to the receive worker.
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
}

/// Errors from decoding a wire [`crate::wire::Event`].
#[derive(Debug, Error)]
pub enum WireError {
    /// The datagram did not parse as a well-formed `Event`.
    #[error("malformed event: {0}")]
    Decode(#[source] prost::DecodeError),
}
