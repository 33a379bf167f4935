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

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! A small epidemic (gossip) broadcast engine over raw UDP.
//!
//! Every node runs a fixed-fanout push protocol: publish a message once,
//! and it reaches the whole network through repeated random rebroadcast,
//! with a tracker suppressing re-delivery of anything already seen. There
//! is no membership protocol, no persisted state, and no authentication —
//! this crate assumes a trusted, pre-provisioned neighbourhood and is
//! deliberately silent on anything above "deliver this payload everywhere
//! once".

/// Construction-time configuration for a [`GossipEngine`](engine::GossipEngine).
pub mod config;
/// The gossip engine: ingest, dedupe, deliver, rebroadcast, publish.
pub mod engine;
/// Error types surfaced across the crate's public API.
pub mod error;
/// Wire identity derived from a node's bound socket address.
pub mod identity;
/// Observability: Prometheus metrics for the engine's hot paths.
pub mod metrics;
/// The neighbourhood a node gossips to, and k-of-n sampling over it.
pub mod nodelist;
/// Bounded-time retention tracker of previously observed event fingerprints.
pub mod tracker;
/// The batched UDP transceiver.
pub mod transport;
/// The wire codec: a tagged, forward-compatible event envelope.
pub mod wire;

pub use config::GossipConfig;
pub use engine::GossipEngine;
pub use error::{GossipError, TransportError, WireError};
