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

//! Observability: Prometheus metrics for the gossip engine's hot paths.
//!
//! Purely observational — nothing here affects correctness. Exporting the
//! registry over HTTP (or any other transport) is left to the caller.

use prometheus::{IntCounter, IntGauge, Registry};
use thiserror::Error;

/// Metrics construction errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A metric failed to construct or register with the Prometheus registry.
    #[error("prometheus registration failed: {0}")]
    Prom(#[from] prometheus::Error),
}

/// Metrics container for one [`crate::engine::GossipEngine`] instance.
#[derive(Clone)]
pub struct Metrics {
    /// Registry other metrics are registered against.
    pub registry: Registry,

    /// Events newly admitted (delivered + rebroadcast) by this node.
    pub admitted_total: IntCounter,
    /// Events seen again and dropped as duplicates.
    pub duplicate_total: IntCounter,
    /// Datagrams dropped for failing to decode as a well-formed `Event`.
    pub decode_error_total: IntCounter,
    /// Number of times `flush` has drained the outbound batch.
    pub flush_total: IntCounter,
    /// Number of fingerprints currently retained by the seen tracker.
    pub tracker_size: IntGauge,
    /// Slots currently queued in the outbound batch.
    pub outbound_queued: IntGauge,
}

impl Metrics {
    /// Create and register all metrics against a fresh registry.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let admitted_total =
            IntCounter::new("gossip_admitted_total", "Events newly admitted and rebroadcast")?;
        let duplicate_total = IntCounter::new(
            "gossip_duplicate_total",
            "Events seen again and dropped as duplicates",
        )?;
        let decode_error_total = IntCounter::new(
            "gossip_decode_error_total",
            "Datagrams dropped for failing to decode",
        )?;
        let flush_total = IntCounter::new(
            "gossip_flush_total",
            "Number of times the outbound batch has been flushed",
        )?;
        let tracker_size = IntGauge::new(
            "gossip_tracker_size",
            "Fingerprints currently retained by the seen tracker",
        )?;
        let outbound_queued = IntGauge::new(
            "gossip_outbound_queued",
            "Slots currently queued in the outbound batch",
        )?;

        registry.register(Box::new(admitted_total.clone()))?;
        registry.register(Box::new(duplicate_total.clone()))?;
        registry.register(Box::new(decode_error_total.clone()))?;
        registry.register(Box::new(flush_total.clone()))?;
        registry.register(Box::new(tracker_size.clone()))?;
        registry.register(Box::new(outbound_queued.clone()))?;

        Ok(Self {
            registry,
            admitted_total,
            duplicate_total,
            decode_error_total,
            flush_total,
            tracker_size,
            outbound_queued,
        })
    }
}
