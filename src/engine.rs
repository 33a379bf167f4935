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

//! The gossip engine: ingest -> dedupe -> deliver -> rebroadcast, plus the
//! public `publish` entrypoint for locally originated messages.

#![forbid(unsafe_code)]

use crate::config::GossipConfig;
use crate::error::{GossipError, TransportError};
use crate::identity::local_identity;
use crate::metrics::Metrics;
use crate::nodelist::{NodeSampler, StaticNodeList};
use crate::tracker::SeenTracker;
use crate::transport::BatchedTransceiver;
use crate::wire;
use ahash::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::thread::JoinHandle;

const FLUSH_INTERVAL: Duration = Duration::from_millis(1);
const EVICTION_INTERVAL: Duration = Duration::from_secs(10);
/// Granularity at which the eviction worker re-checks the shutdown flag
/// while waiting out `EVICTION_INTERVAL`, so `GossipEngine::drop` does not
/// block for up to a full sweep period.
const EVICTION_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long a fingerprint is retained before it becomes eligible for
/// eviction and thus re-delivery on re-injection.
pub const RETENTION_HORIZON: Duration = Duration::from_secs(300);

/// Consumer callback invoked once per newly-admitted event. Runs
/// synchronously on the receive worker; a panic inside it is caught so one
/// bad event cannot kill gossip for the whole node.
pub type OnGossip = dyn Fn(&[u8]) + Send + Sync + 'static;

/// The gossip engine. Stateless beyond the shared tracker and batches;
/// `publish` is safe to call concurrently from arbitrary threads.
pub struct GossipEngine {
    local_id: [u8; 6],
    fanout: u32,
    nodes: Arc<dyn NodeSampler>,
    tracker: Arc<SeenTracker>,
    transport: Arc<BatchedTransceiver>,
    metrics: Arc<Metrics>,
    hasher: RandomState,
    workers: Vec<JoinHandle<()>>,
}

impl GossipEngine {
    /// Construct the engine: bind the socket, build the node list and
    /// tracker, and spawn the receive/flush/eviction workers before
    /// returning. Any live `GossipEngine` is therefore always ready for
    /// `publish`.
    pub fn new(
        config: GossipConfig,
        on_gossip: impl Fn(&[u8]) + Send + Sync + 'static,
    ) -> Result<Self, GossipError> {
        Self::with_metrics(config, on_gossip, Arc::new(Metrics::new()?))
    }

    /// Same as [`Self::new`] but lets the caller supply (and later export)
    /// its own [`Metrics`] instance.
    pub fn with_metrics(
        config: GossipConfig,
        on_gossip: impl Fn(&[u8]) + Send + Sync + 'static,
        metrics: Arc<Metrics>,
    ) -> Result<Self, GossipError> {
        let fanout = config.effective_fanout();
        let nodes: Arc<dyn NodeSampler> = Arc::new(StaticNodeList::new(config.nodes));
        let tracker = Arc::new(SeenTracker::new());
        let transport = Arc::new(BatchedTransceiver::bind(&config.listen_address, metrics.clone())?);
        let local_id = local_identity(transport.local_addr()?)?;
        let hasher = RandomState::new();

        tracing::info!(
            listen_addr = %transport.local_addr()?,
            fanout,
            "gossip engine starting"
        );

        let on_gossip: Arc<OnGossip> = Arc::new(on_gossip);
        let mut workers = Vec::with_capacity(3);

        workers.push({
            let transport = transport.clone();
            let nodes = nodes.clone();
            let tracker = tracker.clone();
            let metrics = metrics.clone();
            let hasher = hasher.clone();
            let fanout = fanout;
            let on_gossip = on_gossip.clone();
            std::thread::spawn(move || {
                transport.clone().run_receive_loop(move |_src, payload| {
                    handle_inbound(
                        payload,
                        fanout,
                        &nodes,
                        &tracker,
                        &transport,
                        &metrics,
                        &hasher,
                        &on_gossip,
                    );
                });
            })
        });

        workers.push({
            let transport = transport.clone();
            std::thread::spawn(move || transport.run_flush_ticker(FLUSH_INTERVAL))
        });

        workers.push({
            let tracker = tracker.clone();
            let metrics = metrics.clone();
            let transport = transport.clone();
            std::thread::spawn(move || {
                while transport.is_running() {
                    let mut waited = Duration::ZERO;
                    while waited < EVICTION_INTERVAL && transport.is_running() {
                        std::thread::sleep(EVICTION_POLL_INTERVAL);
                        waited += EVICTION_POLL_INTERVAL;
                    }
                    if !transport.is_running() {
                        break;
                    }
                    let threshold = Instant::now() - RETENTION_HORIZON;
                    let evicted = tracker.evict(threshold);
                    metrics.tracker_size.set(tracker.len() as i64);
                    tracing::debug!(
                        evicted,
                        remaining = tracker.len(),
                        "ran tracker eviction sweep"
                    );
                }
            })
        });

        Ok(Self {
            local_id,
            fanout,
            nodes,
            tracker,
            transport,
            metrics,
            hasher,
            workers,
        })
    }

    /// Treat `message` as a locally originated event: encode with the
    /// local identity as origin, sample `fanout` peers, and enqueue one
    /// copy of the encoded event per sampled peer.
    pub fn publish(&self, message: &[u8]) -> Result<(), TransportError> {
        self.gossip(&self.local_id, message)
    }

    /// Returns this node's wire identity (4 bytes IPv4 + 2 bytes port LE).
    pub fn local_identity(&self) -> [u8; 6] {
        self.local_id
    }

    /// Exposes the metrics registry for the caller to export.
    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// Number of fingerprints currently retained by the seen tracker.
    pub fn tracker_len(&self) -> usize {
        self.tracker.len()
    }

    /// Signal all worker threads to stop at their next poll interval.
    pub fn shutdown(&self) {
        self.transport.stop();
    }

    fn gossip(&self, origin: &[u8], message: &[u8]) -> Result<(), TransportError> {
        enqueue_to_sampled(
            origin,
            message,
            self.fanout,
            &self.nodes,
            &self.transport,
        )
    }
}

impl Drop for GossipEngine {
    fn drop(&mut self) {
        self.transport.stop();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// Encode `(origin, message)` once and enqueue one copy per peer sampled
/// from `nodes`, flushing inline whenever the outbound batch is full.
/// Shared by `publish` and the receive-path `forward` step.
fn enqueue_to_sampled(
    origin: &[u8],
    message: &[u8],
    fanout: u32,
    nodes: &Arc<dyn NodeSampler>,
    transport: &BatchedTransceiver,
) -> Result<(), TransportError> {
    let targets = nodes.sample(fanout as usize);
    let encoded = wire::encode(origin, message);
    for peer in targets {
        transport.enqueue(peer, &encoded)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_inbound(
    payload: &[u8],
    fanout: u32,
    nodes: &Arc<dyn NodeSampler>,
    tracker: &SeenTracker,
    transport: &BatchedTransceiver,
    metrics: &Metrics,
    hasher: &RandomState,
    on_gossip: &Arc<OnGossip>,
) {
    let event = match wire::decode(payload) {
        Ok(event) => event,
        Err(err) => {
            tracing::trace!(error = %err, "dropping malformed datagram");
            metrics.decode_error_total.inc();
            return;
        }
    };

    let fp = fingerprint(hasher, payload);
    if !tracker.admit(fp, Instant::now()) {
        metrics.duplicate_total.inc();
        return;
    }
    metrics.admitted_total.inc();
    metrics.tracker_size.set(tracker.len() as i64);

    if catch_unwind(AssertUnwindSafe(|| on_gossip(&event.message))).is_err() {
        tracing::error!("consumer callback panicked; continuing gossip for this event");
    }

    if let Err(err) = enqueue_to_sampled(&event.origin, &event.message, fanout, nodes, transport) {
        tracing::error!(error = %err, "failed to rebroadcast event");
    }
}

/// 64-bit fingerprint of the raw encoded event bytes, using a fast
/// non-cryptographic hash seeded once per process (`ahash::RandomState`).
/// Per-process seed randomization, not a fixed cross-process hash, is
/// deliberate: it frustrates an adversary crafting collisions to suppress
/// a payload network-wide.
fn fingerprint(hasher: &RandomState, encoded: &[u8]) -> u64 {
    let mut h = hasher.build_hasher();
    h.write(encoded);
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddrV4};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn config(port: u16, peers: Vec<SocketAddrV4>) -> GossipConfig {
        GossipConfig {
            listen_address: format!("127.0.0.1:{port}"),
            fanout: 13,
            nodes: peers,
        }
    }

    #[test]
    fn publish_delivers_to_a_single_peer() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();

        let addr_b = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 19001);
        let node_b = GossipEngine::new(config(19001, vec![addr_b]), move |msg| {
            received_clone.lock().unwrap().push(msg.to_vec());
        })
        .expect("node b");

        let node_a = GossipEngine::new(config(19002, vec![addr_b]), |_| {}).expect("node a");

        node_a.publish(b"hello!").expect("publish");

        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if !received.lock().unwrap().is_empty() || Instant::now() > deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(received.lock().unwrap().as_slice(), &[b"hello!".to_vec()]);
        let _ = node_b;
    }

    #[test]
    fn duplicate_publish_is_delivered_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();

        let addr_b = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 19011);
        let node_b = GossipEngine::new(config(19011, vec![addr_b]), move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
        .expect("node b");
        let node_a = GossipEngine::new(config(19012, vec![addr_b]), |_| {}).expect("node a");

        node_a.publish(b"dup").expect("publish 1");
        node_a.publish(b"dup").expect("publish 2");

        std::thread::sleep(Duration::from_millis(300));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        let _ = node_b;
    }
}
