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

//! The neighbourhood a node gossips to, and k-of-n sampling over it.

#![forbid(unsafe_code)]

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::net::SocketAddrV4;
use std::sync::Mutex;

/// A source of peers to fan out to. Kept as a trait so alternative
/// strategies (weighted sampling, liveness-filtered sampling) can be
/// substituted without touching [`crate::engine::GossipEngine`].
pub trait NodeSampler: Send + Sync {
    /// Return up to `count` distinct peers drawn from the neighbourhood.
    fn sample(&self, count: usize) -> Vec<SocketAddrV4>;
}

/// Attempt cap for rejection sampling, guarding against a pathologically
/// small neighbourhood relative to the requested count (e.g. `count` equal
/// to `len(nodes) - 1` would otherwise need many draws to fill the last
/// slot). When exhausted, the sampler falls back to a partial return of
/// whatever distinct peers it found.
const MAX_SAMPLE_ATTEMPTS: usize = 10_000;

/// The default [`NodeSampler`]: an immutable, ordered neighbourhood plus a
/// pseudo-random source seeded once from OS entropy at construction, so
/// independent nodes diverge.
pub struct StaticNodeList {
    nodes: Vec<SocketAddrV4>,
    rng: Mutex<StdRng>,
}

impl StaticNodeList {
    /// Build a node list from a static neighbourhood. The neighbourhood may
    /// include the local node; self-sends are harmless (filtered as
    /// duplicates of the local publish on receipt).
    pub fn new(nodes: Vec<SocketAddrV4>) -> Self {
        Self {
            nodes,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Number of peers in the neighbourhood.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the neighbourhood is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeSampler for StaticNodeList {
    fn sample(&self, count: usize) -> Vec<SocketAddrV4> {
        if count == 0 || self.nodes.is_empty() {
            return Vec::new();
        }
        if self.nodes.len() <= count {
            return self.nodes.clone();
        }

        let mut picked: Vec<SocketAddrV4> = Vec::with_capacity(count);
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let mut attempts = 0;
        while picked.len() < count && attempts < MAX_SAMPLE_ATTEMPTS {
            attempts += 1;
            let idx = rng.gen_range(0..self.nodes.len());
            let candidate = self.nodes[idx];
            if !picked.contains(&candidate) {
                picked.push(candidate);
            }
        }
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::net::Ipv4Addr;

    fn addrs(n: u16) -> Vec<SocketAddrV4> {
        (0..n)
            .map(|i| SocketAddrV4::new(Ipv4Addr::LOCALHOST, 10000 + i))
            .collect()
    }

    #[test]
    fn returns_full_list_when_fewer_nodes_than_k() {
        let list = StaticNodeList::new(addrs(5));
        let sampled = list.sample(13);
        assert_eq!(sampled.len(), 5);
        assert_eq!(sampled, addrs(5));
    }

    #[test]
    fn returns_k_distinct_nodes() {
        let list = StaticNodeList::new(addrs(1000));
        let sampled = list.sample(13);
        assert_eq!(sampled.len(), 13);
        let mut dedup = sampled.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), 13);
    }

    #[test]
    fn sampling_is_roughly_uniform() {
        let n = 200usize;
        let list = StaticNodeList::new(addrs(n as u16));
        let mut counts = vec![0u32; n];
        let trials = 20_000;
        for _ in 0..trials {
            for addr in list.sample(13) {
                let idx = (addr.port() - 10000) as usize;
                counts[idx] += 1;
            }
        }
        let expected = (trials * 13) as f64 / n as f64;
        for (idx, &c) in counts.iter().enumerate() {
            let ratio = c as f64 / expected;
            assert!(
                (0.5..1.5).contains(&ratio),
                "peer {idx} selected {c} times, expected ~{expected}"
            );
        }
    }

    proptest! {
        /// S4/S5 distinctness, generalized over random neighbourhood sizes
        /// and `k`: `sample(k)` always returns `min(k, n)` results, every
        /// result belongs to the original neighbourhood, and results are
        /// pairwise distinct.
        #[test]
        fn sample_is_distinct_and_bounded(n in 0usize..300, k in 0usize..20) {
            let list = StaticNodeList::new(addrs(n as u16));
            let sampled = list.sample(k);

            prop_assert_eq!(sampled.len(), n.min(k));

            let universe = addrs(n as u16);
            for addr in &sampled {
                prop_assert!(universe.contains(addr));
            }

            let mut dedup = sampled.clone();
            dedup.sort();
            dedup.dedup();
            prop_assert_eq!(dedup.len(), sampled.len());
        }
    }
}
