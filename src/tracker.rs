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

//! Bounded-time retention tracker of previously observed event fingerprints.

#![forbid(unsafe_code)]

use dashmap::DashMap;
use std::time::Instant;

/// Concurrent fingerprint → first-observed-time map.
///
/// Presence of a fingerprint implies the event has already been delivered
/// and rebroadcast at least once. Entries older than the retention horizon
/// may be evicted; there is no explicit capacity cap, so memory use is
/// bounded by `retention horizon * peak admit rate`.
pub struct SeenTracker {
    seen: DashMap<u64, Instant, ahash::RandomState>,
}

impl SeenTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            seen: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    /// Atomically check-and-insert: if `fp` is absent, insert `(fp, now)`
    /// and return `true`; if already present, return `false` without
    /// overwriting the original timestamp.
    ///
    /// `DashMap::entry` locks only the shard owning `fp`'s hash bucket, so
    /// concurrent admits of *different* fingerprints never contend, and
    /// concurrent admits of the *same* fingerprint can never both observe
    /// "absent" (the property the engine's exactly-once delivery depends
    /// on).
    pub fn admit(&self, fp: u64, now: Instant) -> bool {
        use dashmap::mapref::entry::Entry;
        match self.seen.entry(fp) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    /// Remove all entries observed strictly before `before`.
    pub fn evict(&self, before: Instant) -> usize {
        let before_len = self.seen.len();
        self.seen.retain(|_, ts| *ts >= before);
        before_len - self.seen.len()
    }

    /// Current number of tracked fingerprints (observability only).
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether the tracker currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for SeenTracker {
    fn default() -> Self {
        Self::new()
    }
}
