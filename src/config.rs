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

//! Configuration surface for the gossip engine.

use serde::Deserialize;
use std::net::SocketAddrV4;

/// Default fanout when `fanout` is unset or below 1.
pub const DEFAULT_FANOUT: u32 = 13;

/// Construction-time configuration for a [`crate::engine::GossipEngine`].
///
/// The `on_gossip` consumer callback is not part of this struct (closures
/// aren't serializable); it is supplied as a separate argument to
/// `GossipEngine::new`.
#[derive(Clone, Debug, Deserialize)]
pub struct GossipConfig {
    /// `host:port` to bind the UDP socket.
    pub listen_address: String,
    /// Rebroadcast fanout `k`. Values below 1 are coerced to
    /// [`DEFAULT_FANOUT`].
    #[serde(default = "default_fanout")]
    pub fanout: u32,
    /// The static neighbourhood to sample rebroadcast targets from. May
    /// include the local node.
    pub nodes: Vec<SocketAddrV4>,
}

fn default_fanout() -> u32 {
    DEFAULT_FANOUT
}

impl GossipConfig {
    /// Effective fanout after coercing out-of-range values.
    pub fn effective_fanout(&self) -> u32 {
        if self.fanout < 1 {
            DEFAULT_FANOUT
        } else {
            self.fanout
        }
    }

    /// Parse configuration from a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Build configuration from environment variables, falling back to the
    /// given defaults. Mirrors the container-friendly `env()` convention
    /// used by this crate's demo binary.
    pub fn from_env(listen_default: &str, nodes: Vec<SocketAddrV4>) -> Self {
        let listen_address = std::env::var("GOSSIP_LISTEN_ADDR")
            .unwrap_or_else(|_| listen_default.to_string());
        let fanout = std::env::var("GOSSIP_FANOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_FANOUT);
        Self {
            listen_address,
            fanout,
            nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fanout_below_one_is_coerced() {
        let cfg = GossipConfig {
            listen_address: "127.0.0.1:10000".into(),
            fanout: 0,
            nodes: vec![],
        };
        assert_eq!(cfg.effective_fanout(), DEFAULT_FANOUT);
    }

    #[test]
    fn fanout_above_one_is_kept() {
        let cfg = GossipConfig {
            listen_address: "127.0.0.1:10000".into(),
            fanout: 5,
            nodes: vec![],
        };
        assert_eq!(cfg.effective_fanout(), 5);
    }

    #[test]
    fn parses_from_toml() {
        let raw = r#"
            listen_address = "127.0.0.1:10000"
            nodes = ["127.0.0.1:10001", "127.0.0.1:10002"]
        "#;
        let cfg = GossipConfig::from_toml(raw).expect("parse");
        assert_eq!(cfg.nodes.len(), 2);
        assert_eq!(cfg.effective_fanout(), DEFAULT_FANOUT);
    }
}
