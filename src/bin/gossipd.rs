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

//! Gossip node entrypoint (systemd-friendly).
//! Binds a socket, starts the engine, and keeps the process alive.

use std::net::SocketAddrV4;

use epidemic_gossip::{GossipConfig, GossipEngine};
use tracing::{info, warn};

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Comma-separated `host:port` list, e.g. `GOSSIP_NODES=10.0.0.2:9000,10.0.0.3:9000`.
fn parse_nodes(raw: &str) -> Vec<SocketAddrV4> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(addr) => Some(addr),
            Err(err) => {
                warn!(addr = s, error = %err, "ignoring unparsable node address");
                None
            }
        })
        .collect()
}

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .compact()
        .try_init();

    let nodes = parse_nodes(&env("GOSSIP_NODES", ""));
    let config = GossipConfig::from_env("0.0.0.0:9000", nodes);

    info!(
        listen_addr = %config.listen_address,
        fanout = config.effective_fanout(),
        neighbourhood = config.nodes.len(),
        version = env!("CARGO_PKG_VERSION"),
        git_sha = option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        "gossip node starting"
    );

    let engine = match GossipEngine::new(config, |message| {
        info!(bytes = message.len(), "delivered gossip event");
    }) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("failed to start gossip engine: {err}");
            std::process::exit(1);
        }
    };

    info!(identity = ?engine.local_identity(), "gossip node ready");

    if tokio::signal::ctrl_c().await.is_err() {
        warn!("failed to install Ctrl+C handler; running until killed");
        std::future::pending::<()>().await;
    }

    info!("shutdown signal received");
    engine.shutdown();
}
