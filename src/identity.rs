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

//! Derivation of the 6-byte local node identity carried as `Event::origin`.

use crate::error::GossipError;
use std::net::SocketAddr;

/// Derive the local identity: 4 bytes of IPv4 address followed by 2 bytes
/// of port, little-endian.
pub fn local_identity(addr: SocketAddr) -> Result<[u8; 6], GossipError> {
    let SocketAddr::V4(v4) = addr else {
        return Err(GossipError::NotIpv4(addr));
    };
    let mut id = [0u8; 6];
    id[..4].copy_from_slice(&v4.ip().octets());
    id[4..].copy_from_slice(&v4.port().to_le_bytes());
    Ok(id)
}
