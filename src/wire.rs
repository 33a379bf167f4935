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

//! Wire codec for the gossiped `Event` record.
//!
//! The encoding is Protocol Buffers (via `prost`'s derive, no `.proto` file
//! or codegen step needed): a tagged, self-describing binary format with
//! stable field identity, so independently built peers interoperate even
//! across crate versions that add fields. This is the idiomatic Rust
//! analogue of the FlatBuffers schema the original implementation used.

#![forbid(unsafe_code)]

use crate::error::WireError;

/// Wire record gossiped between peers: the first emitter's identity plus
/// the opaque application payload.
///
/// Both fields are treated as opaque bytes by the engine; it only ever
/// hashes the full encoded form.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Event {
    /// Identity of the node that first published this event (see
    /// [`crate::identity::local_identity`]).
    #[prost(bytes = "vec", tag = "1")]
    pub origin: Vec<u8>,
    /// Opaque application payload.
    #[prost(bytes = "vec", tag = "2")]
    pub message: Vec<u8>,
}

/// Encode an event for a single datagram payload.
///
/// Deterministic for given inputs: `prost`'s wire format always emits
/// fields in tag order with no non-deterministic padding.
pub fn encode(origin: &[u8], message: &[u8]) -> Vec<u8> {
    let event = Event {
        origin: origin.to_vec(),
        message: message.to_vec(),
    };
    prost::Message::encode_to_vec(&event)
}

/// Decode a datagram payload into an `Event`.
///
/// Malformed input (truncated, bad tags, etc.) yields [`WireError::Decode`];
/// callers must drop the datagram silently on error per the engine's error
/// taxonomy.
pub fn decode(bytes: &[u8]) -> Result<Event, WireError> {
    prost::Message::decode(bytes).map_err(WireError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let encoded = encode(b"origin", b"hello!");
        let event = decode(&encoded).expect("decode");
        assert_eq!(event.origin, b"origin");
        assert_eq!(event.message, b"hello!");
    }

    #[test]
    fn decode_rejects_garbage() {
        // A lone continuation byte for a varint is invalid.
        let garbage = [0x08, 0xFF];
        assert!(decode(&garbage).is_err());
    }

    #[test]
    fn encode_is_deterministic() {
        let a = encode(b"x", b"y");
        let b = encode(b"x", b"y");
        assert_eq!(a, b);
    }
}
