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

//! The batched UDP transceiver: the outbound path drains its whole queue in
//! one pass of `send_to` calls per flush; the inbound path reads one
//! datagram per call, since the socket (`Arc<UdpSocket>`) is shared with the
//! flush path and its blocking mode cannot be toggled from the receive
//! worker without racing a concurrent `send_to`.
//!
//! This crate stays in safe Rust (`#![forbid(unsafe_code)]`, matching the
//! teacher), so these are the portable fallback named in the design notes
//! for a native `recvmmsg`/`sendmmsg` backend. Correctness is unaffected;
//! only raw throughput differs from a native batched backend.

#![forbid(unsafe_code)]

use crate::error::{GossipError, TransportError};
use crate::metrics::Metrics;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Maximum number of datagrams held per batch.
pub const BATCH_CAPACITY: usize = 1024;
/// Maximum transmission size per datagram payload.
pub const DATAGRAM_SIZE: usize = 1500;
/// How often the shutdown flag is polled by the blocking receive call.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

struct OutboundSlot {
    addr: SocketAddrV4,
    buf: Vec<u8>,
}

/// An ordered sequence of `(destination, payload)` slots bounded to
/// [`BATCH_CAPACITY`]. Slots beyond the active length are unused but retain
/// their buffer allocations, so steady-state operation does no further
/// heap allocation once warmed up.
struct OutboundBatch {
    slots: Vec<OutboundSlot>,
    len: usize,
}

impl OutboundBatch {
    fn new() -> Self {
        let slots = (0..BATCH_CAPACITY)
            .map(|_| OutboundSlot {
                addr: SocketAddrV4::new(std::net::Ipv4Addr::UNSPECIFIED, 0),
                buf: Vec::with_capacity(DATAGRAM_SIZE),
            })
            .collect();
        Self { slots, len: 0 }
    }

    fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Append a new slot, copying `payload` into its (possibly resized)
    /// buffer. Caller must ensure `!is_full()`.
    fn push(&mut self, addr: SocketAddrV4, payload: &[u8]) {
        let slot = &mut self.slots[self.len];
        slot.addr = addr;
        slot.buf.clear();
        slot.buf.extend_from_slice(payload);
        self.len += 1;
    }

    fn active(&self) -> &[OutboundSlot] {
        &self.slots[..self.len]
    }

    fn reset(&mut self) {
        self.len = 0;
    }
}

/// A single receive slot reused across calls, owning a [`DATAGRAM_SIZE`]
/// buffer. Owned exclusively by the receive worker; never shared. The
/// portable fallback reads one datagram per socket call (see module docs),
/// so there is no need for more than one slot.
struct InboundSlot {
    addr: SocketAddrV4,
    buf: Vec<u8>,
    len: usize,
}

impl InboundSlot {
    fn new() -> Self {
        Self {
            addr: SocketAddrV4::new(std::net::Ipv4Addr::UNSPECIFIED, 0),
            buf: vec![0u8; DATAGRAM_SIZE],
            len: 0,
        }
    }

    fn fill(&mut self, len: usize, addr: SocketAddrV4) {
        self.len = len;
        self.addr = addr;
    }

    fn payload(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

fn is_would_block(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn as_v4(addr: SocketAddr) -> io::Result<SocketAddrV4> {
    match addr {
        SocketAddr::V4(v4) => Ok(v4),
        SocketAddr::V6(_) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "received datagram from an IPv6 peer on an IPv4-only socket",
        )),
    }
}

/// Owns the datagram socket and drives the receive loop and the outbound
/// batch's flush discipline.
pub struct BatchedTransceiver {
    socket: Arc<UdpSocket>,
    outbound: Mutex<OutboundBatch>,
    metrics: Arc<Metrics>,
    running: Arc<AtomicBool>,
}

impl BatchedTransceiver {
    /// Bind a UDP socket at `listen_address` with address- and port-reuse
    /// enabled, matching the original implementation's socket options so
    /// multiple local processes can co-exist during tests.
    pub fn bind(listen_address: &str, metrics: Arc<Metrics>) -> Result<Self, GossipError> {
        let addr: SocketAddr =
            listen_address
                .parse()
                .map_err(|source| GossipError::InvalidListenAddress {
                    addr: listen_address.to_string(),
                    source,
                })?;

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(GossipError::Bind)?;
        socket.set_reuse_address(true).map_err(GossipError::Bind)?;
        #[cfg(unix)]
        socket.set_reuse_port(true).map_err(GossipError::Bind)?;
        socket.bind(&addr.into()).map_err(GossipError::Bind)?;
        socket
            .set_read_timeout(Some(SHUTDOWN_POLL_INTERVAL))
            .map_err(GossipError::Bind)?;

        let socket: UdpSocket = socket.into();

        Ok(Self {
            socket: Arc::new(socket),
            outbound: Mutex::new(OutboundBatch::new()),
            metrics,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// The address the socket is actually bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, GossipError> {
        self.socket.local_addr().map_err(GossipError::LocalAddr)
    }

    /// Signal the receive loop to stop at its next poll interval.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Whether the transceiver has not yet been told to stop.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Enqueue one payload addressed to one peer. If the outbound batch is
    /// already full, flushes inline before enqueueing (backpressure: the
    /// cost of a full batch lands on the producer, not a dropped payload).
    pub fn enqueue(&self, addr: SocketAddrV4, payload: &[u8]) -> Result<(), TransportError> {
        let mut batch = self.outbound.lock().unwrap_or_else(|e| e.into_inner());
        if batch.is_full() {
            Self::flush_locked(&self.socket, &mut batch, &self.metrics)?;
        }
        batch.push(addr, payload);
        self.metrics.outbound_queued.set(batch.len as i64);
        Ok(())
    }

    /// Drain the entire outbound batch with one pass of send syscalls,
    /// resetting its length to zero. A no-op when the batch is empty.
    pub fn flush(&self) -> Result<(), TransportError> {
        let mut batch = self.outbound.lock().unwrap_or_else(|e| e.into_inner());
        Self::flush_locked(&self.socket, &mut batch, &self.metrics)
    }

    fn flush_locked(
        socket: &UdpSocket,
        batch: &mut OutboundBatch,
        metrics: &Metrics,
    ) -> Result<(), TransportError> {
        if batch.len == 0 {
            return Ok(());
        }
        for slot in batch.active() {
            socket
                .send_to(&slot.buf, SocketAddr::V4(slot.addr))
                .map_err(TransportError::Send)?;
        }
        batch.reset();
        metrics.flush_total.inc();
        metrics.outbound_queued.set(0);
        Ok(())
    }

    /// Run the ticker that periodically flushes partially-full batches,
    /// bounding latency for low-rate traffic. Returns once `stop` is
    /// observed or a fatal send error occurs.
    pub fn run_flush_ticker(&self, interval: Duration) {
        while self.running.load(Ordering::Acquire) {
            std::thread::sleep(interval);
            if let Err(err) = self.flush() {
                tracing::error!(error = %err, "flush ticker stopping on send error");
                return;
            }
        }
    }

    /// Run the receive loop, invoking `on_datagram(source, payload)`
    /// synchronously for every datagram read, until a fatal socket error
    /// occurs or `stop` is observed at a poll interval.
    ///
    /// Reads one datagram per socket call rather than draining a batch in
    /// a tight loop: the socket is shared with the flush path via
    /// `Arc<UdpSocket>`, and `O_NONBLOCK` is a property of the open file
    /// description, not of one thread's view of it — toggling it here
    /// would make a concurrent `send_to` on the flush path nondeterministically
    /// non-blocking too.
    pub fn run_receive_loop(&self, mut on_datagram: impl FnMut(SocketAddrV4, &[u8])) {
        let mut slot = InboundSlot::new();
        loop {
            if !self.running.load(Ordering::Acquire) {
                return;
            }
            match recv_one(&self.socket, &mut slot) {
                Ok(true) => on_datagram(slot.addr, slot.payload()),
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(error = %err, "receive loop terminating on socket error");
                    return;
                }
            }
        }
    }
}

/// Read a single datagram into `slot`, blocking up to the socket's read
/// timeout (also the shutdown poll tick). Returns `Ok(false)` on a timeout
/// / would-block, `Ok(true)` if a datagram was read.
fn recv_one(socket: &UdpSocket, slot: &mut InboundSlot) -> io::Result<bool> {
    let (len, addr) = match socket.recv_from(&mut slot.buf) {
        Ok(v) => v,
        Err(err) if is_would_block(&err) => return Ok(false),
        Err(err) => return Err(err),
    };
    slot.fill(len, as_v4(addr)?);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> Arc<Metrics> {
        Arc::new(Metrics::new().expect("metrics"))
    }

    #[test]
    fn binds_and_reports_local_addr() {
        let t = BatchedTransceiver::bind("127.0.0.1:0", metrics()).expect("bind");
        let addr = t.local_addr().expect("local_addr");
        assert!(addr.port() > 0);
    }

    #[test]
    fn enqueue_and_flush_round_trip() {
        let sender = BatchedTransceiver::bind("127.0.0.1:0", metrics()).expect("bind sender");
        let receiver = BatchedTransceiver::bind("127.0.0.1:0", metrics()).expect("bind receiver");
        let recv_addr = match receiver.local_addr().unwrap() {
            SocketAddr::V4(v4) => v4,
            _ => unreachable!(),
        };

        sender.enqueue(recv_addr, b"hello!").expect("enqueue");
        sender.flush().expect("flush");

        let mut buf = [0u8; DATAGRAM_SIZE];
        receiver
            .socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let (len, _) = receiver.socket.recv_from(&mut buf).expect("recv");
        assert_eq!(&buf[..len], b"hello!");
    }

    #[test]
    fn flush_is_a_noop_on_an_empty_batch() {
        let t = BatchedTransceiver::bind("127.0.0.1:0", metrics()).expect("bind");
        t.flush().expect("flush empty batch should not error");
    }

    #[test]
    fn enqueue_flushes_inline_when_full() {
        let sender = BatchedTransceiver::bind("127.0.0.1:0", metrics()).expect("bind sender");
        let receiver = BatchedTransceiver::bind("127.0.0.1:0", metrics()).expect("bind receiver");
        let recv_addr = match receiver.local_addr().unwrap() {
            SocketAddr::V4(v4) => v4,
            _ => unreachable!(),
        };
        receiver
            .socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        for _ in 0..BATCH_CAPACITY {
            sender.enqueue(recv_addr, b"x").expect("enqueue");
        }
        // The batch is now full; this enqueue must flush inline first.
        sender.enqueue(recv_addr, b"y").expect("enqueue overflow");

        let mut buf = [0u8; DATAGRAM_SIZE];
        let (len, _) = receiver.socket.recv_from(&mut buf).expect("recv");
        assert_eq!(&buf[..len], b"x");
    }
}
