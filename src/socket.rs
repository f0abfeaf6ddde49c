//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that speaks
//! [`crate::wire::Segment`] instead of raw bytes and remembers the single
//! peer this connection talks to.  All protocol logic lives elsewhere; this
//! module owns only byte I/O.
//!
//! The socket is shared between the two workers through an `Arc`: the
//! receiver worker is the only reader, the sender worker is the only writer,
//! so no locking is needed around it.

use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::error::Result;
use crate::wire::{Segment, HEADER_LEN, SEGMENT_SIZE};

/// Receive buffer: one header plus one full payload block.
const MAX_DATAGRAM: usize = HEADER_LEN + SEGMENT_SIZE;

/// A datagram socket addressed to one peer.
///
/// All methods are `&self` so the socket can be shared across tasks.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after the OS assigns an
    /// ephemeral port).
    pub local_addr: SocketAddr,
    /// The one peer this connection exchanges segments with.
    pub peer: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`, addressed to `peer`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr, peer: SocketAddr) -> Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self {
            local_addr,
            peer,
            inner,
        })
    }

    /// Encode `segment` and send it as a single datagram to the peer.
    ///
    /// Returns the number of bytes actually handed to the OS; the caller
    /// decides whether a short send is fatal.
    pub async fn send_segment(&self, segment: &Segment) -> Result<(usize, usize)> {
        let bytes = segment.encode()?;
        let sent = self.inner.send_to(&bytes, self.peer).await?;
        Ok((sent, bytes.len()))
    }

    /// Receive the next datagram and decode it into a [`Segment`].
    ///
    /// Returns `(segment, sender_address)`.  Decode failures are returned as
    /// `Err` — the caller decides whether they are fatal.
    pub async fn recv_segment(&self) -> Result<(Segment, SocketAddr)> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, addr) = self.inner.recv_from(&mut buf).await?;
        let segment = Segment::decode(&buf[..n])?;
        Ok((segment, addr))
    }
}
