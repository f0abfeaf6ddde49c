//! Per-connection lifecycle manager and the caller-facing API.
//!
//! A [`Connection`] owns the complete machinery for one client session:
//! the shared-state actor, the sender and receiver workers, and the UDP
//! socket all three collaborate over.
//!
//! ```text
//!  Application          connect() / close()
//!      │  phase transition + wake
//!      ▼
//!  ┌─────────┐  wake   ┌────────┐      SYN/FIN/ACK      ┌──────┐
//!  │  state  │◀───────▶│ sender │──────────────────────▶│ peer │
//!  │  actor  │         └────────┘                       └──┬───┘
//!  └────▲────┘  record + wake  ┌──────────┐  SYN_ACK/...   │
//!       └──────────────────────│ receiver │◀───────────────┘
//!                              └──────────┘
//! ```
//!
//! `connect` drives the three-way establishment (SYN → SYN_ACK → ACK),
//! `close` the four-way teardown (ACK carryover → FIN → FIN_ACK → ACK).
//! Both block until the worker pair signals phase completion and both
//! surface protocol violations as typed [`Error`]s, after which the
//! connection is in the terminal `Failed` phase — nothing aborts the
//! process.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::receiver::run_receiver;
use crate::sender::run_sender;
use crate::socket::Socket;
use crate::state::{ConnectionPhase, StateHandle};

/// Adjustable handshake parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ceiling on the sender worker's wait for a wake-up; also the re-send
    /// period when the peer stays silent.
    pub retry_interval: Duration,
    /// How many times the same SYN or FIN is transmitted before the
    /// connection fails with [`Error::HandshakeTimeout`].
    pub max_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_secs(1),
            max_attempts: 8,
        }
    }
}

/// Completion signals from the worker pair to the application caller.
#[derive(Debug)]
pub(crate) enum Event {
    /// The sender put the final establishment ACK on the wire.
    Established,
    /// The sender put the final teardown ACK on the wire and stopped.
    Closed,
    /// A worker hit a fatal condition; the connection is dead.
    Failed(Error),
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// A handle to one established client connection.
///
/// Created by [`Connection::connect`]; consumed by [`Connection::close`].
#[derive(Debug)]
pub struct Connection {
    socket: Arc<Socket>,
    state: StateHandle,
    sender_wake: Arc<Notify>,
    events: mpsc::Receiver<Event>,
    sender_task: JoinHandle<()>,
    receiver_task: JoinHandle<()>,
}

impl Connection {
    /// Establish a connection over `socket` via the three-way handshake.
    ///
    /// Spawns the state actor and both workers, enters the `Handshaking`
    /// phase, wakes the sender, and blocks until the worker pair signals
    /// completion.  On success the phase advances to `DataTransfer`.  An
    /// unresponsive peer fails with [`Error::HandshakeTimeout`] after
    /// `config.max_attempts` transmissions.
    pub async fn connect(socket: Socket, config: Config) -> Result<Self> {
        let socket = Arc::new(socket);
        let (state, _actor) = StateHandle::spawn();

        // Enter Handshaking before the workers exist: the sender can then
        // never legitimately observe the Initial phase.
        state.set_phase(ConnectionPhase::Handshaking).await?;

        let sender_wake = Arc::new(Notify::new());
        let (event_tx, events) = mpsc::channel(4);

        let receiver_task = tokio::spawn(run_receiver(
            Arc::clone(&socket),
            state.clone(),
            Arc::clone(&sender_wake),
            event_tx.clone(),
        ));
        let sender_task = tokio::spawn(run_sender(
            Arc::clone(&socket),
            state.clone(),
            Arc::clone(&sender_wake),
            event_tx,
            config,
        ));

        let mut conn = Self {
            socket,
            state,
            sender_wake,
            events,
            sender_task,
            receiver_task,
        };

        log::info!("[app] Handshaking — waking sender to begin establishment");
        conn.sender_wake.notify_one();

        match conn.events.recv().await {
            Some(Event::Established) => {
                conn.state.set_phase(ConnectionPhase::DataTransfer).await?;
                log::info!("[app] three-way handshake complete");
                Ok(conn)
            }
            Some(Event::Failed(e)) => {
                let _ = conn.state.set_phase(ConnectionPhase::Failed).await;
                Err(e)
            }
            Some(Event::Closed) | None => Err(Error::ChannelClosed),
        }
    }

    /// Tear the connection down via the four-way handshake, then stop both
    /// workers.  Consumes the handle; the shared record is discarded.
    pub async fn close(mut self) -> Result<()> {
        self.state.set_phase(ConnectionPhase::Closing).await?;
        log::info!("[app] Closing — waking sender to begin teardown");
        self.sender_wake.notify_one();

        match self.events.recv().await {
            Some(Event::Closed) => {
                log::info!("[app] four-way handshake complete");
                Ok(())
            }
            Some(Event::Failed(e)) => {
                let _ = self.state.set_phase(ConnectionPhase::Failed).await;
                Err(e)
            }
            Some(Event::Established) | None => Err(Error::ChannelClosed),
        }
    }

    /// Reserved entry point for bulk data transfer.
    ///
    /// The reliable-delivery protocol is undefined in this engine's scope,
    /// so every call reports [`Error::DataTransferUnsupported`].
    pub async fn write(&self, _buf: &[u8]) -> Result<usize> {
        Err(Error::DataTransferUnsupported)
    }

    /// Local address the underlying socket is bound to.
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.socket.local_addr
    }

    /// Address of the peer this connection talks to.
    pub fn peer_addr(&self) -> std::net::SocketAddr {
        self.socket.peer
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // The sender stops on its own; the receiver sits in a blocking
        // receive and must be cut loose.  The socket outlives both workers
        // because each holds its own Arc.
        self.receiver_task.abort();
        self.sender_task.abort();
    }
}
