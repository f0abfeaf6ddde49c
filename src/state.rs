//! Connection lifecycle state and the actor task that owns it.
//!
//! The shared record — current phase, last control mode received, next
//! sequence number to send — is owned by a single task instead of being
//! guarded by a lock.  Workers talk to it through [`StateHandle`], a
//! request/response channel pair, which preserves the one-writer-per-field
//! rule structurally:
//! - `phase` changes only via [`StateHandle::set_phase`], called by the
//!   application layer.
//! - `last_received` and `next_seq` change only via
//!   [`StateHandle::record_reply`], called by the receiver worker.
//! - The sender worker reads all three fields as one atomic [`Snapshot`] —
//!   a single request, so it can never observe a torn update.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::wire::ControlMode;

/// Coarse-grained connection lifecycle phase.
///
/// Strictly forward-progressing for one connection lifetime; no phase is
/// revisited once left.  `Failed` is terminal and reachable from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionPhase {
    /// Workers spawned, handshake not yet started.
    Initial,
    /// Three-way establishment (SYN → SYN_ACK → ACK) in progress.
    Handshaking,
    /// Established; reserved for future reliable-delivery logic.
    DataTransfer,
    /// Four-way teardown (FIN → FIN_ACK → ACK) in progress.
    Closing,
    /// A protocol violation or transport failure ended the connection.
    Failed,
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One atomic view of the shared record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: ConnectionPhase,
    /// Last control mode recorded by the receiver; `None` until the first
    /// reply arrives.
    pub last_received: Option<ControlMode>,
    /// Sequence number the sender will put on its next segment.
    pub next_seq: u32,
}

enum Request {
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    SetPhase {
        phase: ConnectionPhase,
        reply: oneshot::Sender<()>,
    },
    RecordReply {
        mode: ControlMode,
        seq_ack: u32,
        reply: oneshot::Sender<()>,
    },
}

// ---------------------------------------------------------------------------
// StateHandle
// ---------------------------------------------------------------------------

/// Cheap, cloneable handle to the state-owning task.
#[derive(Clone, Debug)]
pub struct StateHandle {
    tx: mpsc::Sender<Request>,
}

impl StateHandle {
    /// Spawn the actor with a fresh record: `(Initial, None, 0)`.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(state_task(rx));
        (Self { tx }, task)
    }

    /// Read `{phase, last_received, next_seq}` as one consistent snapshot.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Request::Snapshot { reply })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        response.await.map_err(|_| Error::ChannelClosed)
    }

    /// Advance the lifecycle phase.  Application-layer calls only.
    ///
    /// Returns once the transition is visible to subsequent snapshots, so a
    /// wake-up sent afterwards cannot observe the old phase.
    pub async fn set_phase(&self, phase: ConnectionPhase) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Request::SetPhase { phase, reply })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        response.await.map_err(|_| Error::ChannelClosed)
    }

    /// Record a reply from the peer.  Receiver-worker calls only.
    pub async fn record_reply(&self, mode: ControlMode, seq_ack: u32) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Request::RecordReply {
                mode,
                seq_ack,
                reply,
            })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        response.await.map_err(|_| Error::ChannelClosed)
    }
}

// ---------------------------------------------------------------------------
// Actor task
// ---------------------------------------------------------------------------

/// Runs until every [`StateHandle`] clone has been dropped.
async fn state_task(mut rx: mpsc::Receiver<Request>) {
    let mut phase = ConnectionPhase::Initial;
    let mut last_received: Option<ControlMode> = None;
    let mut next_seq: u32 = 0;

    while let Some(request) = rx.recv().await {
        match request {
            Request::Snapshot { reply } => {
                let _ = reply.send(Snapshot {
                    phase,
                    last_received,
                    next_seq,
                });
            }
            Request::SetPhase { phase: next, reply } => {
                debug_assert!(
                    next > phase,
                    "phase must progress forward: {phase} -> {next}"
                );
                phase = next;
                let _ = reply.send(());
            }
            Request::RecordReply {
                mode,
                seq_ack,
                reply,
            } => {
                last_received = Some(mode);
                next_seq = seq_ack;
                let _ = reply.send(());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_record() {
        let (state, _task) = StateHandle::spawn();
        let snap = state.snapshot().await.unwrap();
        assert_eq!(snap.phase, ConnectionPhase::Initial);
        assert_eq!(snap.last_received, None);
        assert_eq!(snap.next_seq, 0);
    }

    #[tokio::test]
    async fn set_phase_leaves_receiver_fields_alone() {
        let (state, _task) = StateHandle::spawn();
        state.set_phase(ConnectionPhase::Handshaking).await.unwrap();
        state.record_reply(ControlMode::SynAck, 100).await.unwrap();

        state.set_phase(ConnectionPhase::DataTransfer).await.unwrap();

        let snap = state.snapshot().await.unwrap();
        assert_eq!(snap.phase, ConnectionPhase::DataTransfer);
        assert_eq!(snap.last_received, Some(ControlMode::SynAck));
        assert_eq!(snap.next_seq, 100);
    }

    #[tokio::test]
    async fn record_reply_leaves_phase_alone() {
        let (state, _task) = StateHandle::spawn();
        state.set_phase(ConnectionPhase::Handshaking).await.unwrap();
        state.record_reply(ControlMode::SynAck, 100).await.unwrap();

        let snap = state.snapshot().await.unwrap();
        assert_eq!(snap.phase, ConnectionPhase::Handshaking);
        assert_eq!(snap.last_received, Some(ControlMode::SynAck));
        assert_eq!(snap.next_seq, 100);
    }

    #[tokio::test]
    async fn actor_stops_when_handles_drop() {
        let (state, task) = StateHandle::spawn();
        drop(state);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn phases_order_forward() {
        use ConnectionPhase::*;
        assert!(Initial < Handshaking);
        assert!(Handshaking < DataTransfer);
        assert!(DataTransfer < Closing);
        assert!(Closing < Failed);
    }
}
