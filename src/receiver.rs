//! Receiver worker: the inbound half of the handshake state machine.
//!
//! One blocking receive per iteration, no receive timeout — a missing reply
//! is detected by the sender worker's own retry ceiling, never here.  Each
//! decoded segment is dispatched purely on its control mode:
//!
//! - `SYN_ACK` / `FIN_ACK` — record the reply and the acknowledged sequence
//!   number, then wake the sender so it can emit the next leg.
//! - `ACK` — record receipt, wake nobody (data-phase acknowledgment handling
//!   is out of scope; the recorded mode is what later arms the teardown).
//! - anything else, a mode invalid for the current phase, or a datagram
//!   shorter than the header — a typed error surfaced to the application.
//!
//! This worker is the only writer of `last_received` / `next_seq`; see
//! [`crate::state`] for the ownership contract.

use std::sync::Arc;

use tokio::sync::{mpsc, Notify};

use crate::connection::Event;
use crate::error::Error;
use crate::socket::Socket;
use crate::state::{ConnectionPhase, StateHandle};
use crate::wire::ControlMode;

/// Run the receiver worker until a protocol violation, an I/O failure, or
/// connection teardown (the task is aborted by the application layer).
pub(crate) async fn run_receiver(
    socket: Arc<Socket>,
    state: StateHandle,
    sender_wake: Arc<Notify>,
    events: mpsc::Sender<Event>,
) {
    loop {
        let (segment, addr) = match socket.recv_segment().await {
            Ok(received) => received,
            Err(e) => {
                log::error!("[recv] receive failed: {e}");
                let _ = events.send(Event::Failed(e)).await;
                break;
            }
        };

        // Segments from anyone but our peer are not part of this connection.
        if addr != socket.peer {
            log::debug!("[recv] ignoring segment from non-peer {addr}");
            continue;
        }

        let snap = match state.snapshot().await {
            Ok(snap) => snap,
            Err(_) => break, // connection torn down
        };

        let outcome = match segment.mode {
            // Only the establishment leg carries SYN_ACK.
            ControlMode::SynAck if snap.phase == ConnectionPhase::Handshaking => {
                state.record_reply(ControlMode::SynAck, segment.seq_ack).await
            }
            // Only the teardown leg carries FIN_ACK.
            ControlMode::FinAck if snap.phase == ConnectionPhase::Closing => {
                state.record_reply(ControlMode::FinAck, segment.seq_ack).await
            }
            // Data-phase acknowledgment: record receipt, take no action.
            ControlMode::Ack => {
                log::debug!("[recv] {} ← ACK ack={}", snap.phase, segment.seq_ack);
                if state
                    .record_reply(ControlMode::Ack, segment.seq_ack)
                    .await
                    .is_err()
                {
                    break;
                }
                continue;
            }
            mode => {
                let violation = Error::UnexpectedMode {
                    mode,
                    phase: snap.phase,
                };
                log::error!("[recv] {violation}");
                let _ = events.send(Event::Failed(violation)).await;
                break;
            }
        };

        if outcome.is_err() {
            break; // connection torn down
        }

        log::debug!(
            "[recv] {} ← {} ack={} — waking sender",
            snap.phase,
            segment.mode,
            segment.seq_ack
        );
        sender_wake.notify_one();
    }
}
