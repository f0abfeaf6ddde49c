//! Sender worker: the outbound half of the handshake state machine.
//!
//! The worker loops on "wait for a wake-up with a bounded ceiling, then take
//! one snapshot and act".  The bounded wait is what allows a lost reply to be
//! retried rather than hanging forever: if nobody wakes the worker within
//! [`crate::connection::Config::retry_interval`], it re-evaluates the
//! (unchanged) state and re-sends the same segment — indistinguishable to
//! the peer from the first attempt.
//!
//! The state-keyed action table lives in [`next_action`], a pure function,
//! so every `(phase, last_received)` combination — including the fatal
//! ones — is unit-testable without sockets.  The table is exhaustive by
//! design: a combination it does not list indicates a logic or
//! peer-conformance bug, not a transient network condition, and fails the
//! connection.

use std::sync::Arc;

use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;

use crate::connection::{Config, Event};
use crate::error::{Error, Result};
use crate::socket::Socket;
use crate::state::{ConnectionPhase, Snapshot, StateHandle};
use crate::wire::{ControlMode, Segment};

// ---------------------------------------------------------------------------
// Action table
// ---------------------------------------------------------------------------

/// Which phase a completing reply finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PhaseDone {
    /// Three-way handshake complete; the connection is established.
    Established,
    /// Four-way teardown complete; the connection is gone.
    Closed,
}

/// What the sender should do for one observed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Transmit a first-leg segment (SYN or FIN) carrying the current
    /// sequence number.  Repeats for an unchanged state count toward the
    /// bounded-retry cutoff, and a short send is fatal.
    Request(ControlMode),
    /// Transmit the reply ACK that completes a phase.  Best-effort: a short
    /// send is tolerated because the peer's retransmission re-triggers it.
    Complete(PhaseDone),
    /// Nothing to do in this state.
    Idle,
    /// The worker's job is over.
    Stop,
}

/// The state-keyed action table.
///
/// | phase        | last_received | action                          |
/// |--------------|---------------|---------------------------------|
/// | Handshaking  | None          | send SYN                        |
/// | Handshaking  | SYN_ACK       | send ACK, establishment done    |
/// | Closing      | ACK           | send FIN                        |
/// | Closing      | FIN_ACK       | send ACK, teardown done, stop   |
/// | DataTransfer | —             | no-op                           |
/// | Failed       | —             | stop                            |
///
/// Everything else is a protocol violation.
pub(crate) fn next_action(snap: &Snapshot) -> Result<Action> {
    use ConnectionPhase::*;
    use ControlMode::*;

    match (snap.phase, snap.last_received) {
        (Handshaking, None) => Ok(Action::Request(Syn)),
        (Handshaking, Some(SynAck)) => Ok(Action::Complete(PhaseDone::Established)),
        (Closing, Some(Ack)) => Ok(Action::Request(Fin)),
        (Closing, Some(FinAck)) => Ok(Action::Complete(PhaseDone::Closed)),
        (DataTransfer, _) => Ok(Action::Idle),
        (Failed, _) => Ok(Action::Stop),
        // The application enters Handshaking before this worker exists.
        (Initial, _) => Err(Error::SpuriousPhase(Initial)),
        (phase, Some(mode)) => Err(Error::UnexpectedMode { mode, phase }),
        (phase, None) => Err(Error::SpuriousPhase(phase)),
    }
}

// ---------------------------------------------------------------------------
// Worker loop
// ---------------------------------------------------------------------------

/// Run the sender worker until the connection closes, fails, or is torn down.
pub(crate) async fn run_sender(
    socket: Arc<Socket>,
    state: StateHandle,
    wake: Arc<Notify>,
    events: mpsc::Sender<Event>,
    config: Config,
) {
    // Retry accounting: which request was issued last, and how many times.
    let mut last_request: Option<(ConnectionPhase, ControlMode)> = None;
    let mut attempts = 0u32;
    let mut signalled_established = false;

    loop {
        // A wake from the receiver or the application, or the retry ceiling.
        let _ = timeout(config.retry_interval, wake.notified()).await;

        let snap = match state.snapshot().await {
            Ok(snap) => snap,
            Err(_) => break, // connection torn down
        };

        match next_action(&snap) {
            Ok(Action::Idle) => continue,
            Ok(Action::Stop) => break,

            Ok(Action::Request(mode)) => {
                if last_request == Some((snap.phase, mode)) {
                    attempts += 1;
                } else {
                    last_request = Some((snap.phase, mode));
                    attempts = 1;
                }
                if attempts > config.max_attempts {
                    log::warn!(
                        "[send] {} — no reply after {} {mode} attempts, giving up",
                        snap.phase,
                        config.max_attempts
                    );
                    let timed_out = Error::HandshakeTimeout {
                        attempts: config.max_attempts,
                    };
                    let _ = events.send(Event::Failed(timed_out)).await;
                    break;
                }

                // First-leg segments must make it onto the wire in full.
                match send_full(&socket, mode, snap.next_seq).await {
                    Ok(()) => {
                        log::debug!(
                            "[send] {} → {mode} seq={} (attempt {attempts})",
                            snap.phase,
                            snap.next_seq
                        );
                    }
                    Err(e) => {
                        log::error!("[send] {} → {mode} failed: {e}", snap.phase);
                        let _ = events.send(Event::Failed(e)).await;
                        break;
                    }
                }
            }

            Ok(Action::Complete(done)) => {
                // Reply ACK is best-effort: the peer re-sends its SYN_ACK /
                // FIN_ACK if this one is lost, which re-triggers us.
                if let Err(e) = send_full(&socket, ControlMode::Ack, snap.next_seq).await {
                    log::warn!("[send] {} → ACK not sent ({e}), relying on peer retry", snap.phase);
                } else {
                    log::debug!("[send] {} → ACK seq={}", snap.phase, snap.next_seq);
                }

                match done {
                    PhaseDone::Established => {
                        if !signalled_established {
                            signalled_established = true;
                            log::debug!("[send] establishment complete — waking application");
                            let _ = events.send(Event::Established).await;
                        }
                    }
                    PhaseDone::Closed => {
                        log::debug!("[send] teardown complete — waking application");
                        let _ = events.send(Event::Closed).await;
                        break; // connection fully closed; no further sends
                    }
                }
            }

            Err(e) => {
                log::error!("[send] {} — {e}", snap.phase);
                let _ = events.send(Event::Failed(e)).await;
                break;
            }
        }
    }
}

/// Send one control segment, failing on a short send.
async fn send_full(socket: &Socket, mode: ControlMode, seq: u32) -> Result<()> {
    let (sent, expected) = socket.send_segment(&Segment::control(mode, seq)).await?;
    if sent != expected {
        return Err(Error::SendFailure { expected, sent });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests — the full action table, fatal rows included
// ---------------------------------------------------------------------------
