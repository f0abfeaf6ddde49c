//! Connection-engine error types.
//!
//! Every fatal condition is a typed variant: workers report the error to
//! the application caller and the connection enters the terminal
//! [`crate::state::ConnectionPhase::Failed`] phase.  Nothing in this crate
//! aborts the process.

use thiserror::Error;

use crate::state::ConnectionPhase;
use crate::wire::ControlMode;

/// Everything that can go wrong inside the connection engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A datagram arrived carrying fewer bytes than the 4-byte control header.
    #[error("malformed header: got {got} bytes, need at least {need}")]
    MalformedHeader { got: usize, need: usize },

    /// A control mode arrived (or was observed by the sender) that is invalid
    /// for the current phase.
    #[error("unexpected mode {mode} in phase {phase}")]
    UnexpectedMode {
        mode: ControlMode,
        phase: ConnectionPhase,
    },

    /// The wire carried a mode nibble with no assigned meaning.
    #[error("unknown control mode {0:#x}")]
    UnknownMode(u8),

    /// A first-leg segment (SYN or FIN) could not be put on the wire in full.
    #[error("short send: wrote {sent} of {expected} bytes")]
    SendFailure { expected: usize, sent: usize },

    /// The sender worker observed a phase it must never see once the
    /// handshake has been started.
    #[error("sender observed spurious phase {0}")]
    SpuriousPhase(ConnectionPhase),

    /// The bounded-retry cutoff was exceeded without a reply from the peer.
    #[error("no reply from peer after {attempts} attempts")]
    HandshakeTimeout { attempts: u32 },

    /// Encode-side range violation: mode does not fit in 4 bits.
    #[error("mode {0} does not fit in 4 bits")]
    InvalidMode(u8),

    /// Encode-side range violation: sequence number does not fit in 28 bits.
    #[error("sequence number {0} does not fit in 28 bits")]
    SeqOutOfRange(u32),

    /// Bulk data transfer is reserved but not part of this engine.
    #[error("data transfer is not supported by this connection engine")]
    DataTransferUnsupported,

    /// Underlying socket I/O failure.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A worker or the state actor went away mid-operation.
    #[error("connection worker channel closed")]
    ChannelClosed,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
