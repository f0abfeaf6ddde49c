//! `mtcp` — the client-side connection engine of a minimal reliable
//! transport layered over UDP.
//!
//! # Architecture
//!
//! ```text
//!  Application            connect() / close()
//!      │ phase transition + wake          ▲ completion events
//!      ▼                                  │
//!  ┌─────────────┐   snapshot    ┌────────┴─┐   4-byte segments
//!  │ state actor │◀─────────────▶│  sender  │─────────────────▶ peer
//!  └──────▲──────┘               └────▲─────┘
//!         │ record reply              │ wake
//!  ┌──────┴──────┐                    │
//!  │  receiver   │────────────────────┘
//!  └──────▲──────┘
//!         └──────────────────────────────────◀──────────────── peer
//! ```
//!
//! Two background workers cooperate through a state-owning actor and
//! explicit wake-up signals: the sender drives the three-way establishment
//! (SYN → SYN_ACK → ACK) and four-way teardown (ACK carryover → FIN →
//! FIN_ACK → ACK), re-sending on a bounded timer when the peer stays
//! silent; the receiver decodes every inbound segment and records what
//! arrived.  Protocol violations surface as typed [`Error`]s, never as
//! process aborts.
//!
//! Each module has a single responsibility:
//! - [`wire`]       — wire format (4-byte control header codec)
//! - [`state`]      — lifecycle phases and the state-owning actor
//! - [`sender`]     — outbound worker, state-keyed action table
//! - [`receiver`]   — inbound worker, mode-keyed dispatch
//! - [`connection`] — caller-facing connect/close lifecycle
//! - [`socket`]     — async UDP socket abstraction
//! - [`error`]      — typed failure taxonomy

pub mod connection;
pub mod error;
pub mod receiver;
pub mod sender;
pub mod socket;
pub mod state;
pub mod wire;

pub use connection::{Config, Connection};
pub use error::{Error, Result};
pub use socket::Socket;
pub use state::{ConnectionPhase, Snapshot, StateHandle};
pub use wire::{ControlMode, Segment, HEADER_LEN, MAX_SEQ_ACK, SEGMENT_SIZE};
