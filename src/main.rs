//! Entry point for the `mtcp` demo.
//!
//! Parses CLI arguments and dispatches into either **connect** (client) or
//! **respond** (scripted peer) mode.  All protocol work is delegated to
//! library modules; `main.rs` owns only process setup (logging, argument
//! parsing) and the demo responder.

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::net::UdpSocket;

use mtcp::wire::{ControlMode, Segment, HEADER_LEN, SEGMENT_SIZE};
use mtcp::{Config, Connection, Socket};

/// Client-side connection engine for mtcp, a minimal reliable transport
/// over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Connect to a responder, then close the connection again.
    Connect {
        /// Remote responder address (e.g. 127.0.0.1:9000).
        #[arg(short, long)]
        server: String,
        /// Local address to bind (0.0.0.0:0 picks an ephemeral port).
        #[arg(short, long, default_value = "0.0.0.0:0")]
        bind: String,
    },
    /// Run the scripted peer the connect demo talks to.
    Respond {
        /// Local address to bind.
        #[arg(short, long, default_value = "127.0.0.1:9000")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.mode {
        Mode::Connect { server, bind } => run_client(&bind, &server).await,
        Mode::Respond { bind } => run_responder(&bind).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Drive one full connection lifetime: establish, then tear down.
async fn run_client(bind: &str, server: &str) -> Result<(), Box<dyn std::error::Error>> {
    let local: SocketAddr = bind.parse()?;
    let peer: SocketAddr = server.parse()?;

    let socket = Socket::bind(local, peer).await?;
    log::info!("connecting to {peer} from {}", socket.local_addr);

    let conn = Connection::connect(socket, Config::default()).await?;
    log::info!("connection established");

    conn.close().await?;
    log::info!("connection closed");
    Ok(())
}

/// A minimal scripted peer: serves exactly one connection lifetime, then
/// exits.  It answers the establishment and teardown legs, and hands the
/// client one data-phase ACK in between — the carryover that later arms the
/// client's teardown.
async fn run_responder(bind: &str) -> Result<(), Box<dyn std::error::Error>> {
    let socket = UdpSocket::bind(bind.parse::<SocketAddr>()?).await?;
    log::info!("responder listening on {}", socket.local_addr()?);

    let mut buf = [0u8; HEADER_LEN + SEGMENT_SIZE];
    let mut fin_seen = false;

    loop {
        let (n, addr) = socket.recv_from(&mut buf).await?;
        let segment = Segment::decode(&buf[..n])?;

        match segment.mode {
            ControlMode::Syn => {
                let reply = Segment::control(ControlMode::SynAck, segment.seq_ack + 1);
                socket.send_to(&reply.encode()?, addr).await?;
                log::info!("← SYN seq={}; → SYN_ACK", segment.seq_ack);
            }
            ControlMode::Ack if !fin_seen => {
                // Handshake ACK.  Reply with a data-phase ACK so the client
                // holds its teardown carryover.
                let reply = Segment::control(ControlMode::Ack, segment.seq_ack);
                socket.send_to(&reply.encode()?, addr).await?;
                log::info!("← ACK ack={}; → ACK", segment.seq_ack);
            }
            ControlMode::Fin => {
                fin_seen = true;
                let reply = Segment::control(ControlMode::FinAck, segment.seq_ack + 1);
                socket.send_to(&reply.encode()?, addr).await?;
                log::info!("← FIN seq={}; → FIN_ACK", segment.seq_ack);
            }
            ControlMode::Ack => {
                log::info!("← final ACK ack={}; connection closed", segment.seq_ack);
                return Ok(());
            }
            other => {
                log::warn!("← unexpected {other}; ignoring");
            }
        }
    }
}
