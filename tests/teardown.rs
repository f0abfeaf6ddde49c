//! Integration tests for the four-way teardown handshake and the reserved
//! data-transfer surface.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use mtcp::wire::{ControlMode, Segment, HEADER_LEN, SEGMENT_SIZE};
use mtcp::{Config, Connection, Error, Socket};

const RECV_BUF: usize = HEADER_LEN + SEGMENT_SIZE;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn bind_peer() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
        .await
        .expect("bind peer socket");
    let addr = socket.local_addr().unwrap();
    (socket, addr)
}

async fn client_socket(peer: SocketAddr) -> Socket {
    Socket::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap(), peer)
        .await
        .expect("bind client socket")
}

fn fast_config() -> Config {
    Config {
        retry_interval: Duration::from_millis(100),
        max_attempts: 4,
    }
}

async fn recv_segment(socket: &UdpSocket) -> (Segment, SocketAddr) {
    let mut buf = [0u8; RECV_BUF];
    let (n, addr) = socket.recv_from(&mut buf).await.expect("peer recv");
    (Segment::decode(&buf[..n]).expect("peer decode"), addr)
}

async fn send_segment(socket: &UdpSocket, segment: Segment, to: SocketAddr) {
    socket
        .send_to(&segment.encode().unwrap(), to)
        .await
        .expect("peer send");
}

/// Serve the establishment leg and hand the client its data-phase ACK
/// carryover.  Returns the client's address.
async fn serve_establishment(peer: &UdpSocket, carryover_seq: u32) -> SocketAddr {
    let (syn, client) = recv_segment(peer).await;
    assert_eq!(syn.mode, ControlMode::Syn);

    send_segment(peer, Segment::control(ControlMode::SynAck, 100), client).await;

    let (ack, _) = recv_segment(peer).await;
    assert_eq!(ack.mode, ControlMode::Ack);
    assert_eq!(ack.seq_ack, 100);

    // Data-phase acknowledgment: what later arms the client's teardown.
    send_segment(peer, Segment::control(ControlMode::Ack, carryover_seq), client).await;
    client
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// The full lifetime: establish, then tear down with
/// ACK carryover → FIN → FIN_ACK → ACK.  The final ACK must echo the
/// FIN_ACK's sequence number, `close` must return, and the sender worker
/// must stop afterwards — no further sends observed.
#[tokio::test]
async fn teardown_completes_and_sender_stops() {
    let (peer, peer_addr) = bind_peer().await;

    let peer_task = tokio::spawn(async move {
        let client = serve_establishment(&peer, 150).await;

        let (fin, _) = recv_segment(&peer).await;
        assert_eq!(fin.mode, ControlMode::Fin);
        assert_eq!(fin.seq_ack, 150, "FIN must carry the carryover sequence");

        send_segment(&peer, Segment::control(ControlMode::FinAck, 200), client).await;

        let (last, _) = recv_segment(&peer).await;
        assert_eq!(last.mode, ControlMode::Ack);
        assert_eq!(last.seq_ack, 200, "final ACK must echo the FIN_ACK sequence");

        // The sender worker has terminated; the wire must stay quiet.
        let mut buf = [0u8; RECV_BUF];
        let quiet = timeout(Duration::from_millis(400), peer.recv_from(&mut buf)).await;
        assert!(quiet.is_err(), "observed a send after the connection closed");
    });

    let socket = client_socket(peer_addr).await;
    let conn = timeout(
        Duration::from_secs(5),
        Connection::connect(socket, fast_config()),
    )
    .await
    .expect("connect timed out")
    .expect("connect failed");

    // Let the carryover ACK land before starting the teardown.
    tokio::time::sleep(Duration::from_millis(150)).await;

    timeout(Duration::from_secs(5), conn.close())
        .await
        .expect("close timed out")
        .expect("close failed");

    timeout(Duration::from_secs(5), peer_task)
        .await
        .expect("peer script timed out")
        .expect("peer script panicked");
}

/// A lost FIN is re-sent unchanged once the retry ceiling fires.
#[tokio::test]
async fn silent_peer_observes_identical_fin_again() {
    let (peer, peer_addr) = bind_peer().await;

    let peer_task = tokio::spawn(async move {
        let client = serve_establishment(&peer, 42).await;

        let mut buf = [0u8; RECV_BUF];
        let (n, _) = peer.recv_from(&mut buf).await.unwrap();
        let first_fin = buf[..n].to_vec();
        assert_eq!(Segment::decode(&first_fin).unwrap().mode, ControlMode::Fin);

        // Stay silent through one retry ceiling.
        let (n, _) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(first_fin, &buf[..n], "retried FIN must be byte-identical");

        send_segment(&peer, Segment::control(ControlMode::FinAck, 43), client).await;

        let (last, _) = recv_segment(&peer).await;
        assert_eq!(last.mode, ControlMode::Ack);
        assert_eq!(last.seq_ack, 43);
    });

    let socket = client_socket(peer_addr).await;
    let conn = timeout(
        Duration::from_secs(5),
        Connection::connect(socket, fast_config()),
    )
    .await
    .expect("connect timed out")
    .expect("connect failed");

    tokio::time::sleep(Duration::from_millis(150)).await;

    timeout(Duration::from_secs(5), conn.close())
        .await
        .expect("close timed out")
        .expect("close failed");

    timeout(Duration::from_secs(5), peer_task)
        .await
        .unwrap()
        .unwrap();
}

/// Bulk data transfer is reserved: the entry point exists but reports a
/// typed error rather than pretending to deliver anything.
#[tokio::test]
async fn write_is_reserved() {
    let (peer, peer_addr) = bind_peer().await;

    let peer_task = tokio::spawn(async move {
        let (syn, client) = recv_segment(&peer).await;
        assert_eq!(syn.mode, ControlMode::Syn);
        send_segment(&peer, Segment::control(ControlMode::SynAck, 9), client).await;
        let (ack, _) = recv_segment(&peer).await;
        assert_eq!(ack.seq_ack, 9);
    });

    let socket = client_socket(peer_addr).await;
    let conn = timeout(
        Duration::from_secs(5),
        Connection::connect(socket, fast_config()),
    )
    .await
    .expect("connect timed out")
    .expect("connect failed");

    let err = conn.write(b"payload").await.expect_err("write is reserved");
    assert!(matches!(err, Error::DataTransferUnsupported));

    timeout(Duration::from_secs(5), peer_task)
        .await
        .unwrap()
        .unwrap();
    drop(conn);
}
