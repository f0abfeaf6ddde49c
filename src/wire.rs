//! Wire-format definitions for mtcp control segments.
//!
//! Every datagram exchanged with the peer starts with a 4-byte control
//! header.  This module is responsible for:
//! - Defining the on-wire binary layout (mode tag, sequence/ack number).
//! - Packing a header into a byte buffer ready for transmission.
//! - Unpacking a raw byte slice back into (mode, seq/ack), returning errors
//!   for malformed or truncated input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! | mode  |        sequence / acknowledgment number (28 bits)      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |              payload block (SEGMENT_SIZE bytes, DATA only)    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The mode occupies the top 4 bits of byte 0; the remaining 28 bits carry
//! the sequence/ack number.  Handshake segments are exactly [`HEADER_LEN`]
//! bytes; only DATA segments carry the fixed payload block.

use crate::error::{Error, Result};

/// Byte length of the control header on the wire.
pub const HEADER_LEN: usize = 4;

/// Fixed size of the payload block carried by DATA segments.
pub const SEGMENT_SIZE: usize = 1024;

/// Largest sequence/ack number representable in the 28-bit field.
pub const MAX_SEQ_ACK: u32 = (1 << 28) - 1;

/// Largest mode value representable in the 4-bit field.
const MAX_MODE: u8 = 0x0F;

// ---------------------------------------------------------------------------
// Raw header codec
// ---------------------------------------------------------------------------

/// Pack `mode` and `seq_ack` into a 4-byte control header.
///
/// Rejects (rather than silently truncating) a mode wider than 4 bits or a
/// sequence number wider than 28 bits.
pub fn encode_header(mode: u8, seq_ack: u32) -> Result<[u8; HEADER_LEN]> {
    if mode > MAX_MODE {
        return Err(Error::InvalidMode(mode));
    }
    if seq_ack > MAX_SEQ_ACK {
        return Err(Error::SeqOutOfRange(seq_ack));
    }
    let mut buf = seq_ack.to_be_bytes();
    buf[0] |= mode << 4;
    Ok(buf)
}

/// Unpack a control header from the front of `buf`.
///
/// Returns the raw `(mode, seq_ack)` pair.  Fails with
/// [`Error::MalformedHeader`] when fewer than [`HEADER_LEN`] bytes are
/// supplied; any 4-bit mode value round-trips, valid or not.
pub fn decode_header(buf: &[u8]) -> Result<(u8, u32)> {
    if buf.len() < HEADER_LEN {
        return Err(Error::MalformedHeader {
            got: buf.len(),
            need: HEADER_LEN,
        });
    }
    let mode = buf[0] >> 4;
    // Mask out the mode nibble before reading the 28-bit number.
    let word = [buf[0] & MAX_MODE, buf[1], buf[2], buf[3]];
    Ok((mode, u32::from_be_bytes(word)))
}

// ---------------------------------------------------------------------------
// ControlMode
// ---------------------------------------------------------------------------

/// The 4-bit tag identifying a segment's purpose.
///
/// Wire values are fixed by the protocol; 6–15 are unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlMode {
    /// Connection-establishment request.
    Syn = 0,
    /// Server's reply to a SYN.
    SynAck = 1,
    /// Teardown request.
    Fin = 2,
    /// Server's reply to a FIN.
    FinAck = 3,
    /// Acknowledgment (data phase, and the final leg of both handshakes).
    Ack = 4,
    /// Bulk data segment (reserved; unused by the handshake).
    Data = 5,
}

impl ControlMode {
    /// Map a raw 4-bit wire value onto a known mode.
    pub fn from_wire(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Syn),
            1 => Ok(Self::SynAck),
            2 => Ok(Self::Fin),
            3 => Ok(Self::FinAck),
            4 => Ok(Self::Ack),
            5 => Ok(Self::Data),
            other => Err(Error::UnknownMode(other)),
        }
    }
}

impl std::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Syn => "SYN",
            Self::SynAck => "SYN_ACK",
            Self::Fin => "FIN",
            Self::FinAck => "FIN_ACK",
            Self::Ack => "ACK",
            Self::Data => "DATA",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// A complete protocol datagram: control header plus optional payload block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub mode: ControlMode,
    pub seq_ack: u32,
    /// Empty for handshake segments; exactly [`SEGMENT_SIZE`] bytes for DATA.
    pub payload: Vec<u8>,
}

impl Segment {
    /// Build a payload-less control segment (everything except DATA).
    pub fn control(mode: ControlMode, seq_ack: u32) -> Self {
        Self {
            mode,
            seq_ack,
            payload: Vec::new(),
        }
    }

    /// Build a DATA segment, zero-padding `data` into the fixed block.
    ///
    /// # Panics
    ///
    /// Panics when `data` is longer than [`SEGMENT_SIZE`].
    pub fn data(seq_ack: u32, data: &[u8]) -> Self {
        assert!(
            data.len() <= SEGMENT_SIZE,
            "payload of {} bytes exceeds the {SEGMENT_SIZE}-byte block",
            data.len()
        );
        let mut payload = vec![0u8; SEGMENT_SIZE];
        payload[..data.len()].copy_from_slice(data);
        Self {
            mode: ControlMode::Data,
            seq_ack,
            payload,
        }
    }

    /// Serialise this segment into a newly allocated byte vector.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let header = encode_header(self.mode as u8, self.seq_ack)?;
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&header);
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Parse a [`Segment`] from a raw datagram.
    ///
    /// Bytes beyond the header are the payload block; handshake segments
    /// carry none.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let (raw_mode, seq_ack) = decode_header(buf)?;
        let mode = ControlMode::from_wire(raw_mode)?;
        Ok(Self {
            mode,
            seq_ack,
            payload: buf[HEADER_LEN..].to_vec(),
        })
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_modes_and_boundary_seqs() {
        for mode in 0u8..=15 {
            for seq in [0u32, 1, 42, 100, MAX_SEQ_ACK / 2, MAX_SEQ_ACK] {
                let bytes = encode_header(mode, seq).unwrap();
                assert_eq!(decode_header(&bytes).unwrap(), (mode, seq));
            }
        }
    }

    #[test]
    fn mode_occupies_top_nibble_of_byte_zero() {
        let bytes = encode_header(ControlMode::Data as u8, 0).unwrap();
        assert_eq!(bytes, [0x50, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn seq_ack_is_big_endian_under_the_mode_nibble() {
        let bytes = encode_header(ControlMode::Syn as u8, 0x0102_0304).unwrap();
        assert_eq!(bytes, [0x01, 0x02, 0x03, 0x04]);

        let bytes = encode_header(ControlMode::SynAck as u8, 0x0102_0304).unwrap();
        assert_eq!(bytes, [0x11, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn encode_rejects_wide_mode() {
        assert!(matches!(
            encode_header(16, 0),
            Err(Error::InvalidMode(16))
        ));
    }

    #[test]
    fn encode_rejects_wide_seq() {
        assert!(matches!(
            encode_header(0, MAX_SEQ_ACK + 1),
            Err(Error::SeqOutOfRange(_))
        ));
    }

    #[test]
    fn decode_rejects_short_buffer() {
        for len in 0..HEADER_LEN {
            let buf = vec![0u8; len];
            assert!(matches!(
                decode_header(&buf),
                Err(Error::MalformedHeader { got, need: 4 }) if got == len
            ));
        }
    }

    #[test]
    fn segment_decode_rejects_unassigned_mode() {
        let bytes = encode_header(0x0A, 7).unwrap();
        assert!(matches!(
            Segment::decode(&bytes),
            Err(Error::UnknownMode(0x0A))
        ));
    }

    #[test]
    fn control_segment_roundtrip() {
        let seg = Segment::control(ControlMode::SynAck, 100);
        let decoded = Segment::decode(&seg.encode().unwrap()).unwrap();
        assert_eq!(decoded, seg);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn data_segment_pads_payload_to_fixed_block() {
        let seg = Segment::data(9, b"hello");
        assert_eq!(seg.payload.len(), SEGMENT_SIZE);
        assert_eq!(&seg.payload[..5], b"hello");
        assert!(seg.payload[5..].iter().all(|&b| b == 0));

        let bytes = seg.encode().unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + SEGMENT_SIZE);
        let decoded = Segment::decode(&bytes).unwrap();
        assert_eq!(decoded, seg);
    }

    #[test]
    fn control_segment_encodes_to_header_only() {
        let bytes = Segment::control(ControlMode::Fin, 3).encode().unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
    }
}
