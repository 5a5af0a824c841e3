//! Binary packet codec for the RCON wire format.
//!
//! Every frame has the same little-endian layout:
//!
//! ```text
//! | size: i32 | request_id: i32 | type: i32 | payload (UTF-8) | 0x00 0x00 |
//! ```
//!
//! `size` counts everything after the size field itself, so it is always
//! `8 + payload length + 2`. The codec is pure: it never touches the
//! transport and holds no state.

use crate::{RconError, Result};

/// Smallest valid frame body: two i32 header fields plus the two trailing
/// null bytes of an empty payload.
pub const MIN_FRAME_SIZE: usize = 10;

/// Largest frame body the protocol allows. A declared size above this is a
/// protocol violation, not a long response.
pub const MAX_FRAME_SIZE: usize = 4096;

/// Wire type of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// A response or acknowledgement from the server.
    ResponseValue = 0,
    /// A command to execute. The server reuses this value as the type of its
    /// auth response; which meaning applies depends on conversation state.
    ExecCommand = 2,
    /// Initiates the password handshake.
    Auth = 3,
}

impl PacketKind {
    fn from_wire(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(PacketKind::ResponseValue),
            2 => Ok(PacketKind::ExecCommand),
            3 => Ok(PacketKind::Auth),
            other => Err(RconError::Protocol(format!(
                "unknown packet type: {other}"
            ))),
        }
    }
}

/// One unit of wire exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub request_id: i32,
    pub kind: PacketKind,
    pub payload: String,
}

impl Packet {
    pub fn new(request_id: i32, kind: PacketKind, payload: impl Into<String>) -> Self {
        Packet {
            request_id,
            kind,
            payload: payload.into(),
        }
    }

    /// Encode the packet for sending, including the leading size field.
    pub fn encode(&self) -> Vec<u8> {
        let payload = self.payload.as_bytes();
        let size = 4 + 4 + payload.len() + 2;

        let mut buf = Vec::with_capacity(4 + size);
        buf.extend_from_slice(&(size as i32).to_le_bytes());
        buf.extend_from_slice(&self.request_id.to_le_bytes());
        buf.extend_from_slice(&(self.kind as i32).to_le_bytes());
        buf.extend_from_slice(payload);
        buf.extend_from_slice(&[0x00, 0x00]);
        buf
    }

    /// Decode a frame body, the bytes after the size field.
    ///
    /// Malformed text never fails: byte sequences that are not valid UTF-8
    /// decode to replacement characters. Only a malformed length or an
    /// unknown type is an error.
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < MIN_FRAME_SIZE {
            return Err(RconError::Protocol(format!(
                "frame body too short: {} bytes",
                body.len()
            )));
        }
        if body.len() > MAX_FRAME_SIZE {
            return Err(RconError::Protocol(format!(
                "frame body too long: {} bytes",
                body.len()
            )));
        }

        let request_id = i32::from_le_bytes(body[0..4].try_into().unwrap());
        let raw_kind = i32::from_le_bytes(body[4..8].try_into().unwrap());

        // Payload sits between the header and the two trailing null bytes.
        let payload = String::from_utf8_lossy(&body[8..body.len() - 2]).into_owned();

        Ok(Packet {
            request_id,
            kind: PacketKind::from_wire(raw_kind)?,
            payload,
        })
    }
}
