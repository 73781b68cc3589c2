//! Message framing on the command stream.
//!
//! Every inbound message is preceded by a 3-byte header:
//!
//! ```text
//! +--------+----------------+
//! | type u8| length u16 BE  |  payload (length bytes) ...
//! +--------+----------------+
//! ```

use rehabsim_types::{ControlCommand, PatientSelect};

use crate::wire::{WireDecode, WireError};

pub const HEADER_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    PatientSelect = 1,
    Control = 2,
}

impl TryFrom<u8> for MessageType {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::PatientSelect),
            2 => Ok(Self::Control),
            other => Err(WireError::UnknownMessageType(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub msg_type: MessageType,
    pub length: u16,
}

impl MessageHeader {
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let [hi, lo] = self.length.to_be_bytes();
        [self.msg_type as u8, hi, lo]
    }

    pub fn decode(bytes: [u8; HEADER_LEN]) -> Result<Self, WireError> {
        let msg_type = MessageType::try_from(bytes[0])?;
        let length = u16::from_be_bytes([bytes[1], bytes[2]]);
        if length == 0 {
            return Err(WireError::EmptyFrame);
        }
        Ok(Self { msg_type, length })
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    PatientSelect(PatientSelect),
    Control(ControlCommand),
}

impl Inbound {
    pub fn msg_type(&self) -> MessageType {
        match self {
            Self::PatientSelect(_) => MessageType::PatientSelect,
            Self::Control(_) => MessageType::Control,
        }
    }
}

/// Header plus payload, ready to write to the stream.
pub fn encode_frame(msg_type: MessageType, payload: &[u8]) -> Result<Vec<u8>, WireError> {
    let length = u16::try_from(payload.len()).map_err(|_| WireError::OversizedFrame(payload.len()))?;
    let header = MessageHeader { msg_type, length };
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(payload);
    Ok(out)
}

// ─────────────────────────────────────────────────────────────────────────────
// FrameDecoder
// ─────────────────────────────────────────────────────────────────────────────

/// Reassembles messages from arbitrarily split reads.
///
/// Bytes go in with [`push`](Self::push); complete messages come out of
/// [`next_frame`](Self::next_frame) in arrival order.  Any error leaves
/// the stream unsynchronised and the connection should be dropped.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes received but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn next_frame(&mut self) -> Result<Option<Inbound>, WireError> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let header = MessageHeader::decode([self.buf[0], self.buf[1], self.buf[2]])?;
        let end = HEADER_LEN + usize::from(header.length);
        if self.buf.len() < end {
            return Ok(None);
        }
        let payload: Vec<u8> = self.buf.drain(..end).skip(HEADER_LEN).collect();
        let message = match header.msg_type {
            MessageType::PatientSelect => Inbound::PatientSelect(PatientSelect::from_wire(&payload)?),
            MessageType::Control => Inbound::Control(ControlCommand::from_wire(&payload)?),
        };
        Ok(Some(message))
    }
}
