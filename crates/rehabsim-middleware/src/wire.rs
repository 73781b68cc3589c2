//! Positional binary codec.
//!
//! Messages are flattened field by field in declaration order with no
//! names or tags, the layout LabVIEW's *Flatten To String* produces:
//!
//! | Type | Encoding |
//! |---|---|
//! | `bool` | 1 byte, `0` or `1` |
//! | float | 4-byte IEEE-754 single, big-endian |
//! | integer / enum | 1 byte, unsigned |
//! | string | 4-byte big-endian signed length, then UTF-8 bytes |

use rehabsim_types::{ControlCommand, MotorState, PatientSelect, PerturbationPhase, RomState, SimError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WireError {
    #[error("Truncated payload: needed {needed} bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },

    #[error("Negative string length: {0}")]
    NegativeStringLength(i32),

    #[error("String is not valid UTF-8")]
    InvalidUtf8,

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    #[error("Unknown message type: {0}")]
    UnknownMessageType(u8),

    #[error("Zero-length frame")]
    EmptyFrame,

    #[error("Payload of {0} bytes does not fit a frame")]
    OversizedFrame(usize),

    #[error("String of {0} bytes does not fit the length prefix")]
    StringTooLong(usize),

    #[error(transparent)]
    Value(#[from] SimError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Writer / reader
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Narrowed to single precision on the wire.
    pub fn put_f32(&mut self, v: f64) {
        self.buf.extend_from_slice(&(v as f32).to_be_bytes());
    }

    pub fn put_str(&mut self, v: &str) -> Result<(), WireError> {
        let len = i32::try_from(v.len()).map_err(|_| WireError::StringTooLong(v.len()))?;
        self.buf.extend_from_slice(&len.to_be_bytes());
        self.buf.extend_from_slice(v.as_bytes());
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let remaining = self.data.len() - self.pos;
        if n > remaining {
            return Err(WireError::Truncated { needed: n, remaining });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn get_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.get_u8()? != 0)
    }

    pub fn get_u8(&mut self) -> Result<u8, WireError> {
        let [b] = self.take_array::<1>()?;
        Ok(b)
    }

    pub fn get_f32(&mut self) -> Result<f64, WireError> {
        Ok(f64::from(f32::from_be_bytes(self.take_array()?)))
    }

    pub fn get_str(&mut self) -> Result<String, WireError> {
        let len = i32::from_be_bytes(self.take_array()?);
        let len = usize::try_from(len).map_err(|_| WireError::NegativeStringLength(len))?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8)
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Fail if anything is left unread.
    pub fn finish(self) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(WireError::TrailingBytes(n)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message codecs
// ─────────────────────────────────────────────────────────────────────────────

pub trait WireEncode {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError>;

    fn to_wire(&self) -> Result<Vec<u8>, WireError> {
        let mut w = WireWriter::new();
        self.encode(&mut w)?;
        Ok(w.into_bytes())
    }
}

pub trait WireDecode: Sized {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError>;

    /// Decode a complete payload; trailing bytes are an error.
    fn from_wire(bytes: &[u8]) -> Result<Self, WireError> {
        let mut r = WireReader::new(bytes);
        let value = Self::decode(&mut r)?;
        r.finish()?;
        Ok(value)
    }
}

impl WireEncode for MotorState {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_f32(self.position);
        w.put_f32(self.starting_position);
        w.put_f32(self.target_position);
        w.put_f32(self.time);
        w.put_f32(self.force);
        w.put_u8(u8::try_from(self.trial_nr).unwrap_or(u8::MAX));
        w.put_u8(self.rom_state.into());
        w.put_u8(self.perturbation_phase.into());
        w.put_bool(self.left_hand);
        w.put_bool(self.target_state);
        w.put_bool(self.finished);
        w.put_bool(self.flexion);
        Ok(())
    }
}

impl WireDecode for MotorState {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            position: r.get_f32()?,
            starting_position: r.get_f32()?,
            target_position: r.get_f32()?,
            time: r.get_f32()?,
            force: r.get_f32()?,
            trial_nr: u32::from(r.get_u8()?),
            rom_state: RomState::try_from(r.get_u8()?)?,
            perturbation_phase: PerturbationPhase::try_from(r.get_u8()?)?,
            left_hand: r.get_bool()?,
            target_state: r.get_bool()?,
            finished: r.get_bool()?,
            flexion: r.get_bool()?,
        })
    }
}

impl WireEncode for PatientSelect {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_bool(self.left_hand);
        w.put_u8(self.task);
        w.put_str(&self.subject_nr)?;
        w.put_str(&self.date_time)
    }
}

impl WireDecode for PatientSelect {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            left_hand: r.get_bool()?,
            task: r.get_u8()?,
            subject_nr: r.get_str()?,
            date_time: r.get_str()?,
        })
    }
}

impl WireEncode for ControlCommand {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_bool(self.emergency_stop);
        w.put_bool(self.start);
        w.put_bool(self.restart);
        w.put_bool(self.frontend_started);
        w.put_bool(self.close);
        Ok(())
    }
}

impl WireDecode for ControlCommand {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            emergency_stop: r.get_bool()?,
            start: r.get_bool()?,
            restart: r.get_bool()?,
            frontend_started: r.get_bool()?,
            close: r.get_bool()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motor_state_layout() {
        let mut m = MotorState::new(true);
        m.position = 1.5;
        m.trial_nr = 3;
        m.rom_state = RomState::PassiveMotion;
        m.target_state = true;
        let bytes = m.to_wire().unwrap();
        assert_eq!(bytes.len(), 5 * 4 + 3 + 4);
        assert_eq!(&bytes[0..4], &1.5f32.to_be_bytes());
        assert_eq!(&bytes[4..8], &30.0f32.to_be_bytes());
        assert_eq!(bytes[20], 3);
        assert_eq!(bytes[21], 1);
        assert_eq!(bytes[22], 0);
        assert_eq!(&bytes[23..], &[1, 1, 0, 1]);
    }

    #[test]
    fn trial_number_saturates_at_one_byte() {
        let m = MotorState {
            trial_nr: 1000,
            ..MotorState::default()
        };
        assert_eq!(m.to_wire().unwrap()[20], 255);
    }

    #[test]
    fn patient_select_decodes_labview_bytes() {
        let mut bytes = vec![1, 5];
        bytes.extend_from_slice(&3i32.to_be_bytes());
        bytes.extend_from_slice(b"S07");
        bytes.extend_from_slice(&0i32.to_be_bytes());
        let p = PatientSelect::from_wire(&bytes).unwrap();
        assert!(p.left_hand);
        assert_eq!(p.task, 5);
        assert_eq!(p.subject_nr, "S07");
        assert_eq!(p.date_time, "");
    }

    #[test]
    fn control_command_positions() {
        let cmd = ControlCommand::from_wire(&[0, 1, 0, 0, 0]).unwrap();
        assert!(cmd.start);
        assert!(!cmd.emergency_stop);
        assert_eq!(cmd.to_wire().unwrap(), vec![0, 1, 0, 0, 0]);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        assert_eq!(
            ControlCommand::from_wire(&[0, 1]),
            Err(WireError::Truncated { needed: 1, remaining: 0 })
        );
        let mut bytes = vec![0, 1];
        bytes.extend_from_slice(&10i32.to_be_bytes());
        bytes.extend_from_slice(b"abc");
        assert!(matches!(
            PatientSelect::from_wire(&bytes),
            Err(WireError::Truncated { needed: 10, remaining: 3 })
        ));
    }

    #[test]
    fn bad_strings_are_rejected() {
        let mut bytes = vec![0, 1];
        bytes.extend_from_slice(&(-1i32).to_be_bytes());
        assert_eq!(PatientSelect::from_wire(&bytes), Err(WireError::NegativeStringLength(-1)));

        let mut bytes = vec![0, 1];
        bytes.extend_from_slice(&2i32.to_be_bytes());
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(&0i32.to_be_bytes());
        assert_eq!(PatientSelect::from_wire(&bytes), Err(WireError::InvalidUtf8));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        assert_eq!(ControlCommand::from_wire(&[0; 6]), Err(WireError::TrailingBytes(1)));
    }

    #[test]
    fn invalid_enum_in_snapshot_is_rejected() {
        let mut bytes = MotorState::default().to_wire().unwrap();
        bytes[21] = 9;
        assert!(matches!(MotorState::from_wire(&bytes), Err(WireError::Value(_))));
    }
}
