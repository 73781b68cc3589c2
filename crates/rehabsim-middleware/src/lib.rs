//! `rehabsim-middleware` – the frontend link.
//!
//! # Modules
//!
//! - [`wire`] – positional big-endian codec for [`MotorState`], patient
//!   selections and control commands.
//! - [`frame`] – the 3-byte `{type, length}` header and a
//!   [`FrameDecoder`] that reassembles messages from a byte stream.
//! - [`server`] – [`SimServer`]: TCP command listener with `'X'`
//!   acknowledgements, per-tick UDP snapshots and simulated packet loss.
//!
//! [`MotorState`]: rehabsim_types::MotorState

pub mod frame;
pub mod server;
pub mod wire;

pub use frame::{FrameDecoder, Inbound, MessageHeader, MessageType, encode_frame};
pub use server::{ACK, ServerError, SimServer, StopReason, Stopped, encode_snapshot};
pub use wire::{WireDecode, WireEncode, WireError, WireReader, WireWriter};
