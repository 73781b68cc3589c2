//! `rehabsim-runtime` – the simulation engine.
//!
//! # Modules
//!
//! - [`simulator`] – [`Simulator`][simulator::Simulator]: owns the device
//!   state, the active task and the input handler; applies patient
//!   selections and control commands and advances everything once per tick.
//! - [`log_sink`] – [`LogSink`][log_sink::LogSink]: receives one row every
//!   few ticks while a session is active.  [`TracingLogSink`] writes them as
//!   structured `tracing` events, [`MemoryLogSink`] keeps them for tests.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs
//!   the global `tracing` subscriber with an optional OTLP span exporter.

pub mod log_sink;
pub mod simulator;
pub mod telemetry;

pub use log_sink::{LogRow, LogSink, MemoryLogSink, SessionInfo, TracingLogSink};
pub use simulator::{ControlOutcome, SessionState, Simulator};
pub use telemetry::{TracerProviderGuard, init_tracing};
