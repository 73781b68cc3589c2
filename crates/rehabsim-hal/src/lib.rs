//! `rehabsim-hal` – simulated device plumbing.
//!
//! The pieces a task script needs to drive the simulated robot:
//!
//! | Module | Provides |
//! |---|---|
//! | [`timer`] | [`Timer`], a polled deadline |
//! | [`auto_mover`] | [`AutoMover`], linear and sum-of-sines trajectory playback |
//! | [`perturbation`] | [`Perturbation`], spring / ramp / step disturbance velocities |
//! | [`input`] | [`InputHandler`], raw input → force and velocity |
//! | [`source`] | [`InputSource`] implementations standing in for the patient |
//!
//! Everything here is driven by an explicit `now: Instant`, never by reading
//! the clock itself.

pub mod auto_mover;
pub mod input;
pub mod perturbation;
pub mod source;
pub mod timer;

pub use auto_mover::{AutoMover, SineTerm};
pub use input::{InputHandler, PerturbationHandle};
pub use perturbation::{Perturbation, PerturbationKind};
pub use source::InputSource;
pub use timer::Timer;
