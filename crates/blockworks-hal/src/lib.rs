//! `blockworks-hal` – Block handles and the simulated grid.
//!
//! # Modules
//!
//! - [`block`] – [`Piston`], [`MotorStator`] and [`Drill`]: the handle
//!   traits controllers command.
//! - [`echo`] – [`Echo`]: operator-facing text output of a program.
//! - [`registry`] – [`BlockRegistry`]: name and group lookup of block
//!   handles.
//! - [`sim`] – [`SimGrid`][sim::SimGrid]: in-process blocks with simple
//!   kinematics so controllers can run without the game.

pub mod block;
pub mod echo;
pub mod registry;
pub mod sim;

pub use block::{Drill, MotorStator, Piston};
pub use echo::{BufferEcho, Echo, TracingEcho};
pub use registry::BlockRegistry;
