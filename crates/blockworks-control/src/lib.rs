//! `blockworks-control` – Controllers and the programs that schedule them.
//!
//! # Modules
//!
//! - [`seek`] – the fixed-speed, tolerance-band position-seeking law.
//! - [`drill_rig`] – [`DrillRigController`][drill_rig::DrillRigController]:
//!   sweeps a hinge through full rotations and extends a piston one
//!   increment per rotation until the maximum extension is reached.
//! - [`elevator`] – [`ElevatorController`][elevator::ElevatorController]:
//!   drives a piston group to a named floor height.
//! - [`program`] – [`Program`][program::Program] plus the drill rig and
//!   elevator programs that resolve blocks and parse operator commands.
//! - [`host`] – [`ProgramHost`][host::ProgramHost]: invokes programs on the
//!   schedule they request.

pub mod drill_rig;
pub mod elevator;
pub mod host;
pub mod program;
pub mod seek;

pub use drill_rig::{DrillRigBlocks, DrillRigController, RigPhase, TickOutcome};
pub use elevator::{ElevatorController, ElevatorOutcome};
pub use host::ProgramHost;
pub use program::{DrillRigProgram, ElevatorProgram, Program};
