//! [`DrillRigController`] – rotary drilling rig.
//!
//! A hinge sweeps the drill head through full rotations while a rotor spins
//! it.  After every full hinge rotation the piston behind the hinge is
//! extended by one increment, carving the next shell of a semi-spherical
//! hole.  When the piston reaches its configured maximum the rig stops.
//!
//! ```text
//! Idle ──start──▶ Drilling ──full rotation──▶ extend piston ──▶ Drilling
//!                    │                                            │
//!                    └──stop/reset──▶ Idle      max reached ──▶ Complete
//! ```
//!
//! The hinge angle read from the block accumulates; the controller keeps a
//! zero offset so that its cached angle stays in `[0, 2π)`.

use std::f64::consts::TAU;
use std::sync::Arc;

use blockworks_hal::{BlockRegistry, Drill, MotorStator, Piston};
use blockworks_types::{BlockError, DrillCommand, DrillRigConfig};
use tracing::{debug, info, warn};

// ────────────────────────────────────────────────────────────────────────────
// Block resolution
// ────────────────────────────────────────────────────────────────────────────

/// The four blocks a drill rig drives.
#[derive(Clone)]
pub struct DrillRigBlocks {
    pub piston: Arc<dyn Piston>,
    pub rotor: Arc<dyn MotorStator>,
    pub hinge: Arc<dyn MotorStator>,
    pub drill: Arc<dyn Drill>,
}

impl DrillRigBlocks {
    /// Look up every block named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::MissingBlock`] naming the first block that is
    /// not registered.
    pub fn resolve(registry: &BlockRegistry, config: &DrillRigConfig) -> Result<Self, BlockError> {
        let missing = |name: &str| BlockError::MissingBlock {
            name: name.to_string(),
        };
        Ok(Self {
            piston: registry
                .piston(&config.piston)
                .ok_or_else(|| missing(&config.piston))?,
            rotor: registry
                .motor_stator(&config.rotor)
                .ok_or_else(|| missing(&config.rotor))?,
            hinge: registry
                .motor_stator(&config.hinge)
                .ok_or_else(|| missing(&config.hinge))?,
            drill: registry
                .drill(&config.drill)
                .ok_or_else(|| missing(&config.drill))?,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Where the rig is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigPhase {
    Idle,
    Drilling,
    /// Stopped because the piston reached its maximum extension.
    Complete,
}

/// What a single [`DrillRigController::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Not drilling; no block was touched.
    Idle,
    /// Hinge still sweeping the current shell.
    Rotating,
    /// A full rotation finished and the piston was sent to `target`.
    PistonAdvanced { target: f64 },
    /// Maximum extension reached; the rig stopped itself.
    Completed,
}

/// Wrap an accumulated angle into `[0, 2π)`.
///
/// Returns the wrapped angle and the number of full rotations removed.
/// Negative angles are returned unchanged with zero rotations.
pub fn wrap_angle(angle: f64) -> (f64, u32) {
    if angle < TAU {
        return (angle, 0);
    }
    let mut rotations = (angle / TAU).floor();
    let mut wrapped = angle - rotations * TAU;
    // Division rounding can leave the remainder a hair outside the range.
    if wrapped >= TAU {
        wrapped -= TAU;
        rotations += 1.0;
    } else if wrapped < 0.0 {
        wrapped += TAU;
        rotations -= 1.0;
    }
    (wrapped, rotations as u32)
}

// ────────────────────────────────────────────────────────────────────────────
// Controller
// ────────────────────────────────────────────────────────────────────────────

/// Per-tick controller for the rotary drilling rig.
pub struct DrillRigController {
    blocks: DrillRigBlocks,
    config: DrillRigConfig,
    is_drilling: bool,
    complete: bool,
    /// Last hinge angle relative to `hinge_zero`, in `[0, 2π)`.
    current_hinge_angle: f64,
    /// Last piston position read.
    current_piston_length: f64,
    /// Raw hinge angle that counts as zero for the current rotation.
    hinge_zero: f64,
    /// Extension the piston has been commanded to; never decreases while
    /// drilling.
    extension_target: f64,
}

impl DrillRigController {
    /// Build a controller around already-resolved blocks.  No block is
    /// commanded until [`start`][Self::start].
    pub fn new(blocks: DrillRigBlocks, config: DrillRigConfig) -> Self {
        let current_piston_length = f64::from(blocks.piston.position());
        Self {
            blocks,
            config,
            is_drilling: false,
            complete: false,
            current_hinge_angle: 0.0,
            current_piston_length,
            hinge_zero: 0.0,
            extension_target: current_piston_length,
        }
    }

    pub fn is_drilling(&self) -> bool {
        self.is_drilling
    }

    pub fn phase(&self) -> RigPhase {
        if self.is_drilling {
            RigPhase::Drilling
        } else if self.complete {
            RigPhase::Complete
        } else {
            RigPhase::Idle
        }
    }

    pub fn current_hinge_angle(&self) -> f64 {
        self.current_hinge_angle
    }

    pub fn current_piston_length(&self) -> f64 {
        self.current_piston_length
    }

    pub fn extension_target(&self) -> f64 {
        self.extension_target
    }

    /// Apply an operator command.
    pub fn command(&mut self, command: DrillCommand) -> Result<(), BlockError> {
        match command {
            DrillCommand::Start => self.start(),
            DrillCommand::Stop => self.stop(),
            DrillCommand::Reset => self.reset(),
        }
    }

    /// Begin drilling: drill on, rotor at its nominal speed, hinge sweeping.
    /// Releases the locks a previous [`reset`][Self::reset] engaged and
    /// holds the piston where it is, so a retraction in progress ends here.
    pub fn start(&mut self) -> Result<(), BlockError> {
        self.blocks.piston.set_velocity(0.0)?;
        self.current_piston_length = f64::from(self.blocks.piston.position());
        self.extension_target = self.current_piston_length;
        self.is_drilling = true;
        self.complete = false;

        self.blocks.rotor.set_locked(false)?;
        self.blocks.hinge.set_locked(false)?;
        self.blocks.drill.set_enabled(true)?;
        self.blocks
            .rotor
            .set_target_velocity_rpm(self.config.rotor_rpm)?;
        self.blocks
            .hinge
            .set_target_velocity_rad(self.config.hinge_speed_rad)?;

        info!(extension = self.extension_target, "drill rig started");
        Ok(())
    }

    /// Halt all motion and switch the drill off.
    pub fn stop(&mut self) -> Result<(), BlockError> {
        self.is_drilling = false;

        self.blocks.drill.set_enabled(false)?;
        self.blocks.rotor.set_target_velocity_rpm(0.0)?;
        self.blocks.hinge.set_target_velocity_rad(0.0)?;
        self.blocks.piston.set_velocity(0.0)?;

        info!("drill rig stopped");
        Ok(())
    }

    /// Command every block to stop even if some refuse, after a fault left
    /// [`stop`][Self::stop] unusable.  Returns how many blocks refused.
    pub fn halt(&mut self) -> usize {
        self.is_drilling = false;
        let b = &self.blocks;
        let refused = [
            b.drill.set_enabled(false),
            b.rotor.set_target_velocity_rpm(0.0),
            b.hinge.set_target_velocity_rad(0.0),
            b.piston.set_velocity(0.0),
        ]
        .into_iter()
        .filter_map(Result::err)
        .inspect(|e| warn!(error = %e, "block refused to stop"))
        .count();
        info!(refused, "drill rig halted");
        refused
    }

    /// Stop, retract the piston and lock rotor and hinge.
    ///
    /// The piston is left retracting; it comes to rest on its minimum limit.
    /// The rotor and hinge are locked where they are, not driven home.
    pub fn reset(&mut self) -> Result<(), BlockError> {
        self.stop()?;

        let piston = &self.blocks.piston;
        piston.set_velocity(-self.config.retract_velocity)?;
        if piston.position() <= piston.min_limit() {
            piston.set_velocity(0.0)?;
        }

        self.blocks.rotor.set_locked(true)?;
        self.blocks.rotor.set_target_velocity_rpm(0.0)?;
        self.blocks.hinge.set_locked(true)?;
        self.blocks.hinge.set_target_velocity_rpm(0.0)?;

        self.complete = false;
        self.extension_target = f64::from(piston.min_limit());
        info!("drill rig reset");
        Ok(())
    }

    /// Run one scheduling quantum.  Does nothing unless drilling.
    pub fn tick(&mut self) -> Result<TickOutcome, BlockError> {
        if !self.is_drilling {
            return Ok(TickOutcome::Idle);
        }
        self.advance()
    }

    fn advance(&mut self) -> Result<TickOutcome, BlockError> {
        let max = f64::from(self.config.max_piston_length);

        self.blocks.drill.set_enabled(true)?;
        let raw_angle = self.blocks.hinge.angle();
        self.current_piston_length = f64::from(self.blocks.piston.position());

        if self.current_piston_length >= max {
            return self.finish();
        }

        self.blocks
            .hinge
            .set_target_velocity_rad(self.config.hinge_speed_rad)?;

        let (wrapped, rotations) = wrap_angle(raw_angle - self.hinge_zero);
        self.current_hinge_angle = wrapped;

        let mut outcome = TickOutcome::Rotating;
        if rotations > 0 {
            self.hinge_zero += f64::from(rotations) * TAU;

            if self.extension_target >= max {
                return self.finish();
            }

            self.extension_target =
                (self.extension_target + f64::from(self.config.piston_increment)).min(max);
            self.blocks
                .piston
                .set_max_limit(self.extension_target as f32)?;
            self.blocks
                .piston
                .set_velocity(self.config.piston_velocity())?;

            debug!(
                extension = self.extension_target,
                rotations, "full hinge rotation; extending piston"
            );
            outcome = TickOutcome::PistonAdvanced {
                target: self.extension_target,
            };
        }

        self.blocks
            .rotor
            .set_target_velocity_rpm(self.config.rotor_rpm)?;
        Ok(outcome)
    }

    fn finish(&mut self) -> Result<TickOutcome, BlockError> {
        self.stop()?;
        self.complete = true;
        info!(
            length = self.current_piston_length,
            "maximum extension reached; drilling complete"
        );
        Ok(TickOutcome::Completed)
    }
}
