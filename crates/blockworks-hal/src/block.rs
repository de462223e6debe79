//! Block traits for the mechanical parts a controller drives: pistons,
//! rotor/hinge stators, and drill heads.
//!
//! A handle is a proxy for a block owned by the host grid.  Controllers hold
//! handles as `Arc<dyn …>` obtained from a
//! [`BlockRegistry`][crate::registry::BlockRegistry]; they never own the
//! block itself, so every setter takes `&self`.

use std::f32::consts::TAU;

use blockworks_types::BlockError;

/// A linear actuator.  Positions and limits are in metres, velocity in m/s.
pub trait Piston: Send + Sync {
    /// Terminal name of the block, e.g. `"RPiston"`.
    fn name(&self) -> &str;

    /// Current extension.
    fn position(&self) -> f32;

    /// Last commanded velocity.
    fn velocity(&self) -> f32;

    /// Command a velocity.  Positive extends, negative retracts.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::Fault`] if the block cannot accept commands.
    fn set_velocity(&self, velocity: f32) -> Result<(), BlockError>;

    fn min_limit(&self) -> f32;

    fn max_limit(&self) -> f32;

    /// Move the upper travel limit.  The piston stops extending once its
    /// position reaches this value.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::Fault`] if the block cannot accept commands.
    fn set_max_limit(&self, limit: f32) -> Result<(), BlockError>;
}

/// A rotor or hinge.  Angles in radians.
pub trait MotorStator: Send + Sync {
    fn name(&self) -> &str;

    /// Current angle, accumulated since the block was built.  Double
    /// precision so small per-tick steps still register after thousands of
    /// rotations.
    fn angle(&self) -> f64;

    /// Last commanded angular velocity in rad/s.
    fn target_velocity_rad(&self) -> f32;

    /// Command an angular velocity in rad/s.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::Fault`] if the block cannot accept commands.
    fn set_target_velocity_rad(&self, rad_per_sec: f32) -> Result<(), BlockError>;

    /// Last commanded angular velocity in revolutions per minute.
    fn target_velocity_rpm(&self) -> f32 {
        self.target_velocity_rad() * 60.0 / TAU
    }

    /// Command an angular velocity in revolutions per minute.
    fn set_target_velocity_rpm(&self, rpm: f32) -> Result<(), BlockError> {
        self.set_target_velocity_rad(rpm * TAU / 60.0)
    }

    fn is_locked(&self) -> bool;

    /// Engage or release the rotor lock.  A locked stator holds its angle
    /// regardless of the commanded velocity.
    fn set_locked(&self, locked: bool) -> Result<(), BlockError>;
}

/// A drill head; the only command is on/off.
pub trait Drill: Send + Sync {
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool) -> Result<(), BlockError>;
}
