//! In-process simulation grid for headless runs and tests.
//!
//! [`SimGrid`] builds a [`BlockRegistry`] populated with simulated blocks
//! and integrates their motion when [`SimGrid::step`] is called.  Each sim
//! block keeps its state behind a shared handle, so the controller holding
//! the block through the registry, the grid stepping the physics, and a test
//! asserting on the result all see the same block.
//!
//! # Example
//!
//! ```rust
//! use blockworks_hal::block::Piston;
//! use blockworks_hal::sim::{SimGrid, SimPiston, DEFAULT_TICK_SECONDS};
//!
//! let grid = SimGrid::new().with_piston(SimPiston::new("lift", 10.0));
//! let piston = grid.registry().piston("lift").expect("registered");
//!
//! piston.set_velocity(0.6).unwrap();
//! for _ in 0..60 {
//!     grid.step(DEFAULT_TICK_SECONDS);
//! }
//! assert!((piston.position() - 0.6).abs() < 1e-3);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use blockworks_types::{BlockError, DrillRigConfig, ElevatorConfig};

use crate::block::{Drill, MotorStator, Piston};
use crate::registry::BlockRegistry;

/// Length of one game tick (60 ticks per simulated second).
pub const DEFAULT_TICK_SECONDS: f32 = 1.0 / 60.0;

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_functional(name: &str) -> BlockError {
    BlockError::Fault {
        block: name.to_string(),
        details: "block is not functional".to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sim piston
// ────────────────────────────────────────────────────────────────────────────

/// Observable state of a [`SimPiston`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PistonState {
    pub position: f32,
    pub velocity: f32,
    pub min_limit: f32,
    pub max_limit: f32,
    /// Physical stroke; limits can never leave `[0, travel]`.
    pub travel: f32,
    pub functional: bool,
}

/// A simulated piston.  Position is clamped to its limits every step.
#[derive(Clone)]
pub struct SimPiston {
    name: String,
    state: Arc<Mutex<PistonState>>,
}

impl SimPiston {
    /// A retracted piston with limits spanning its full `travel`.
    pub fn new(name: impl Into<String>, travel: f32) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(PistonState {
                position: 0.0,
                velocity: 0.0,
                min_limit: 0.0,
                max_limit: travel,
                travel,
                functional: true,
            })),
        }
    }

    /// Place the piston at `position` (clamped to its limits).
    pub fn with_position(self, position: f32) -> Self {
        {
            let mut s = lock(&self.state);
            s.position = position.clamp(s.min_limit, s.max_limit);
        }
        self
    }

    pub fn snapshot(&self) -> PistonState {
        *lock(&self.state)
    }

    /// Mark the block broken (`false`) or repaired (`true`).  A broken block
    /// rejects commands and does not move.
    pub fn set_functional(&self, functional: bool) {
        lock(&self.state).functional = functional;
    }

    /// Advance the piston by `dt` seconds.
    pub fn step(&self, dt: f32) {
        let mut s = lock(&self.state);
        if !s.functional {
            return;
        }
        s.position = (s.position + s.velocity * dt).clamp(s.min_limit, s.max_limit);
    }
}

impl Piston for SimPiston {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> f32 {
        lock(&self.state).position
    }

    fn velocity(&self) -> f32 {
        lock(&self.state).velocity
    }

    fn set_velocity(&self, velocity: f32) -> Result<(), BlockError> {
        let mut s = lock(&self.state);
        if !s.functional {
            return Err(not_functional(&self.name));
        }
        s.velocity = velocity;
        Ok(())
    }

    fn min_limit(&self) -> f32 {
        lock(&self.state).min_limit
    }

    fn max_limit(&self) -> f32 {
        lock(&self.state).max_limit
    }

    fn set_max_limit(&self, limit: f32) -> Result<(), BlockError> {
        let mut s = lock(&self.state);
        if !s.functional {
            return Err(not_functional(&self.name));
        }
        s.max_limit = limit.clamp(s.min_limit, s.travel);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sim rotor / hinge
// ────────────────────────────────────────────────────────────────────────────

/// Observable state of a [`SimMotorStator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatorState {
    /// Accumulated angle in radians; not wrapped.
    pub angle: f64,
    pub velocity_rad: f32,
    pub locked: bool,
    pub functional: bool,
}

/// A simulated rotor or hinge without angle limits.
#[derive(Clone)]
pub struct SimMotorStator {
    name: String,
    state: Arc<Mutex<StatorState>>,
}

impl SimMotorStator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(StatorState {
                angle: 0.0,
                velocity_rad: 0.0,
                locked: false,
                functional: true,
            })),
        }
    }

    pub fn with_angle(self, angle: f64) -> Self {
        lock(&self.state).angle = angle;
        self
    }

    pub fn snapshot(&self) -> StatorState {
        *lock(&self.state)
    }

    pub fn set_functional(&self, functional: bool) {
        lock(&self.state).functional = functional;
    }

    /// Advance the angle by `dt` seconds unless the lock is engaged.
    pub fn step(&self, dt: f32) {
        let mut s = lock(&self.state);
        if s.functional && !s.locked {
            s.angle += f64::from(s.velocity_rad) * f64::from(dt);
        }
    }
}

impl MotorStator for SimMotorStator {
    fn name(&self) -> &str {
        &self.name
    }

    fn angle(&self) -> f64 {
        lock(&self.state).angle
    }

    fn target_velocity_rad(&self) -> f32 {
        lock(&self.state).velocity_rad
    }

    fn set_target_velocity_rad(&self, rad_per_sec: f32) -> Result<(), BlockError> {
        let mut s = lock(&self.state);
        if !s.functional {
            return Err(not_functional(&self.name));
        }
        s.velocity_rad = rad_per_sec;
        Ok(())
    }

    fn is_locked(&self) -> bool {
        lock(&self.state).locked
    }

    fn set_locked(&self, locked: bool) -> Result<(), BlockError> {
        let mut s = lock(&self.state);
        if !s.functional {
            return Err(not_functional(&self.name));
        }
        s.locked = locked;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sim drill
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DrillState {
    enabled: bool,
    functional: bool,
}

/// A simulated drill head that records whether it is enabled.
#[derive(Clone)]
pub struct SimDrill {
    name: String,
    state: Arc<Mutex<DrillState>>,
}

impl SimDrill {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(DrillState {
                enabled: false,
                functional: true,
            })),
        }
    }

    pub fn set_functional(&self, functional: bool) {
        lock(&self.state).functional = functional;
    }
}

impl Drill for SimDrill {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        lock(&self.state).enabled
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), BlockError> {
        let mut s = lock(&self.state);
        if !s.functional {
            return Err(not_functional(&self.name));
        }
        s.enabled = enabled;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimGrid builder
// ────────────────────────────────────────────────────────────────────────────

/// A simulated construct: the blocks, their registry, and the physics step.
///
/// Call the `with_*` methods to add blocks, then hand
/// [`registry`][Self::registry] to the programs that drive them.
#[derive(Default)]
pub struct SimGrid {
    registry: Arc<BlockRegistry>,
    pistons: Vec<SimPiston>,
    motor_stators: Vec<SimMotorStator>,
    drills: Vec<SimDrill>,
}

impl SimGrid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_piston(mut self, piston: SimPiston) -> Self {
        self.registry.register_piston(Arc::new(piston.clone()));
        self.pistons.push(piston);
        self
    }

    pub fn with_motor_stator(mut self, stator: SimMotorStator) -> Self {
        self.registry.register_motor_stator(Arc::new(stator.clone()));
        self.motor_stators.push(stator);
        self
    }

    pub fn with_drill(mut self, drill: SimDrill) -> Self {
        self.registry.register_drill(Arc::new(drill.clone()));
        self.drills.push(drill);
        self
    }

    pub fn with_group(self, group: impl Into<String>, members: &[&str]) -> Self {
        self.registry
            .register_group(group, members.iter().map(|m| m.to_string()).collect());
        self
    }

    /// Add the piston, rotor, hinge and drill named in `config`.
    pub fn with_drill_rig(self, config: &DrillRigConfig, piston_travel: f32) -> Self {
        self.with_piston(SimPiston::new(&config.piston, piston_travel))
            .with_motor_stator(SimMotorStator::new(&config.rotor))
            .with_motor_stator(SimMotorStator::new(&config.hinge))
            .with_drill(SimDrill::new(&config.drill))
    }

    /// Add `count` retracted pistons named `<group>-Piston-<n>` and register
    /// them as the elevator group from `config`.
    pub fn with_elevator(mut self, config: &ElevatorConfig, count: usize, travel: f32) -> Self {
        let names: Vec<String> = (1..=count)
            .map(|n| format!("{}-Piston-{n}", config.group))
            .collect();
        for name in &names {
            self = self.with_piston(SimPiston::new(name, travel));
        }
        self.registry.register_group(config.group.clone(), names);
        self
    }

    /// Shared handle to the grid's block registry.
    pub fn registry(&self) -> Arc<BlockRegistry> {
        Arc::clone(&self.registry)
    }

    /// Sim-side view of a piston, for inspection.
    pub fn piston(&self, name: &str) -> Option<&SimPiston> {
        self.pistons.iter().find(|p| p.name == name)
    }

    pub fn motor_stator(&self, name: &str) -> Option<&SimMotorStator> {
        self.motor_stators.iter().find(|s| s.name == name)
    }

    pub fn drill(&self, name: &str) -> Option<&SimDrill> {
        self.drills.iter().find(|d| d.name == name)
    }

    /// Pistons added to the grid, in insertion order.
    pub fn pistons(&self) -> &[SimPiston] {
        &self.pistons
    }

    /// Advance every block by `dt` seconds.
    pub fn step(&self, dt: f32) {
        for p in &self.pistons {
            p.step(dt);
        }
        for s in &self.motor_stators {
            s.step(dt);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piston_integrates_and_clamps() {
        let piston = SimPiston::new("p", 2.0);
        piston.set_velocity(1.0).unwrap();
        piston.step(1.5);
        assert!((piston.position() - 1.5).abs() < 1e-6);
        piston.step(1.5);
        assert!((piston.position() - 2.0).abs() < f32::EPSILON);

        piston.set_velocity(-5.0).unwrap();
        piston.step(1.0);
        assert!((piston.position() - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn max_limit_stops_extension_and_is_bounded_by_travel() {
        let piston = SimPiston::new("p", 10.0);
        piston.set_max_limit(0.25).unwrap();
        piston.set_velocity(15.0).unwrap();
        piston.step(DEFAULT_TICK_SECONDS);
        assert!((piston.position() - 0.25).abs() < f32::EPSILON);

        piston.set_max_limit(50.0).unwrap();
        assert!((piston.max_limit() - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn broken_blocks_reject_commands_and_stay_put() {
        let piston = SimPiston::new("p", 10.0);
        piston.set_velocity(1.0).unwrap();
        piston.set_functional(false);
        assert!(matches!(
            piston.set_velocity(2.0),
            Err(BlockError::Fault { .. })
        ));
        piston.step(1.0);
        assert!((piston.position() - 0.0).abs() < f32::EPSILON);

        let drill = SimDrill::new("d");
        drill.set_functional(false);
        assert!(drill.set_enabled(true).is_err());
        assert!(!drill.is_enabled());
    }

    #[test]
    fn locked_stator_holds_angle() {
        let hinge = SimMotorStator::new("h");
        hinge.set_target_velocity_rad(1.0).unwrap();
        hinge.step(0.5);
        hinge.set_locked(true).unwrap();
        hinge.step(0.5);
        assert!((hinge.angle() - 0.5).abs() < 1e-6);
        assert!(hinge.snapshot().locked);
    }

    #[test]
    fn far_wound_hinge_keeps_turning_at_drilling_speed() {
        let speed = DrillRigConfig::default().hinge_speed_rad;
        let hinge = SimMotorStator::new("h").with_angle(600.0);
        hinge.set_target_velocity_rad(speed).unwrap();
        for _ in 0..3600 {
            hinge.step(DEFAULT_TICK_SECONDS);
        }
        // One simulated minute at π/1800 rad/s.
        let expected = 600.0 + f64::from(speed) * 60.0;
        assert!((hinge.angle() - expected).abs() < 1e-6, "{}", hinge.angle());
    }

    #[test]
    fn registry_handles_share_sim_state() {
        let grid = SimGrid::new().with_motor_stator(SimMotorStator::new("RHinge"));
        let handle = grid.registry().motor_stator("RHinge").unwrap();
        handle.set_target_velocity_rad(2.0).unwrap();
        grid.step(0.5);
        let sim = grid.motor_stator("RHinge").unwrap();
        assert!((sim.snapshot().angle - 1.0).abs() < 1e-6);
        assert!((handle.angle() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn drill_rig_and_elevator_presets() {
        let drill = DrillRigConfig::default();
        let lift = ElevatorConfig::default();
        let grid = SimGrid::new()
            .with_drill_rig(&drill, 10.0)
            .with_elevator(&lift, 4, 10.0);
        let registry = grid.registry();

        assert!(registry.piston("RPiston").is_some());
        assert!(registry.motor_stator("RRotor").is_some());
        assert!(registry.motor_stator("RHinge").is_some());
        assert!(registry.drill("RDrill").is_some());
        assert_eq!(
            registry.pistons_in_group("Workshop-Elevator").unwrap().len(),
            4
        );
        assert_eq!(grid.pistons().len(), 5);
    }
}
