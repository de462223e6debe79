//! [`ElevatorController`] – multi-piston elevator.
//!
//! A group of mechanically parallel pistons lifts one platform.  Each tick
//! every piston is steered toward the requested floor's height on its own;
//! matched pistons converge together, so no cross-piston synchronisation is
//! attempted.  The request is cleared once every piston is within tolerance.

use std::collections::BTreeMap;
use std::sync::Arc;

use blockworks_hal::Piston;
use blockworks_types::{BlockError, ElevatorConfig};
use tracing::{debug, info};

use crate::seek::{seek_velocity, within_tolerance};

/// What a single [`ElevatorController::tick`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum ElevatorOutcome {
    /// No floor requested.
    Idle,
    /// At least one piston is still outside the tolerance band.
    Moving { floor: String },
    /// Every piston arrived; the request has been cleared.
    Arrived { floor: String },
}

/// Per-tick controller for a piston elevator.
pub struct ElevatorController {
    pistons: Vec<Arc<dyn Piston>>,
    floors: BTreeMap<String, f32>,
    speed: f32,
    tolerance: f32,
    target_floor: Option<String>,
}

impl ElevatorController {
    /// Build a controller for `pistons`, all driven as one group.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::EmptyGroup`] when `pistons` is empty.
    pub fn new(pistons: Vec<Arc<dyn Piston>>, config: &ElevatorConfig) -> Result<Self, BlockError> {
        if pistons.is_empty() {
            return Err(BlockError::EmptyGroup {
                group: config.group.clone(),
            });
        }
        Ok(Self {
            pistons,
            floors: config.floors.clone(),
            speed: config.speed,
            tolerance: config.tolerance,
            target_floor: None,
        })
    }

    /// Request a floor.  Returns `false`, leaving any current request in
    /// place, when `floor` is not in the floor table.
    pub fn request_floor(&mut self, floor: &str) -> bool {
        if !self.floors.contains_key(floor) {
            return false;
        }
        info!(floor, "floor requested");
        self.target_floor = Some(floor.to_string());
        true
    }

    pub fn target_floor(&self) -> Option<&str> {
        self.target_floor.as_deref()
    }

    /// Height of the requested floor, if any.
    pub fn target_height(&self) -> Option<f32> {
        self.target_floor
            .as_ref()
            .and_then(|floor| self.floors.get(floor).copied())
    }

    /// Steer every piston toward the requested floor.
    pub fn tick(&mut self) -> Result<ElevatorOutcome, BlockError> {
        let (Some(floor), Some(height)) = (self.target_floor.clone(), self.target_height()) else {
            return Ok(ElevatorOutcome::Idle);
        };

        let mut all_arrived = true;
        for piston in &self.pistons {
            let position = piston.position();
            if !within_tolerance(position, height, self.tolerance) {
                all_arrived = false;
            }
            let velocity = seek_velocity(position, height, self.speed, self.tolerance);
            debug!(piston = piston.name(), position, velocity, "elevator step");
            piston.set_velocity(velocity)?;
        }

        if all_arrived {
            self.target_floor = None;
            info!(floor = %floor, height, "elevator arrived");
            Ok(ElevatorOutcome::Arrived { floor })
        } else {
            Ok(ElevatorOutcome::Moving { floor })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockworks_hal::sim::{SimGrid, SimPiston};

    fn two_floor_config() -> ElevatorConfig {
        ElevatorConfig {
            group: "Lift".to_string(),
            floors: BTreeMap::from([("1".to_string(), 0.0), ("2".to_string(), 2.51)]),
            speed: 0.5,
            tolerance: 0.1,
        }
    }

    fn lift(config: &ElevatorConfig, positions: &[f32]) -> (SimGrid, ElevatorController) {
        let mut grid = SimGrid::new();
        let mut names = Vec::new();
        for (i, &position) in positions.iter().enumerate() {
            let name = format!("p{i}");
            grid = grid.with_piston(SimPiston::new(&name, 10.0).with_position(position));
            names.push(name);
        }
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let grid = grid.with_group(&config.group, &refs);
        let pistons = grid.registry().pistons_in_group(&config.group).unwrap();
        let controller = ElevatorController::new(pistons, config).unwrap();
        (grid, controller)
    }

    #[test]
    fn empty_group_is_rejected() {
        let err = ElevatorController::new(Vec::new(), &two_floor_config())
            .err()
            .unwrap();
        assert_eq!(
            err,
            BlockError::EmptyGroup {
                group: "Lift".to_string()
            }
        );
    }

    #[test]
    fn unknown_floor_leaves_target_unchanged() {
        let (_grid, mut lift) = lift(&ElevatorConfig::default(), &[0.0]);
        assert!(lift.request_floor("3"));
        assert!(!lift.request_floor("5"));
        assert!(!lift.request_floor(""));
        assert_eq!(lift.target_floor(), Some("3"));
    }

    #[test]
    fn idle_without_request() {
        let (grid, mut lift) = lift(&two_floor_config(), &[1.0]);
        grid.registry().piston("p0").unwrap().set_velocity(0.3).unwrap();
        assert_eq!(lift.tick().unwrap(), ElevatorOutcome::Idle);
        assert!((grid.piston("p0").unwrap().snapshot().velocity - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn climbs_to_floor_two_and_clears_request() {
        let config = two_floor_config();
        let (grid, mut lift) = lift(&config, &[0.0]);
        // The elevator runs every 10th tick of a 60 Hz game.
        let dt = 10.0 / 60.0;

        assert!(lift.request_floor("2"));
        let mut arrived = false;
        for _ in 0..100 {
            let outcome = lift.tick().unwrap();
            let piston = grid.piston("p0").unwrap().snapshot();
            match outcome {
                ElevatorOutcome::Moving { .. } => {
                    assert!(piston.position < 2.41);
                    assert!((piston.velocity - 0.5).abs() < f32::EPSILON);
                }
                ElevatorOutcome::Arrived { ref floor } => {
                    assert_eq!(floor, "2");
                    assert!(piston.position >= 2.41 - 1e-5);
                    assert_eq!(piston.velocity, 0.0);
                    arrived = true;
                    break;
                }
                ElevatorOutcome::Idle => panic!("request dropped early"),
            }
            grid.step(dt);
        }
        assert!(arrived);
        assert_eq!(lift.target_floor(), None);
    }

    #[test]
    fn descends_with_negative_velocity() {
        let (grid, mut lift) = lift(&two_floor_config(), &[2.51]);
        lift.request_floor("1");
        assert!(matches!(lift.tick().unwrap(), ElevatorOutcome::Moving { .. }));
        assert!((grid.piston("p0").unwrap().snapshot().velocity + 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn arrived_pistons_hold_while_others_catch_up() {
        let (grid, mut lift) = lift(&two_floor_config(), &[2.5, 1.0]);
        lift.request_floor("2");

        assert!(matches!(lift.tick().unwrap(), ElevatorOutcome::Moving { .. }));
        assert_eq!(grid.piston("p0").unwrap().snapshot().velocity, 0.0);
        assert!((grid.piston("p1").unwrap().snapshot().velocity - 0.5).abs() < f32::EPSILON);
        assert_eq!(lift.target_floor(), Some("2"));
    }

    #[test]
    fn request_already_satisfied_clears_on_first_tick() {
        let (_grid, mut lift) = lift(&two_floor_config(), &[0.05, 0.0]);
        lift.request_floor("1");
        assert_eq!(
            lift.tick().unwrap(),
            ElevatorOutcome::Arrived {
                floor: "1".to_string()
            }
        );
        assert_eq!(lift.target_floor(), None);
    }

    #[test]
    fn broken_piston_surfaces_fault_and_keeps_request() {
        let (grid, mut lift) = lift(&two_floor_config(), &[0.0]);
        lift.request_floor("2");
        grid.piston("p0").unwrap().set_functional(false);
        assert!(matches!(lift.tick(), Err(BlockError::Fault { .. })));
        assert_eq!(lift.target_floor(), Some("2"));
    }
}
