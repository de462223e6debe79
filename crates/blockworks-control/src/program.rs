//! [`Program`] – the unit the host schedules, and the two programs that wrap
//! the controllers with block resolution and command parsing.
//!
//! A program is invoked with one argument string and the reason for the
//! invocation.  Scheduled ticks deliver an empty argument; terminal commands
//! deliver whatever the operator typed.  Unrecognised arguments are ignored.

use std::sync::Arc;

use blockworks_hal::{BlockRegistry, Echo};
use blockworks_types::{
    BlockError, DrillCommand, DrillRigConfig, ElevatorConfig, UpdateFrequency, UpdateType,
};
use tracing::{error, warn};

use crate::drill_rig::{DrillRigBlocks, DrillRigController};
use crate::elevator::ElevatorController;

/// Echoed whenever the drill rig cannot resolve one of its blocks.
pub const MISSING_BLOCK_MESSAGE: &str = "Missing block reference.";

/// A script the host runs on a fixed tick schedule.
pub trait Program {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Schedule requested from the host.  Read once, when the program is
    /// installed.
    fn update_frequency(&self) -> UpdateFrequency;

    /// Handle one invocation.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::Fault`] when a block rejects a command.
    fn main(&mut self, argument: &str, update: UpdateType) -> Result<(), BlockError>;

    /// Persist state between sessions.  Nothing outlives the process, so the
    /// default does nothing.
    fn save(&self) {}
}

// ────────────────────────────────────────────────────────────────────────────
// Drill rig program
// ────────────────────────────────────────────────────────────────────────────

/// Runs a [`DrillRigController`] every tick.
///
/// Blocks are resolved on the first invocation.  While any block is missing
/// every invocation echoes [`MISSING_BLOCK_MESSAGE`] and retries the lookup;
/// no block is commanded until all four resolve.  If a block faults, every
/// block that still accepts commands is stopped, the controller is dropped,
/// and the blocks are resolved again on the next invocation.
pub struct DrillRigProgram {
    registry: Arc<BlockRegistry>,
    echo: Arc<dyn Echo>,
    config: DrillRigConfig,
    rig: Option<DrillRigController>,
}

impl DrillRigProgram {
    pub fn new(registry: Arc<BlockRegistry>, echo: Arc<dyn Echo>, config: DrillRigConfig) -> Self {
        Self {
            registry,
            echo,
            config,
            rig: None,
        }
    }

    /// The controller, once its blocks have resolved.
    pub fn rig(&self) -> Option<&DrillRigController> {
        self.rig.as_ref()
    }

    fn setup(&mut self) -> Option<&mut DrillRigController> {
        if self.rig.is_none() {
            match DrillRigBlocks::resolve(&self.registry, &self.config) {
                Ok(blocks) => {
                    self.rig = Some(DrillRigController::new(blocks, self.config.clone()));
                }
                Err(e) => {
                    warn!(error = %e, "drill rig is not configured");
                    self.echo.echo(MISSING_BLOCK_MESSAGE);
                }
            }
        }
        self.rig.as_mut()
    }

    fn run(rig: &mut DrillRigController, argument: &str) -> Result<(), BlockError> {
        if let Some(command) = DrillCommand::parse(argument) {
            rig.command(command)?;
        }
        rig.tick()?;
        Ok(())
    }
}

impl Program for DrillRigProgram {
    fn name(&self) -> &str {
        "drill-rig"
    }

    fn update_frequency(&self) -> UpdateFrequency {
        UpdateFrequency::Update1
    }

    fn main(&mut self, argument: &str, _update: UpdateType) -> Result<(), BlockError> {
        let Some(rig) = self.setup() else {
            return Ok(());
        };
        if let Err(e) = Self::run(rig, argument) {
            error!(error = %e, "drill rig faulted; stopping every block");
            rig.halt();
            self.echo.echo(&e.to_string());
            self.rig = None;
            return Err(e);
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Elevator program
// ────────────────────────────────────────────────────────────────────────────

/// Runs an [`ElevatorController`] every 10th tick.
///
/// The piston group is resolved once, at construction.  A missing or empty
/// group is echoed and leaves the program permanently idle: it requests no
/// ticks and ignores every argument.
pub struct ElevatorProgram {
    elevator: Option<ElevatorController>,
}

impl ElevatorProgram {
    pub fn new(registry: &BlockRegistry, echo: Arc<dyn Echo>, config: &ElevatorConfig) -> Self {
        let elevator = match registry.pistons_in_group(&config.group) {
            Some(pistons) => ElevatorController::new(pistons, config),
            None => Err(BlockError::UnknownGroup {
                group: config.group.clone(),
            }),
        };
        match elevator {
            Ok(elevator) => Self {
                elevator: Some(elevator),
            },
            Err(e) => {
                warn!(error = %e, group = %config.group, "elevator is not configured");
                echo.echo(&format!("No pistons found in the group '{}'.", config.group));
                Self { elevator: None }
            }
        }
    }

    pub fn elevator(&self) -> Option<&ElevatorController> {
        self.elevator.as_ref()
    }
}

impl Program for ElevatorProgram {
    fn name(&self) -> &str {
        "elevator"
    }

    fn update_frequency(&self) -> UpdateFrequency {
        if self.elevator.is_some() {
            UpdateFrequency::Update10
        } else {
            UpdateFrequency::None
        }
    }

    fn main(&mut self, argument: &str, _update: UpdateType) -> Result<(), BlockError> {
        let Some(elevator) = self.elevator.as_mut() else {
            return Ok(());
        };
        elevator.request_floor(argument);
        elevator.tick()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockworks_hal::{BufferEcho, Drill};
    use blockworks_hal::sim::{DEFAULT_TICK_SECONDS, SimDrill, SimGrid, SimMotorStator, SimPiston};

    fn partial_rig(config: &DrillRigConfig) -> SimGrid {
        SimGrid::new()
            .with_piston(SimPiston::new(&config.piston, 10.0))
            .with_motor_stator(SimMotorStator::new(&config.rotor))
            .with_drill(SimDrill::new(&config.drill))
    }

    #[test]
    fn drill_program_echoes_until_blocks_appear() {
        let config = DrillRigConfig::default();
        let grid = partial_rig(&config);
        let echo = BufferEcho::new();
        let mut program = DrillRigProgram::new(grid.registry(), Arc::new(echo.clone()), config.clone());

        program.main("start", UpdateType::Terminal).unwrap();
        program.main("", UpdateType::Update1).unwrap();
        assert_eq!(echo.drain(), vec![MISSING_BLOCK_MESSAGE, MISSING_BLOCK_MESSAGE]);
        assert!(program.rig().is_none());
        assert!(!grid.registry().drill(&config.drill).unwrap().is_enabled());

        // Hinge gets placed; the next invocation resolves.
        grid.registry()
            .register_motor_stator(Arc::new(SimMotorStator::new(&config.hinge)));
        program.main("START", UpdateType::Terminal).unwrap();
        assert!(echo.lines().is_empty());
        assert!(program.rig().unwrap().is_drilling());
        assert!(grid.registry().drill(&config.drill).unwrap().is_enabled());
    }

    #[test]
    fn drill_program_ignores_unknown_commands() {
        let config = DrillRigConfig::default();
        let grid = SimGrid::new().with_drill_rig(&config, 10.0);
        let mut program =
            DrillRigProgram::new(grid.registry(), Arc::new(BufferEcho::new()), config);

        program.main("dance", UpdateType::Terminal).unwrap();
        assert!(!program.rig().unwrap().is_drilling());
        assert_eq!(program.update_frequency(), UpdateFrequency::Update1);
    }

    #[test]
    fn drill_program_drops_rig_on_fault() {
        let config = DrillRigConfig::default();
        let grid = SimGrid::new().with_drill_rig(&config, 10.0);
        let echo = BufferEcho::new();
        let mut program =
            DrillRigProgram::new(grid.registry(), Arc::new(echo.clone()), config.clone());

        program.main("start", UpdateType::Terminal).unwrap();
        grid.piston(&config.piston).unwrap().set_functional(false);
        // Drilling does not touch the piston until a rotation completes, so
        // force a command that does.
        assert!(program.main("stop", UpdateType::Terminal).is_err());
        assert!(program.rig().is_none());
        assert_eq!(echo.lines().len(), 1);
    }

    #[test]
    fn drill_program_fault_stops_the_rig() {
        let config = DrillRigConfig::default();
        let grid = SimGrid::new().with_drill_rig(&config, 10.0);
        let echo = BufferEcho::new();
        let mut program =
            DrillRigProgram::new(grid.registry(), Arc::new(echo.clone()), config.clone());

        program.main("start", UpdateType::Terminal).unwrap();
        grid.drill(&config.drill).unwrap().set_functional(false);
        assert!(program.main("", UpdateType::Update1).is_err());

        let hinge = grid.motor_stator(&config.hinge).unwrap();
        let rotor = grid.motor_stator(&config.rotor).unwrap();
        assert_eq!(hinge.snapshot().velocity_rad, 0.0);
        assert_eq!(rotor.snapshot().velocity_rad, 0.0);

        // The re-resolved rig is idle and the hinge no longer turns.
        let angle = hinge.snapshot().angle;
        for _ in 0..120 {
            program.main("", UpdateType::Update1).unwrap();
            grid.step(DEFAULT_TICK_SECONDS);
        }
        assert_eq!(hinge.snapshot().angle, angle);
        assert!(!program.rig().unwrap().is_drilling());
        assert_eq!(echo.lines().len(), 1);
    }

    #[test]
    fn elevator_program_with_empty_group_stays_idle() {
        let config = ElevatorConfig::default();
        let grid = SimGrid::new().with_group(&config.group, &["ghost"]);
        let echo = BufferEcho::new();
        let mut program = ElevatorProgram::new(&grid.registry(), Arc::new(echo.clone()), &config);

        assert_eq!(
            echo.lines(),
            vec!["No pistons found in the group 'Workshop-Elevator'."]
        );
        assert_eq!(program.update_frequency(), UpdateFrequency::None);
        program.main("2", UpdateType::Terminal).unwrap();
        assert!(program.elevator().is_none());
    }

    #[test]
    fn elevator_program_moves_on_request() {
        let config = ElevatorConfig::default();
        let grid = SimGrid::new().with_elevator(&config, 2, 10.0);
        let mut program =
            ElevatorProgram::new(&grid.registry(), Arc::new(BufferEcho::new()), &config);

        assert_eq!(program.update_frequency(), UpdateFrequency::Update10);
        program.main("3", UpdateType::Terminal).unwrap();
        assert_eq!(program.elevator().unwrap().target_floor(), Some("3"));
        for piston in grid.pistons() {
            assert!((piston.snapshot().velocity - 0.5).abs() < f32::EPSILON);
        }

        // Scheduled ticks carry no argument and keep the request.
        program.main("", UpdateType::Update10).unwrap();
        assert_eq!(program.elevator().unwrap().target_floor(), Some("3"));
    }
}
