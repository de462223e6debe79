//! [`ProgramHost`] – tick scheduler for installed programs.
//!
//! The host owns every [`Program`] and a monotonically increasing tick
//! counter.  Each program's [`UpdateFrequency`] is read once at install time;
//! [`ProgramHost::tick`] invokes the programs due on the new tick, one after
//! the other, and [`ProgramHost::run`] delivers a terminal command to a
//! single program.  Programs never overlap and never re-enter.

use blockworks_types::{BlockError, UpdateFrequency, UpdateType};
use tracing::{debug, error};

use crate::program::Program;

struct Installed {
    program: Box<dyn Program>,
    frequency: UpdateFrequency,
}

/// Runs programs on their requested schedules.
#[derive(Default)]
pub struct ProgramHost {
    programs: Vec<Installed>,
    tick: u64,
}

impl ProgramHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `program` and return its index for [`run`][Self::run].
    pub fn install(&mut self, program: Box<dyn Program>) -> usize {
        let frequency = program.update_frequency();
        debug!(program = program.name(), ?frequency, "program installed");
        self.programs.push(Installed { program, frequency });
        self.programs.len() - 1
    }

    /// Ticks elapsed since the host was created.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Schedule requested by the program at `index`.
    pub fn frequency(&self, index: usize) -> Option<UpdateFrequency> {
        self.programs.get(index).map(|p| p.frequency)
    }

    /// Advance one tick and invoke every program that is due.
    ///
    /// A failing program does not prevent the others from running; the
    /// first error is returned after all due programs have run.
    pub fn tick(&mut self) -> Result<(), BlockError> {
        self.tick += 1;
        let mut first_error = None;

        for installed in &mut self.programs {
            let Some(update) = installed.frequency.update_type() else {
                continue;
            };
            if !installed.frequency.is_due(self.tick) {
                continue;
            }
            if let Err(e) = installed.program.main("", update) {
                error!(program = installed.program.name(), tick = self.tick, error = %e, "program failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Deliver a terminal command to the program at `index`.  Unknown
    /// indices are ignored.
    pub fn run(&mut self, index: usize, argument: &str) -> Result<(), BlockError> {
        let Some(installed) = self.programs.get_mut(index) else {
            return Ok(());
        };
        debug!(program = installed.program.name(), argument, "terminal command");
        installed
            .program
            .main(argument, UpdateType::Terminal)
            .inspect_err(|e| {
                error!(program = installed.program.name(), error = %e, "program failed");
            })
    }

    /// Call every program's save hook.
    pub fn save_all(&self) {
        for installed in &self.programs {
            installed.program.save();
        }
    }
}
