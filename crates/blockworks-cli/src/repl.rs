//! REPL – Read-Eval-Print Loop for the Blockworks operator terminal.
//!
//! Supported slash-commands:
//!   /drill <start|stop|reset> – send a command to the drill rig program
//!   /elevator <floor>         – send the elevator to a floor
//!   /tick [n]                 – advance the simulation `n` ticks (default 60)
//!   /status                   – print block positions
//!   /help                     – show this list
//!   /quit | /exit             – stop the rig and exit the CLI

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use blockworks_control::{DrillRigProgram, ElevatorProgram, ProgramHost};
use blockworks_hal::{Drill, Echo, Piston};
use blockworks_hal::sim::SimGrid;
use blockworks_types::BlockError;
use tracing::{info, warn};

use crate::config::Config;

const DEFAULT_TICKS: u32 = 60;

/// A parsed operator line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Drill(String),
    Elevator(String),
    Tick(u32),
    Status,
    Quit,
    /// A known command with an unusable argument; carries the usage hint.
    Usage(&'static str),
    Unknown(String),
}

/// Parse one input line.  Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let command = match head {
        "/help" => Command::Help,
        "/status" => Command::Status,
        "/quit" | "/exit" => Command::Quit,
        "/drill" if rest.is_empty() => Command::Usage("/drill <start|stop|reset>"),
        "/drill" => Command::Drill(rest.to_string()),
        "/elevator" if rest.is_empty() => Command::Usage("/elevator <floor>"),
        "/elevator" => Command::Elevator(rest.to_string()),
        "/tick" if rest.is_empty() => Command::Tick(DEFAULT_TICKS),
        "/tick" => match rest.parse::<u32>() {
            Ok(n) => Command::Tick(n),
            Err(_) => Command::Usage("/tick [n]"),
        },
        other => Command::Unknown(other.to_string()),
    };
    Some(command)
}

/// The simulated grid plus the host running both programs on it.
pub struct Session {
    grid: SimGrid,
    host: ProgramHost,
    config: Config,
    drill: usize,
    elevator: usize,
}

impl Session {
    /// Build the grid described by `config` and install both programs.
    pub fn new(config: Config, echo: Arc<dyn Echo>) -> Self {
        let grid = SimGrid::new()
            .with_drill_rig(&config.drill, config.piston_travel)
            .with_elevator(&config.elevator, config.elevator_pistons, config.piston_travel);

        let mut host = ProgramHost::new();
        let drill = host.install(Box::new(DrillRigProgram::new(
            grid.registry(),
            Arc::clone(&echo),
            config.drill.clone(),
        )));
        let elevator = host.install(Box::new(ElevatorProgram::new(
            &grid.registry(),
            echo,
            &config.elevator,
        )));

        Self {
            grid,
            host,
            config,
            drill,
            elevator,
        }
    }

    pub fn drill(&mut self, argument: &str) -> Result<(), BlockError> {
        self.host.run(self.drill, argument)
    }

    pub fn elevator(&mut self, floor: &str) -> Result<(), BlockError> {
        self.host.run(self.elevator, floor)
    }

    /// Run `n` host ticks, stepping the grid after each.  Every tick runs
    /// even when a program fails; the first failure is returned.
    pub fn tick(&mut self, n: u32) -> Result<(), BlockError> {
        let mut first_error = None;
        for _ in 0..n {
            if let Err(e) = self.host.tick() {
                first_error.get_or_insert(e);
            }
            self.grid.step(self.config.tick_seconds);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.host.ticks()
    }

    /// One line per block of interest.
    pub fn status(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "tick {} ({:.2} s simulated)",
            self.host.ticks(),
            self.host.ticks() as f32 * self.config.tick_seconds
        )];

        let drill = &self.config.drill;
        if let Some(piston) = self.grid.piston(&drill.piston) {
            let s = piston.snapshot();
            lines.push(format!(
                "{}: {:.3} m (limit {:.3}, {:+.3} m/s)",
                drill.piston, s.position, s.max_limit, s.velocity
            ));
        }
        for name in [&drill.hinge, &drill.rotor] {
            if let Some(stator) = self.grid.motor_stator(name) {
                let s = stator.snapshot();
                lines.push(format!(
                    "{}: {:.3} rad ({:+.4} rad/s{})",
                    name,
                    s.angle,
                    s.velocity_rad,
                    if s.locked { ", locked" } else { "" }
                ));
            }
        }
        if let Some(head) = self.grid.drill(&drill.drill) {
            let state = if head.is_enabled() { "on" } else { "off" };
            lines.push(format!("{}: {}", drill.drill, state));
        }

        let prefix = format!("{}-Piston-", self.config.elevator.group);
        for piston in self.grid.pistons() {
            if !piston.name().starts_with(&prefix) {
                continue;
            }
            let s = piston.snapshot();
            lines.push(format!(
                "{}: {:.3} m ({:+.3} m/s)",
                piston.name(),
                s.position,
                s.velocity
            ));
        }
        lines
    }

    /// Stop the rig and call every program's save hook.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.drill("stop") {
            warn!(error = %e, "failed to stop drill rig on exit");
        }
        self.host.save_all();
        info!(ticks = self.host.ticks(), "session closed");
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(mut session: Session, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "blockworks>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let Some(command) = parse_command(&line) else {
            continue;
        };

        match command {
            Command::Help => cmd_help(),
            Command::Drill(arg) => report(session.drill(&arg)),
            Command::Elevator(floor) => report(session.elevator(&floor)),
            Command::Tick(n) => {
                report(session.tick(n));
                println!("  {} tick {}", "→".dimmed(), session.ticks());
            }
            Command::Status => {
                for line in session.status() {
                    println!("  {}", line);
                }
            }
            Command::Quit => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Command::Usage(usage) => {
                println!("{} {}", "Usage:".yellow(), usage.bold());
            }
            Command::Unknown(other) => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                );
            }
        }
    }

    session.shutdown();
}

fn report(result: Result<(), BlockError>) {
    if let Err(e) = result {
        println!("{}: {}", "Block error".red(), e);
    }
}

fn cmd_help() {
    println!();
    println!("{}", "Blockworks Commands".bold().underline());
    println!("  {}  – drill rig control", "/drill <start|stop|reset>".bold().cyan());
    println!("  {}           – send the elevator to a floor", "/elevator <floor>".bold().cyan());
    println!("  {}                   – advance the simulation (default 60)", "/tick [n]".bold().cyan());
    println!("  {}                    – block positions", "/status".bold().cyan());
    println!("  {}               – stop the rig and exit", "/quit  /exit".bold().cyan());
    println!();
}
