use std::collections::BTreeMap;
use std::f32::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How often a program asks the host to invoke it.  Requested once at
/// startup and never renegotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateFrequency {
    /// Never scheduled; the program only runs on terminal commands.
    None,
    /// Every tick.
    Update1,
    /// Every 10th tick.
    Update10,
    /// Every 100th tick.
    Update100,
}

impl UpdateFrequency {
    /// Number of ticks between invocations, or `None` when never scheduled.
    pub fn interval(self) -> Option<u64> {
        match self {
            UpdateFrequency::None => None,
            UpdateFrequency::Update1 => Some(1),
            UpdateFrequency::Update10 => Some(10),
            UpdateFrequency::Update100 => Some(100),
        }
    }

    /// Return `true` when a program with this frequency runs on `tick`.
    pub fn is_due(self, tick: u64) -> bool {
        self.interval().is_some_and(|n| tick % n == 0)
    }

    /// The [`UpdateType`] delivered to scheduled invocations.
    pub fn update_type(self) -> Option<UpdateType> {
        match self {
            UpdateFrequency::None => None,
            UpdateFrequency::Update1 => Some(UpdateType::Update1),
            UpdateFrequency::Update10 => Some(UpdateType::Update10),
            UpdateFrequency::Update100 => Some(UpdateType::Update100),
        }
    }
}

/// Why a program was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateType {
    /// A command typed by the operator.
    Terminal,
    Update1,
    Update10,
    Update100,
}

/// Operator commands understood by the drill rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrillCommand {
    Start,
    Stop,
    Reset,
}

impl DrillCommand {
    /// Parse an argument string, ignoring case.  Anything else is `None`.
    pub fn parse(argument: &str) -> Option<Self> {
        match argument.trim().to_lowercase().as_str() {
            "start" => Some(DrillCommand::Start),
            "stop" => Some(DrillCommand::Stop),
            "reset" => Some(DrillCommand::Reset),
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Controller configuration
// ────────────────────────────────────────────────────────────────────────────

/// Block names and motion constants for the rotary drilling rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillRigConfig {
    #[serde(default = "default_piston_name")]
    pub piston: String,
    #[serde(default = "default_rotor_name")]
    pub rotor: String,
    #[serde(default = "default_hinge_name")]
    pub hinge: String,
    #[serde(default = "default_drill_name")]
    pub drill: String,

    /// Hinge target velocity in rad/s.
    #[serde(default = "default_hinge_speed_rad")]
    pub hinge_speed_rad: f32,

    /// Piston extension added after each full hinge rotation (m).
    #[serde(default = "default_piston_increment")]
    pub piston_increment: f32,

    /// Host ticks per simulated second; converts the increment into a
    /// per-second piston velocity.
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: f32,

    /// Extension at which drilling is complete (m).
    #[serde(default = "default_max_piston_length")]
    pub max_piston_length: f32,

    /// Nominal rotor speed while drilling.
    #[serde(default = "default_rotor_rpm")]
    pub rotor_rpm: f32,

    /// Piston retraction speed used by `reset` (m/s, positive).
    #[serde(default = "default_retract_velocity")]
    pub retract_velocity: f32,
}

fn default_piston_name() -> String {
    "RPiston".to_string()
}
fn default_rotor_name() -> String {
    "RRotor".to_string()
}
fn default_hinge_name() -> String {
    "RHinge".to_string()
}
fn default_drill_name() -> String {
    "RDrill".to_string()
}
fn default_hinge_speed_rad() -> f32 {
    PI / 1800.0
}
fn default_piston_increment() -> f32 {
    0.02 / 60.0
}
fn default_ticks_per_second() -> f32 {
    60.0
}
fn default_max_piston_length() -> f32 {
    10.0
}
fn default_rotor_rpm() -> f32 {
    1.0
}
fn default_retract_velocity() -> f32 {
    1.0
}

impl DrillRigConfig {
    /// Piston velocity (m/s) that covers one increment in one tick.
    pub fn piston_velocity(&self) -> f32 {
        self.piston_increment * self.ticks_per_second
    }
}

impl Default for DrillRigConfig {
    fn default() -> Self {
        Self {
            piston: default_piston_name(),
            rotor: default_rotor_name(),
            hinge: default_hinge_name(),
            drill: default_drill_name(),
            hinge_speed_rad: default_hinge_speed_rad(),
            piston_increment: default_piston_increment(),
            ticks_per_second: default_ticks_per_second(),
            max_piston_length: default_max_piston_length(),
            rotor_rpm: default_rotor_rpm(),
            retract_velocity: default_retract_velocity(),
        }
    }
}

/// Piston group, floor table and motion constants for the elevator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevatorConfig {
    #[serde(default = "default_group_name")]
    pub group: String,

    /// Piston speed while travelling (m/s).
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// Maximum position error at which a piston counts as arrived (m).
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,

    /// Floor identifier → piston extension (m).  Kept last so it serialises
    /// as a trailing TOML table.
    #[serde(default = "default_floors")]
    pub floors: BTreeMap<String, f32>,
}

fn default_group_name() -> String {
    "Workshop-Elevator".to_string()
}
fn default_floors() -> BTreeMap<String, f32> {
    BTreeMap::from([
        ("1".to_string(), 0.0),
        ("2".to_string(), 2.51),
        ("3".to_string(), 4.89),
        ("4".to_string(), 9.9),
    ])
}
fn default_speed() -> f32 {
    0.5
}
fn default_tolerance() -> f32 {
    0.1
}

impl Default for ElevatorConfig {
    fn default() -> Self {
        Self {
            group: default_group_name(),
            speed: default_speed(),
            tolerance: default_tolerance(),
            floors: default_floors(),
        }
    }
}

/// Errors raised by block handles and the controllers driving them.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockError {
    #[error("Missing block reference: {name}")]
    MissingBlock { name: String },

    #[error("No pistons found in the group '{group}'")]
    EmptyGroup { group: String },

    #[error("Unknown block group: {group}")]
    UnknownGroup { group: String },

    #[error("Block fault on {block}: {details}")]
    Fault { block: String, details: String },
}
