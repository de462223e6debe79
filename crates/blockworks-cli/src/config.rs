//! Configuration Vault – reads/writes `~/.blockworks/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use blockworks_hal::sim::DEFAULT_TICK_SECONDS;
use blockworks_types::{DrillRigConfig, ElevatorConfig};

/// Persisted settings stored in `~/.blockworks/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Simulated seconds per tick.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f32,

    /// Number of pistons built into the simulated elevator group.
    #[serde(default = "default_elevator_pistons")]
    pub elevator_pistons: usize,

    /// Stroke of every simulated piston (m).
    #[serde(default = "default_piston_travel")]
    pub piston_travel: f32,

    #[serde(default)]
    pub drill: DrillRigConfig,

    #[serde(default)]
    pub elevator: ElevatorConfig,
}

fn default_tick_seconds() -> f32 {
    DEFAULT_TICK_SECONDS
}
fn default_elevator_pistons() -> usize {
    4
}
fn default_piston_travel() -> f32 {
    10.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
            elevator_pistons: default_elevator_pistons(),
            piston_travel: default_piston_travel(),
            drill: DrillRigConfig::default(),
            elevator: ElevatorConfig::default(),
        }
    }
}

/// Return the path to `~/.blockworks/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".blockworks").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `BLOCKWORKS_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `BLOCKWORKS_DRILL_MAX_LENGTH` | `drill.max_piston_length` |
/// | `BLOCKWORKS_ELEVATOR_SPEED` | `elevator.speed` |
/// | `BLOCKWORKS_ELEVATOR_TOLERANCE` | `elevator.tolerance` |
///
/// Values that do not parse as numbers are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(v) = env_f32("BLOCKWORKS_DRILL_MAX_LENGTH") {
        cfg.drill.max_piston_length = v;
    }
    if let Some(v) = env_f32("BLOCKWORKS_ELEVATOR_SPEED") {
        cfg.elevator.speed = v;
    }
    if let Some(v) = env_f32("BLOCKWORKS_ELEVATOR_TOLERANCE") {
        cfg.elevator.tolerance = v;
    }
}

fn env_f32(name: &str) -> Option<f32> {
    std::env::var(name).ok()?.trim().parse::<f32>().ok()
}

/// Save the config to disk, creating `~/.blockworks/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
