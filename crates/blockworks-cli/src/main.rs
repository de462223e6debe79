//! `blockworks-cli` – operator terminal for a simulated Blockworks grid.
//!
//! This binary:
//!
//! 1. Loads `~/.blockworks/config.toml`, writing the defaults on first run.
//! 2. Builds a simulated grid holding the drill rig and the elevator piston
//!    group, and installs both programs on a tick host.
//! 3. Drops the operator into an **interactive REPL** with slash-commands
//!    (`/drill`, `/elevator`, `/tick`, `/status`, `/help`).
//! 4. Intercepts **Ctrl-C** to stop the rig and exit safely.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use blockworks_hal::TracingEcho;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the filter (default "info").  BLOCKWORKS_LOG_FORMAT=json
    // switches to newline-delimited JSON.  Program echo lines are logged
    // under the `echo` target.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("BLOCKWORKS_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    // The REPL notices the flag at its next prompt and stops the rig there.
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the rig …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => write_default_config(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    println!(
        "  Drill rig: {} / {} / {} / {}",
        cfg.drill.piston.bold(),
        cfg.drill.rotor.bold(),
        cfg.drill.hinge.bold(),
        cfg.drill.drill.bold()
    );
    println!(
        "  Elevator : {} ({} pistons, floors {})",
        cfg.elevator.group.bold(),
        cfg.elevator_pistons,
        cfg.elevator
            .floors
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );

    let session = repl::Session::new(cfg, Arc::new(TracingEcho));

    println!();
    println!(
        "  Type {} for a list of commands.\n",
        "/help".bold().cyan()
    );

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(session, shutdown);
}

fn write_default_config() -> config::Config {
    let mut cfg = config::Config::default();
    match config::save(&cfg) {
        Ok(()) => println!(
            "  {} Default config written to {}",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    config::apply_env_overrides(&mut cfg);
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"  ___ _         _                   _       "#.bold().cyan());
    println!("{}", r#" | _ ) |___  __| |____ __ _____ _ _| |__ ___"#.bold().cyan());
    println!("{}", r#" | _ \ / _ \/ _| / /\ V  V / _ \ '_| / /(_-<"#.bold().cyan());
    println!("{}", r#" |___/_\___/\__|_\_\ \_/\_/\___/_| |_\_\/__/"#.bold().cyan());
    println!();
    println!("  {} {}",
        "Blockworks".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Drill rig and elevator controllers");
    println!();
}
