use env_logger::{Builder, Target};
use log::{Level, LevelFilter, warn};
use std::env;
use std::io::Write;

use crate::model::LoggingConfig;

/// Install the process-wide logger. `RUST_LOG` overrides the level.
pub fn setup_logger(verbose: bool) {
    let mut builder = Builder::new();
    // The effective level is the global max level, so config can move it later.
    builder.filter(None, LevelFilter::Trace);
    builder.target(Target::Stdout);

    builder.format(|buf, record| {
        let prefix = match record.level() {
            Level::Error => "error: ",
            Level::Warn => "warning: ",
            Level::Info | Level::Debug | Level::Trace => "",
        };
        writeln!(buf, "{}{}", prefix, record.args())
    });

    let from_env = env::var("RUST_LOG").is_ok();
    if from_env {
        builder.parse_default_env();
    }

    // A logger may already be installed by an embedding application.
    if builder.try_init().is_ok() {
        if let Some(level) = effective_level(verbose, from_env, None) {
            log::set_max_level(level);
        }
    }
}

/// Apply `[logging] level` unless `--verbose` or `RUST_LOG` already decided.
pub fn apply_logging_config(config: &LoggingConfig, verbose: bool) {
    let from_env = env::var("RUST_LOG").is_ok();
    match effective_level(verbose, from_env, Some(&config.level)) {
        Some(level) => log::set_max_level(level),
        None if !from_env => warn!("Unknown log level '{}' in config; keeping info", config.level),
        None => {}
    }
}

/// Precedence: `RUST_LOG`, then `--verbose`, then the configured level.
/// `None` leaves the current max level alone.
fn effective_level(verbose: bool, from_env: bool, configured: Option<&str>) -> Option<LevelFilter> {
    if from_env {
        return None;
    }
    if verbose {
        return Some(LevelFilter::Debug);
    }
    match configured {
        Some(level) => level.parse().ok(),
        None => Some(LevelFilter::Info),
    }
}
