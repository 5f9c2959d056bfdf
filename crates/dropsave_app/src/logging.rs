//! Logging initialization for the dropsave binary.
//!
//! File output goes to `./dropsave.log` in the current working directory.

use engine_logging::LogDestination;
use log::LevelFilter;

use crate::config::AppConfig;

pub fn initialize(config: &AppConfig) {
    let destination = LogDestination::from(config.log_destination);
    let level = LevelFilter::from(config.log_level);
    if !engine_logging::initialize(destination, level) {
        eprintln!("Warning: logging could not be initialized");
    }
}
