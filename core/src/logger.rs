//! Process-wide log dispatcher for the `shopping-lists` binary.
//!
//! The library only talks to the `log` facade; this module wires it to stderr.

use chrono::Local;
use log::LevelFilter;

use crate::error::ConfigError;

/// Parse a configured level name.
pub fn level_filter(level: &str) -> Result<LevelFilter, ConfigError> {
    level
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("unknown log level '{level}'")))
}

/// Install a stderr dispatcher at `level`. stdout stays reserved for command
/// output.
pub fn init(level: &str) -> Result<(), ConfigError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {:<5} {}] {}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level_filter(level)?)
        // ureq logs every connection at debug
        .level_for("ureq", LevelFilter::Warn)
        .level_for("ureq_proto", LevelFilter::Warn)
        .chain(std::io::stderr())
        .apply()
        .map_err(|e| ConfigError::Invalid(format!("logger already installed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(level_filter("debug").unwrap(), LevelFilter::Debug);
        assert_eq!(level_filter("WARN").unwrap(), LevelFilter::Warn);
        assert_eq!(level_filter("off").unwrap(), LevelFilter::Off);
        assert!(level_filter("loud").is_err());
    }
}
