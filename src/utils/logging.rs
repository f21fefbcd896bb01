use crate::config::cli::LogLevel;
use colored::Colorize;
use log::Level;
use std::io::Write;

/// Initialize diagnostic logging on stderr
pub fn init_logging(level: LogLevel) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level.to_filter());

    // Custom format: [LEVEL] message
    builder.format(|buf, record| {
        let level_string = match record.level() {
            Level::Error => record.level().to_string().red().bold().to_string(),
            Level::Warn => record.level().to_string().yellow().bold().to_string(),
            Level::Info => record.level().to_string().cyan().bold().to_string(),
            Level::Debug => record.level().to_string().blue().bold().to_string(),
            Level::Trace => record.level().to_string().normal().to_string(),
        };
        writeln!(buf, "[{}] {}", level_string, record.args())
    });

    // A second init (tests) is harmless
    let _ = builder.try_init();
}
