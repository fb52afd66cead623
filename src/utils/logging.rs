// Tue Jan 13 2026 - Alex

use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

pub struct LoggingUtils;

impl LoggingUtils {
    /// Install the coloured stderr logger, or `env_logger` when `RUST_LOG` is set.
    pub fn init(level: LevelFilter, use_color: bool) {
        if std::env::var_os("RUST_LOG").is_some() {
            let _ = env_logger::try_init();
            return;
        }

        let logger = Box::new(ColoredLogger::new(level, use_color));
        if log::set_boxed_logger(logger).is_ok() {
            log::set_max_level(level);
        }
    }

    pub fn level_from_str(s: &str) -> LevelFilter {
        match s.to_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info,
        }
    }

    pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
        match verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

struct ColoredLogger {
    level: LevelFilter,
    use_color: AtomicBool,
}

impl ColoredLogger {
    fn new(level: LevelFilter, use_color: bool) -> Self {
        Self {
            level,
            use_color: AtomicBool::new(use_color),
        }
    }

    fn format_level(&self, level: Level) -> ColoredString {
        match level {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow().bold(),
            Level::Info => "INFO ".green().bold(),
            Level::Debug => "DEBUG".blue().bold(),
            Level::Trace => "TRACE".magenta().bold(),
        }
    }
}

impl Log for ColoredLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("gamestate_bridge")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let target = record.target().trim_start_matches("gamestate_bridge::");
        if self.use_color.load(Ordering::Relaxed) {
            eprintln!("{} {} {}", self.format_level(record.level()), format!("[{}]", target).dimmed(), record.args());
        } else {
            eprintln!("{:5} [{}] {}", record.level(), target, record.args());
        }
    }

    fn flush(&self) {}
}

/// Logs the lifetime of a scope at trace level.
pub struct ScopedTimer {
    name: &'static str,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::trace!("{} took {:.2}ms", self.name, self.start.elapsed().as_secs_f64() * 1000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!(LoggingUtils::level_from_str("WARNING"), LevelFilter::Warn);
        assert_eq!(LoggingUtils::level_from_str("nonsense"), LevelFilter::Info);
        assert_eq!(LoggingUtils::level_from_verbosity(0), LevelFilter::Info);
        assert_eq!(LoggingUtils::level_from_verbosity(5), LevelFilter::Trace);
    }
}
