// Tue Jan 13 2026 - Alex

use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::time::{Duration, Instant};

pub struct LoggingUtils;

impl LoggingUtils {
    /// `RUST_LOG` wins over the verbosity flag when it is set.
    pub fn init(verbosity: usize) {
        if std::env::var_os("RUST_LOG").is_some() {
            init_from_env();
        } else {
            Self::init_logger(Self::level_from_verbosity(verbosity));
        }
    }

    pub fn init_logger(level: LevelFilter) {
        let logger = Box::new(ColoredLogger::new(level));
        log::set_boxed_logger(logger).ok();
        log::set_max_level(level);
    }

    pub fn level_from_verbosity(verbosity: usize) -> LevelFilter {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

struct ColoredLogger {
    level: LevelFilter,
    start: Instant,
}

impl ColoredLogger {
    fn new(level: LevelFilter) -> Self {
        Self {
            level,
            start: Instant::now(),
        }
    }

    fn format_level(level: Level) -> ColoredString {
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
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // worker threads log concurrently, the thread name tells them apart
        let thread = std::thread::current();
        let origin = match thread.name() {
            Some(name) => format!("[{} {}]", record.target(), name),
            None => format!("[{}]", record.target()),
        };

        eprintln!(
            "{:>9.3} {} {} {}",
            self.start.elapsed().as_secs_f64(),
            Self::format_level(record.level()),
            origin.dimmed(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Logs how long a scope took when it is dropped.
pub struct ScopedTimer {
    name: String,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(name: &str) -> Self {
        log::debug!("[TIMER] {} started", name);
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::debug!("[TIMER] {} took {:.2}ms", self.name, self.elapsed().as_secs_f64() * 1000.0);
    }
}

pub fn init_from_env() {
    env_logger::init();
}

pub fn scoped_timer(name: &str) -> ScopedTimer {
    ScopedTimer::new(name)
}
