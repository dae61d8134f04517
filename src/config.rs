// Tue Jan 13 2026 - Alex

use crate::engine::coordinator::FailurePolicy;
use crate::engine::runner::RunnerOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const MIN_FRAMERATE: u32 = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where frames and ground motion intermediates are written.
    pub output_dir: PathBuf,
    pub workers: usize,
    pub animate: bool,
    pub framerate: u32,
    /// Camera sweep duration, seconds.
    pub transition_time: f64,
    /// Slip fade-out duration, seconds.
    pub minor_transition_time: f64,
    pub start_delay: f64,
    pub end_delay: f64,
    pub wait_backoff_ms: u64,
    pub failure_policy: FailurePolicy,
    pub watchdog_seconds: Option<u64>,
    pub enable_progress_bars: bool,
    pub frame_extension: String,
    /// External renderer, program followed by its leading arguments.
    pub render_command: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("frames"),
            workers: num_cpus::get(),
            animate: false,
            framerate: 25,
            transition_time: 6.0,
            minor_transition_time: 0.5,
            start_delay: 1.5,
            end_delay: 3.0,
            wait_backoff_ms: 1000,
            failure_policy: FailurePolicy::default(),
            watchdog_seconds: None,
            enable_progress_bars: true,
            frame_extension: "json".to_string(),
            render_command: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_animate(mut self, animate: bool) -> Self {
        self.animate = animate;
        self
    }

    pub fn with_framerate(mut self, framerate: u32) -> Self {
        self.framerate = framerate;
        self
    }

    pub fn with_transition_time(mut self, seconds: f64) -> Self {
        self.transition_time = seconds;
        self
    }

    pub fn with_minor_transition_time(mut self, seconds: f64) -> Self {
        self.minor_transition_time = seconds;
        self
    }

    pub fn with_start_delay(mut self, seconds: f64) -> Self {
        self.start_delay = seconds;
        self
    }

    pub fn with_end_delay(mut self, seconds: f64) -> Self {
        self.end_delay = seconds;
        self
    }

    pub fn with_wait_backoff_ms(mut self, ms: u64) -> Self {
        self.wait_backoff_ms = ms;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_watchdog_seconds(mut self, seconds: Option<u64>) -> Self {
        self.watchdog_seconds = seconds;
        self
    }

    pub fn with_progress_bars(mut self, enabled: bool) -> Self {
        self.enable_progress_bars = enabled;
        self
    }

    pub fn with_render_command(mut self, command: Vec<String>) -> Self {
        self.render_command = if command.is_empty() { None } else { Some(command) };
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("workers must be greater than 0".to_string());
        }
        if self.framerate < MIN_FRAMERATE {
            return Err(format!("framerate must be at least {}", MIN_FRAMERATE));
        }
        if self.minor_transition_time > self.transition_time {
            return Err("minor_transition_time must not exceed transition_time".to_string());
        }
        if self.start_delay < 0.0 || self.end_delay < 0.0 {
            return Err("delays must not be negative".to_string());
        }
        if self.animate {
            let fr = self.framerate as f64;
            if (self.transition_time * fr).floor() < 2.0 {
                return Err("transition_time must span at least 2 frames".to_string());
            }
            if (self.minor_transition_time * fr).floor() < 2.0 {
                return Err("minor_transition_time must span at least 2 frames".to_string());
            }
        }
        if self.watchdog_seconds == Some(0) {
            return Err("watchdog_seconds must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            workers: self.workers,
            backoff: Duration::from_millis(self.wait_backoff_ms),
            policy: self.failure_policy,
            watchdog: self.watchdog_seconds.map(Duration::from_secs),
            progress: self.enable_progress_bars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.clone().with_animate(true).validate().is_ok());
        assert!(config.workers >= 1);
    }

    #[test]
    fn test_validation_errors() {
        assert!(Config::new().with_workers(0).validate().is_err());
        assert!(Config::new().with_framerate(4).validate().is_err());
        assert!(Config::new().with_minor_transition_time(7.0).validate().is_err());
        assert!(Config::new().with_watchdog_seconds(Some(0)).validate().is_err());

        // one fade frame is fine for a still, not for an animation
        let short_fade = Config::new().with_framerate(5).with_minor_transition_time(0.3);
        assert!(short_fade.validate().is_ok());
        assert!(short_fade.with_animate(true).validate().is_err());
    }

    #[test]
    fn test_runner_options() {
        let options = Config::new()
            .with_workers(3)
            .with_wait_backoff_ms(250)
            .with_failure_policy(FailurePolicy::Abort)
            .with_watchdog_seconds(Some(60))
            .runner_options();

        assert_eq!(options.workers, 3);
        assert_eq!(options.backoff, Duration::from_millis(250));
        assert_eq!(options.policy, FailurePolicy::Abort);
        assert_eq!(options.watchdog, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"animate": true, "framerate": 30, "failure_policy": "abort"}}"#).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(config.animate);
        assert_eq!(config.framerate, 30);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.end_delay, 3.0);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"workers": 0}}"#).unwrap();
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Invalid(_))));
        assert!(matches!(Config::load("/no/such/config.json"), Err(ConfigError::NotFound(_))));
    }
}
