/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for a dinner.
///
/// Every timing constant and count the table uses lives here; nothing in the
/// core is hardcoded. Values are loaded from TOML files in XDG-compliant
/// directories and can be overridden from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiningConfig {
    /// Table layout
    pub table: TableConfig,
    /// Philosopher timings
    pub timing: TimingConfig,
    /// Monitor sampling
    pub monitor: MonitorConfig,
    /// Shutdown grace periods
    pub timeouts: TimeoutConfig,
    /// Tracing and logging configuration
    pub tracing: TracingConfig,
}

/// Table layout and meal budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Number of philosophers, and therefore forks. At least 2.
    pub philosophers: usize,
    /// Meals each philosopher eats before leaving the table.
    pub meals: usize,
    /// Pause between starting consecutive philosophers, in milliseconds.
    /// Zero starts everyone at once.
    pub launch_stagger_ms: u64,
    /// Seed for think-time jitter. `None` draws from the OS.
    pub seed: Option<u64>,
}

/// How long each step of a meal takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Shortest think time in milliseconds.
    pub think_base_ms: u64,
    /// Upper bound of the random extra think time in milliseconds. Zero
    /// disables jitter.
    pub think_jitter_ms: u64,
    /// Pause between picking up the left fork and reaching for the right one,
    /// in milliseconds.
    pub fork_delay_ms: u64,
    /// Time spent eating with both forks, in milliseconds.
    pub eat_ms: u64,
}

/// Monitor sampling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Time between samples in milliseconds.
    pub sample_interval_ms: u64,
    /// Samples taken before the monitor gives up.
    pub max_samples: usize,
    /// Rule used to call a deadlock.
    pub stall_detection: StallDetection,
}

/// Shutdown timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long to wait for cancelled philosophers to leave the table, in
    /// milliseconds.
    pub shutdown_timeout_ms: u64,
}

/// Tracing and logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for a log file. `None` logs to stdout only.
    pub log_directory: Option<String>,
}

/// Rule the monitor uses to decide that the table is deadlocked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum StallDetection {
    /// Deadlock only when no philosopher has eaten at all since the start.
    ///
    /// A table that stalls after some meals is never flagged; the monitor
    /// runs out of samples instead.
    #[default]
    Cumulative,
    /// Deadlock when the total did not move since the previous sample while
    /// someone is still at the table.
    NoProgress,
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Fewer than two philosophers cannot form a ring.
    #[error("a table needs at least 2 philosophers, got {0}")]
    TooFewPhilosophers(usize),
    /// Zero meals per philosopher.
    #[error("philosophers must eat at least one meal")]
    NoMeals,
    /// A zero sampling interval would spin the monitor.
    #[error("monitor sample interval must be greater than zero")]
    ZeroSampleInterval,
    /// A monitor that never samples cannot report anything.
    #[error("monitor must take at least one sample")]
    NoSamples,
    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            philosophers: 5,
            meals: 5,
            launch_stagger_ms: 0,
            seed: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            think_base_ms: 1_850,
            think_jitter_ms: 1_500,
            fork_delay_ms: 800,
            eat_ms: 2_000,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 8_000,
            max_samples: 8,
            stall_detection: StallDetection::Cumulative,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_directory: None,
        }
    }
}

impl TableConfig {
    /// Pause between starting consecutive philosophers.
    #[must_use]
    pub const fn launch_stagger(&self) -> Duration {
        Duration::from_millis(self.launch_stagger_ms)
    }
}

impl TimingConfig {
    /// Shortest think time.
    #[must_use]
    pub const fn think_base(&self) -> Duration {
        Duration::from_millis(self.think_base_ms)
    }

    /// Upper bound of the random extra think time.
    #[must_use]
    pub const fn think_jitter(&self) -> Duration {
        Duration::from_millis(self.think_jitter_ms)
    }

    /// Pause between the two fork acquisitions.
    #[must_use]
    pub const fn fork_delay(&self) -> Duration {
        Duration::from_millis(self.fork_delay_ms)
    }

    /// Time spent eating.
    #[must_use]
    pub const fn eat(&self) -> Duration {
        Duration::from_millis(self.eat_ms)
    }
}

impl MonitorConfig {
    /// Time between samples.
    #[must_use]
    pub const fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

impl TimeoutConfig {
    /// Grace period for cancelled philosophers.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl DiningConfig {
    /// Checks the values the table cannot run without.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.table.philosophers < 2 {
            return Err(ConfigError::TooFewPhilosophers(self.table.philosophers));
        }
        if self.table.meals == 0 {
            return Err(ConfigError::NoMeals);
        }
        if self.monitor.sample_interval_ms == 0 {
            return Err(ConfigError::ZeroSampleInterval);
        }
        if self.monitor.max_samples == 0 {
            return Err(ConfigError::NoSamples);
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    ///
    /// Missing sections and keys fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and any validation
    /// error for out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, otherwise
    /// the same errors as [`DiningConfig::from_toml_str`].
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `acton-dining/config.toml` under `$XDG_CONFIG_HOME`
    /// (falling back to `~/.config`).
    ///
    /// If no configuration file is found, returns the default configuration.
    /// If a configuration file exists but is unreadable, malformed or invalid,
    /// logs an error and uses defaults.
    pub fn load() -> Self {
        use tracing::{error, info};

        let xdg_dirs = match xdg::BaseDirectories::with_prefix("acton-dining") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        match xdg_dirs.find_config_file("config.toml") {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                match Self::load_from(&path) {
                    Ok(config) => {
                        info!("Successfully loaded configuration");
                        config
                    }
                    Err(e) => {
                        error!("{e}; using defaults");
                        Self::default()
                    }
                }
            }
            None => {
                info!("No configuration file found, using defaults");
                Self::default()
            }
        }
    }
}
