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


//! Shared plumbing for the dining table.
//!
//! *   [`Dinner`]: sets the table, runs it and collects a [`DinnerReport`].
//! *   [`DiningConfig`]: table size, timings and monitor settings, loadable from TOML.
//! *   [`TableStatus`] and [`DinnerSummary`]: what the table looked like when the monitor stopped.
//! *   [`init_tracing`]: installs the tracing subscriber used by the binary.

// --- Public Re-exports ---
pub use config::{
    ConfigError, DiningConfig, MonitorConfig, StallDetection, TableConfig, TimeoutConfig,
    TimingConfig, TracingConfig,
};
pub use dinner::Dinner;
pub use logging::{init_tracing, LOG_FILE_NAME};
pub use report::{DinnerReport, DinnerSummary, Holding, SeatStatus, TableStatus};
pub use types::*;

// --- Submodules ---

/// Seat, fork and activity identifiers.
mod types;

/// Defines the configuration system for the dining table.
pub mod config;
/// Defines `Dinner`, which owns the table for one run.
mod dinner;
/// Subscriber setup for the binary.
mod logging;
/// Status snapshots and meal statistics.
mod report;
