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


#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Acton Dining
//!
//! The dining philosophers on Tokio: N philosophers around a round table,
//! one fork between each pair of neighbours, and a monitor that samples
//! everyone's meal counter and calls the dinner over.
//!
//! Every philosopher takes the left fork first, so the table can and does
//! deadlock. The monitor only observes; it never breaks the deadlock. Once
//! it has a verdict, the table fires its cancellation token and the
//! philosophers put their forks down and leave.
//!
//! ## Key Concepts
//!
//! - **Forks (`Fork`)**: mutual-exclusion resources with a recorded holder.
//!   Picking up waits without a timeout; putting down wakes the waiters.
//! - **Philosophers (`Philosopher`)**: one Tokio task per seat, running the
//!   think, pick up, eat, put down cycle for a fixed number of meals.
//! - **Monitor (`Monitor`)**: samples progress through `ProgressSource` on a
//!   fixed interval and reaches a `Verdict`.
//! - **Dinner (`Dinner`)**: owns the table for one run and returns a
//!   `DinnerReport`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use acton_dining::prelude::*;
//!
//! # async fn run() -> Result<(), ConfigError> {
//! let report = Dinner::new(DiningConfig::default())?.run().await;
//! println!("{}", report.verdict);
//! println!("{}", report.summary);
//! # Ok(())
//! # }
//! ```

/// Configuration, identifiers, the dinner driver and its reports.
pub(crate) mod common;

/// Defines the philosopher and monitor tasks.
pub(crate) mod actor;

/// Defines the events reported while the table runs.
pub(crate) mod message;

/// Defines the shared fork resource.
pub(crate) mod resource;

/// Defines core traits used between the table's tasks.
pub(crate) mod traits;

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Table
/// *   [`crate::common::Dinner`]: Sets the table and runs it.
/// *   [`crate::common::DinnerReport`]: Everything a finished dinner reports.
/// *   [`crate::common::TableStatus`]: Per-seat snapshot of counters and forks.
/// *   [`crate::common::DinnerSummary`]: Meal statistics across the table.
///
/// ## Configuration
/// *   [`crate::common::DiningConfig`]: Root configuration, loadable from TOML.
/// *   [`crate::common::StallDetection`]: The monitor's deadlock rule.
///
/// ## Actors and resources
/// *   [`crate::resource::Fork`]: A fork and its holder.
/// *   [`crate::actor::Philosopher`]: One seat's task.
/// *   [`crate::actor::Monitor`]: The sampling task.
/// *   [`crate::traits::ProgressSource`]: Read-only progress view.
pub mod prelude {
    pub use crate::actor::{
        Monitor, MonitorReport, Philosopher, PhilosopherExit, Progress, Sample, Verdict,
    };
    pub use crate::common::{
        init_tracing, Activity, ConfigError, DiningConfig, Dinner, DinnerReport, DinnerSummary,
        ForkId, Holding, MonitorConfig, SeatId, SeatStatus, Side, StallDetection, TableConfig,
        TableStatus, TimeoutConfig, TimingConfig, TracingConfig, LOG_FILE_NAME,
    };
    pub use crate::message::{EventReceiver, EventSink, TableEvent};
    pub use crate::resource::{Fork, ForkError};
    pub use crate::traits::{ProgressSource, TableSnapshot};
}
