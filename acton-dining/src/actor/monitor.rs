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

//! The monitor: samples every philosopher's progress on a fixed interval and
//! decides when the dinner is over.
//!
//! Each sample is checked in a fixed order: stall first, then completion. The
//! default stall rule ([`StallDetection::Cumulative`]) only fires when nobody
//! has eaten at all since the start. A table that deadlocks after some meals
//! is not flagged by it; the monitor runs out of samples and reports
//! [`Verdict::Exhausted`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::common::{MonitorConfig, StallDetection};
use crate::message::{EventSink, TableEvent};
use crate::traits::{ProgressSource, TableSnapshot};

/// How the monitor's watch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The stall rule fired.
    Deadlock,
    /// Every philosopher finished.
    AllCompleted,
    /// The sample budget ran out without a decision.
    Exhausted,
    /// The table's cancellation token fired while sampling.
    Interrupted,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::Deadlock => "Deadlock detected",
            Self::AllCompleted => "All actors completed",
            Self::Exhausted => "Sample budget exhausted",
            Self::Interrupted => "Monitor interrupted",
        };
        f.write_str(message)
    }
}

/// One reading of every philosopher's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// 1-based sample number.
    pub index: usize,
    /// Meals per seat, in seat order.
    pub meals: Vec<usize>,
    /// Finished flags per seat, in seat order.
    pub finished: Vec<bool>,
    /// Sum of `meals`.
    pub total: usize,
}

impl Sample {
    /// Whether every philosopher had finished when the sample was taken.
    #[must_use]
    pub fn all_finished(&self) -> bool {
        self.finished.iter().all(|finished| *finished)
    }
}

/// What the monitor saw, returned from [`Monitor::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    /// Why the monitor stopped.
    pub verdict: Verdict,
    /// Every sample taken, oldest first.
    pub samples: Vec<Sample>,
}

/// Watches the whole table without touching it.
#[derive(Debug)]
pub struct Monitor {
    seats: Vec<Arc<dyn ProgressSource>>,
    interval: Duration,
    max_samples: usize,
    stall_detection: StallDetection,
    table: Option<Arc<dyn TableSnapshot>>,
    events: EventSink,
    cancellation_token: CancellationToken,
}

impl Monitor {
    /// Creates a monitor over `seats` (in seat order) using `config`.
    #[must_use]
    pub fn new(seats: Vec<Arc<dyn ProgressSource>>, config: &MonitorConfig) -> Self {
        Self {
            seats,
            interval: config.sample_interval(),
            max_samples: config.max_samples,
            stall_detection: config.stall_detection,
            table: None,
            events: EventSink::silent(),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Reports samples and the verdict to `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Reports a [`TableEvent::StatusReport`] from `table` after every sample.
    #[must_use]
    pub fn with_table(mut self, table: Arc<dyn TableSnapshot>) -> Self {
        self.table = Some(table);
        self
    }

    /// Stops sampling with [`Verdict::Interrupted`] when `token` fires.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Reads every philosopher's counters once.
    #[must_use]
    pub fn sample(&self, index: usize) -> Sample {
        let meals: Vec<usize> = self.seats.iter().map(|seat| seat.meals()).collect();
        let finished = self.seats.iter().map(|seat| seat.is_finished()).collect();
        let total = meals.iter().sum();
        Sample {
            index,
            meals,
            finished,
            total,
        }
    }

    /// Applies the stop rules to `sample`.
    ///
    /// `previous_total` is the total of the prior sample, or zero for the
    /// first one. Returns `None` to keep sampling.
    #[must_use]
    pub fn judge(&self, sample: &Sample, previous_total: usize) -> Option<Verdict> {
        let all_finished = sample.all_finished();
        let stalled = match self.stall_detection {
            StallDetection::Cumulative => sample.total == 0,
            StallDetection::NoProgress => sample.total == previous_total && !all_finished,
        };
        if stalled {
            Some(Verdict::Deadlock)
        } else if all_finished {
            Some(Verdict::AllCompleted)
        } else {
            None
        }
    }

    /// Samples until a verdict is reached or the budget runs out.
    #[instrument(name = "monitor", skip(self), fields(seats = self.seats.len()))]
    pub async fn run(self) -> MonitorReport {
        let mut samples = Vec::with_capacity(self.max_samples);
        let mut previous_total = 0;

        for index in 1..=self.max_samples {
            tokio::select! {
                () = self.cancellation_token.cancelled() => {
                    return self.conclude(Verdict::Interrupted, samples);
                }
                () = tokio::time::sleep(self.interval) => {}
            }

            let sample = self.sample(index);
            self.events.emit(TableEvent::MonitorSample {
                sample: index,
                meals: sample.meals.clone(),
                total: sample.total,
            });
            if let Some(table) = &self.table {
                self.events.emit(TableEvent::StatusReport(table.snapshot()));
            }

            let verdict = self.judge(&sample, previous_total);
            previous_total = sample.total;
            samples.push(sample);

            if let Some(verdict) = verdict {
                return self.conclude(verdict, samples);
            }
        }

        self.conclude(Verdict::Exhausted, samples)
    }

    fn conclude(&self, verdict: Verdict, samples: Vec<Sample>) -> MonitorReport {
        match verdict {
            Verdict::Deadlock | Verdict::AllCompleted => {
                self.events.emit(TableEvent::MonitorVerdict(verdict));
            }
            // Neither outcome is asserted; keep it out of the event stream.
            Verdict::Exhausted | Verdict::Interrupted => {
                debug!(samples = samples.len(), "{verdict}");
            }
        }
        MonitorReport { verdict, samples }
    }
}
