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

use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::actor::{Monitor, MonitorReport, Philosopher, PhilosopherExit, Progress, Verdict};
use crate::common::report::{DinnerReport, DinnerSummary, Holding, SeatStatus, TableStatus};
use crate::common::{ConfigError, DiningConfig, ForkId, SeatId};
use crate::message::{EventReceiver, EventSink};
use crate::resource::Fork;
use crate::traits::{ProgressSource, TableSnapshot};

/// A table set for dinner: forks in a ring, a philosopher between each pair,
/// and a monitor watching them all.
///
/// Created with [`Dinner::new`] (or [`Dinner::observed`] to also receive the
/// event stream) and consumed by [`Dinner::run`].
///
/// Seat `i` gets fork `i` on its left and fork `(i + 1) mod N` on its right,
/// so every fork is shared by exactly two neighbours.
#[derive(Debug)]
pub struct Dinner {
    config: DiningConfig,
    forks: Vec<Arc<Fork>>,
    philosophers: Vec<Philosopher>,
    table: Arc<TableView>,
    events: EventSink,
    cancellation_token: CancellationToken,
}

impl Dinner {
    /// Sets the table described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation.
    pub fn new(config: DiningConfig) -> Result<Self, ConfigError> {
        Self::with_events(config, EventSink::silent())
    }

    /// Sets the table and returns the receiver for its event stream.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation.
    pub fn observed(config: DiningConfig) -> Result<(Self, EventReceiver), ConfigError> {
        let (events, receiver) = EventSink::channel();
        Ok((Self::with_events(config, events)?, receiver))
    }

    /// Sets the table, reporting everything to `events`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation.
    pub fn with_events(config: DiningConfig, events: EventSink) -> Result<Self, ConfigError> {
        config.validate()?;
        let seats = config.table.philosophers;
        let cancellation_token = CancellationToken::new();

        let forks: Vec<Arc<Fork>> = (0..seats)
            .map(|index| Arc::new(Fork::with_events(ForkId(index), events.clone())))
            .collect();

        let philosophers: Vec<Philosopher> = (0..seats)
            .map(|index| {
                let seat = SeatId(index);
                let left = Arc::clone(&forks[seat.left_fork().index()]);
                let right = Arc::clone(&forks[seat.right_fork(seats).index()]);
                Philosopher::new(seat, left, right, &config)
                    .with_events(events.clone())
                    .with_cancellation(cancellation_token.clone())
            })
            .collect();

        let table = Arc::new(TableView {
            forks: forks.clone(),
            progress: philosophers.iter().map(Philosopher::progress).collect(),
        });
        trace!(seats, "table set");

        Ok(Self {
            config,
            forks,
            philosophers,
            table,
            events,
            cancellation_token,
        })
    }

    /// The configuration this table was set with.
    #[must_use]
    pub const fn config(&self) -> &DiningConfig {
        &self.config
    }

    /// The forks, indexed by [`ForkId`].
    #[must_use]
    pub fn forks(&self) -> &[Arc<Fork>] {
        &self.forks
    }

    /// A clone of the table's cancellation token.
    ///
    /// Firing it stops the monitor with [`Verdict::Interrupted`] and sends
    /// every philosopher home, putting down any forks they hold.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Reads every seat's counters, activity and fork holdings.
    #[must_use]
    pub fn status(&self) -> TableStatus {
        self.table.snapshot()
    }

    /// Starts the monitor and every philosopher, then waits for the monitor.
    ///
    /// Philosophers sit down one `launch_stagger` apart. Once the monitor has
    /// a verdict nobody else sits down; seats never taken are reported as
    /// `None` in [`DinnerReport::exits`].
    ///
    /// When the monitor reports anything but [`Verdict::AllCompleted`], the
    /// cancellation token is fired so blocked philosophers leave the table.
    /// Tasks get [`TimeoutConfig::shutdown_timeout`](crate::common::TimeoutConfig::shutdown_timeout)
    /// to finish; stragglers are also reported as `None`.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from the monitor or from a philosopher, which only
    /// happens when the fork discipline is broken.
    #[instrument(name = "dinner", skip(self), fields(seats = self.forks.len()))]
    pub async fn run(mut self) -> DinnerReport {
        let started = Instant::now();
        let tracker = TaskTracker::new();

        let sources = self
            .table
            .progress
            .iter()
            .map(|progress| Arc::clone(progress) as Arc<dyn ProgressSource>)
            .collect();
        let monitor = Monitor::new(sources, &self.config.monitor)
            .with_table(Arc::clone(&self.table) as Arc<dyn TableSnapshot>)
            .with_events(self.events.clone())
            .with_cancellation(self.cancellation_token.clone());
        let mut monitor_task = tracker.spawn(monitor.run());

        let stagger = self.config.table.launch_stagger();
        let mut seats: Vec<JoinHandle<PhilosopherExit>> = Vec::with_capacity(self.forks.len());
        let mut early_report = None;
        for (index, philosopher) in std::mem::take(&mut self.philosophers).into_iter().enumerate() {
            if index > 0 && !stagger.is_zero() {
                tokio::select! {
                    joined = &mut monitor_task => {
                        early_report = Some(resume_panic(joined));
                        break;
                    }
                    () = sleep(stagger) => {}
                }
            }
            trace!(seat = %philosopher.seat(), "philosopher sits down");
            seats.push(tracker.spawn(philosopher.run()));
        }
        tracker.close();

        let MonitorReport { verdict, samples } = match early_report {
            Some(report) => {
                debug!(seated = seats.len(), "monitor finished before everyone sat down");
                report
            }
            None => resume_panic(monitor_task.await),
        };
        let elapsed = started.elapsed();
        let status = self.status();
        info!(?elapsed, "{verdict}");

        if verdict != Verdict::AllCompleted {
            trace!("Cancelling philosophers still at the table.");
            self.cancellation_token.cancel();
        }

        let shutdown_timeout = self.config.timeouts.shutdown_timeout();
        let clean_shutdown = timeout(shutdown_timeout, tracker.wait()).await.is_ok();
        if !clean_shutdown {
            error!(
                "Shutdown timeout expired after {:?}; some philosophers are still waiting.",
                shutdown_timeout
            );
        }

        let mut exits = Vec::with_capacity(self.forks.len());
        for seat in seats {
            if seat.is_finished() {
                exits.push(Some(resume_panic(seat.await)));
            } else {
                warn!("A philosopher did not leave the table; abandoning it.");
                seat.abort();
                exits.push(None);
            }
        }
        exits.resize(self.forks.len(), None);

        let summary = DinnerSummary::from_meals(
            &status.seats.iter().map(|seat| seat.meals).collect::<Vec<_>>(),
        );

        DinnerReport {
            verdict,
            samples,
            status,
            exits,
            summary,
            elapsed,
            clean_shutdown,
        }
    }
}

/// Shared read-only view of the forks and every philosopher's progress.
#[derive(Debug)]
struct TableView {
    forks: Vec<Arc<Fork>>,
    progress: Vec<Arc<Progress>>,
}

impl TableSnapshot for TableView {
    fn snapshot(&self) -> TableStatus {
        let seats = self.forks.len();
        let seats = self
            .progress
            .iter()
            .map(|progress| {
                let seat = progress.seat();
                let left = seat.left_fork();
                let right = seat.right_fork(seats);
                let holds = |fork: ForkId| self.forks[fork.index()].holder() == Some(seat);
                SeatStatus {
                    seat,
                    left,
                    right,
                    meals: progress.meals(),
                    finished: progress.is_finished(),
                    activity: progress.activity(),
                    holding: Holding::from_flags(holds(left), holds(right)),
                }
            })
            .collect();
        TableStatus { seats }
    }
}

/// Unwraps a joined task's output, re-raising its panic on this task.
fn resume_panic<T>(joined: Result<T, JoinError>) -> T {
    match joined {
        Ok(value) => value,
        Err(join_error) => match join_error.try_into_panic() {
            Ok(payload) => std::panic::resume_unwind(payload),
            // Tasks are only aborted after they stopped being awaited.
            Err(join_error) => unreachable!("dinner task cancelled while awaited: {join_error}"),
        },
    }
}
