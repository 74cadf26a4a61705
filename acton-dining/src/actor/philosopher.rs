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

//! The philosopher: a plain struct plus a free-standing `run` future that the
//! table spawns as its own task.
//!
//! Each meal follows the same steps: think, pick up the left fork, pause, pick
//! up the right fork, eat, count the meal, put down right then left. There is
//! no timeout on a fork. A philosopher stuck waiting for its right fork stays
//! stuck until the table's cancellation token fires; spotting that is the
//! monitor's job.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use crate::common::{Activity, DiningConfig, SeatId, Side, TimingConfig};
use crate::message::{EventSink, TableEvent};
use crate::resource::Fork;
use crate::traits::ProgressSource;

/// A philosopher's shared progress counters.
///
/// Written only by the philosopher's own task; everyone else reads. All
/// fields are atomics so a read never tears and never needs a lock.
#[derive(Debug)]
pub struct Progress {
    seat: SeatId,
    meals: AtomicUsize,
    finished: AtomicBool,
    activity: AtomicU8,
}

impl Progress {
    /// Creates progress for `seat`: no meals, not finished, idle.
    #[must_use]
    pub const fn new(seat: SeatId) -> Self {
        Self {
            seat,
            meals: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
            activity: AtomicU8::new(Activity::Idle as u8),
        }
    }

    /// What the philosopher is doing right now.
    #[must_use]
    pub fn activity(&self) -> Activity {
        Activity::from_u8(self.activity.load(Ordering::Acquire))
    }

    fn set_activity(&self, activity: Activity) {
        trace!(seat = %self.seat, %activity);
        self.activity.store(activity as u8, Ordering::Release);
    }

    /// Adds one meal and returns the new count.
    fn record_meal(&self) -> usize {
        self.meals.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn mark_finished(&self) {
        let was_finished = self.finished.swap(true, Ordering::AcqRel);
        debug_assert!(!was_finished, "{} finished twice", self.seat);
    }
}

impl ProgressSource for Progress {
    fn seat(&self) -> SeatId {
        self.seat
    }

    fn meals(&self) -> usize {
        self.meals.load(Ordering::Acquire)
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// How a philosopher's task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhilosopherExit {
    /// Ate every meal.
    Finished {
        /// Final meal count.
        meals: usize,
    },
    /// Stopped by the cancellation token; any held forks were put down.
    Cancelled {
        /// Meals eaten before stopping.
        meals: usize,
    },
}

/// One seat at the table.
#[derive(Debug)]
pub struct Philosopher {
    seat: SeatId,
    left: Arc<Fork>,
    right: Arc<Fork>,
    meals: usize,
    timing: TimingConfig,
    think: Duration,
    progress: Arc<Progress>,
    events: EventSink,
    cancellation_token: CancellationToken,
}

impl Philosopher {
    /// Seats a philosopher between `left` and `right`.
    ///
    /// Meal budget and timings come from `config`. The think time is drawn
    /// once here and reused for every meal. When `config.table.seed` is set
    /// it is drawn from `seed + seat`, so a whole table replays the same way.
    #[must_use]
    pub fn new(seat: SeatId, left: Arc<Fork>, right: Arc<Fork>, config: &DiningConfig) -> Self {
        let mut rng = match config.table.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(seat.index() as u64)),
            None => StdRng::from_os_rng(),
        };
        let think = think_time(&config.timing, &mut rng);
        Self {
            seat,
            left,
            right,
            meals: config.table.meals,
            timing: config.timing.clone(),
            think,
            progress: Arc::new(Progress::new(seat)),
            events: EventSink::silent(),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Reports meals and departures to `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Lets `token` stop this philosopher at any suspension point.
    ///
    /// Without a fired token the philosopher waits on a fork forever.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// The philosopher's seat.
    #[inline]
    #[must_use]
    pub const fn seat(&self) -> SeatId {
        self.seat
    }

    /// How long this philosopher thinks before every meal.
    #[must_use]
    pub const fn think_time(&self) -> Duration {
        self.think
    }

    /// Shared handle to this philosopher's counters.
    #[must_use]
    pub fn progress(&self) -> Arc<Progress> {
        Arc::clone(&self.progress)
    }

    /// Eats the configured number of meals, then leaves the table.
    ///
    /// Returns early only when the cancellation token fires; forks held at
    /// that moment are put down first.
    #[instrument(name = "philosopher", skip(self), fields(seat = %self.seat))]
    pub async fn run(mut self) -> PhilosopherExit {
        for _ in 0..self.meals {
            self.progress.set_activity(Activity::Thinking);
            if !self.pause(self.think).await {
                return self.leave(false, false);
            }

            self.progress.set_activity(Activity::PickingUpFork);
            if !self.pick_up(Side::Left).await {
                return self.leave(false, false);
            }
            if !self.pause(self.timing.fork_delay()).await {
                return self.leave(true, false);
            }
            if !self.pick_up(Side::Right).await {
                return self.leave(true, false);
            }

            self.progress.set_activity(Activity::Eating);
            if !self.pause(self.timing.eat()).await {
                return self.leave(true, true);
            }
            let meals = self.progress.record_meal();

            self.progress.set_activity(Activity::PuttingDownFork);
            self.right.release(self.seat);
            self.left.release(self.seat);
            self.progress.set_activity(Activity::Idle);

            self.events
                .emit(TableEvent::MealFinished { seat: self.seat, meals });
        }

        let meals = self.progress.meals();
        self.progress.mark_finished();
        self.progress.set_activity(Activity::Done);
        self.events
            .emit(TableEvent::PhilosopherFinished { seat: self.seat, meals });
        PhilosopherExit::Finished { meals }
    }

    /// Sleeps for `duration`. Returns `false` if cancelled first.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            () = self.cancellation_token.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }

    /// Waits for the fork on `side`. Returns `false` if cancelled first, in
    /// which case the fork was not taken.
    async fn pick_up(&self, side: Side) -> bool {
        let fork = match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        };
        tokio::select! {
            () = self.cancellation_token.cancelled() => false,
            () = fork.acquire(self.seat) => true,
        }
    }

    fn leave(&self, holding_left: bool, holding_right: bool) -> PhilosopherExit {
        if holding_right {
            self.right.release(self.seat);
        }
        if holding_left {
            self.left.release(self.seat);
        }
        self.progress.set_activity(Activity::Cancelled);
        let meals = self.progress.meals();
        debug!(seat = %self.seat, meals, "left the table early");
        PhilosopherExit::Cancelled { meals }
    }
}

/// Base think time plus up to `think_jitter_ms` drawn from `rng`.
fn think_time(timing: &TimingConfig, rng: &mut StdRng) -> Duration {
    let jitter_ms = timing.think_jitter_ms;
    if jitter_ms == 0 {
        return timing.think_base();
    }
    timing.think_base() + Duration::from_millis(rng.random_range(0..=jitter_ms))
}
