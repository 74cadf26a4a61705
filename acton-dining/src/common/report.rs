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

//! Snapshots and summaries produced by a dinner.

use std::fmt;
use std::time::Duration;

use crate::actor::{PhilosopherExit, Sample, Verdict};
use crate::common::{Activity, ForkId, SeatId};

/// Which of its forks a philosopher holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Holding {
    /// Both forks: eating, or about to put them down.
    Both,
    /// Only the left fork.
    Left,
    /// Only the right fork.
    Right,
    /// No forks.
    Neither,
}

impl Holding {
    /// Builds the value from the two "holds this fork" flags.
    #[must_use]
    pub const fn from_flags(left: bool, right: bool) -> Self {
        match (left, right) {
            (true, true) => Self::Both,
            (true, false) => Self::Left,
            (false, true) => Self::Right,
            (false, false) => Self::Neither,
        }
    }

    /// Number of forks held.
    #[must_use]
    pub const fn count(self) -> usize {
        match self {
            Self::Both => 2,
            Self::Left | Self::Right => 1,
            Self::Neither => 0,
        }
    }
}

/// One seat in a [`TableStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatStatus {
    /// The seat.
    pub seat: SeatId,
    /// Its left fork.
    pub left: ForkId,
    /// Its right fork.
    pub right: ForkId,
    /// Meals eaten so far.
    pub meals: usize,
    /// Whether it ate its last meal.
    pub finished: bool,
    /// What it was doing.
    pub activity: Activity,
    /// Which forks it held.
    pub holding: Holding,
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is assigned forks l: {} and r: {}, has eaten {} times, and currently is holding ",
            self.seat, self.left, self.right, self.meals
        )?;
        match self.holding {
            Holding::Both => f.write_str("both forks")?,
            Holding::Neither => f.write_str("neither fork")?,
            Holding::Left => write!(f, "the left fork ({})", self.left)?,
            Holding::Right => write!(f, "the right fork ({})", self.right)?,
        }
        write!(f, " in state {}", self.activity)
    }
}

/// Point-in-time view of every seat.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableStatus {
    /// Seats in order.
    pub seats: Vec<SeatStatus>,
}

impl TableStatus {
    /// True when every seat holds exactly one fork and nobody finished: the
    /// circular wait.
    #[must_use]
    pub fn is_circular_wait(&self) -> bool {
        !self.seats.is_empty()
            && self
                .seats
                .iter()
                .all(|seat| seat.holding == Holding::Left && !seat.finished)
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Table status: table has {} seats", self.seats.len())?;
        for seat in &self.seats {
            writeln!(f, "  {seat}")?;
        }
        Ok(())
    }
}

/// Meal statistics across the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DinnerSummary {
    /// Sum of all meals.
    pub total: usize,
    /// Most meals eaten by one philosopher.
    pub maximum: usize,
    /// Fewest meals eaten by one philosopher.
    pub minimum: usize,
    /// Mean meals per philosopher.
    pub average: f64,
}

impl DinnerSummary {
    /// Summarises per-seat meal counts. An empty slice yields all zeros.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_meals(meals: &[usize]) -> Self {
        let total: usize = meals.iter().sum();
        let average = if meals.is_empty() {
            0.0
        } else {
            total as f64 / meals.len() as f64
        };
        Self {
            total,
            maximum: meals.iter().copied().max().unwrap_or(0),
            minimum: meals.iter().copied().min().unwrap_or(0),
            average,
        }
    }
}

impl fmt::Display for DinnerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Results:")?;
        writeln!(f, "  Total number of meals: {}", self.total)?;
        writeln!(f, "  Maximum meals:         {}", self.maximum)?;
        writeln!(f, "  Minimum meals:         {}", self.minimum)?;
        write!(f, "  Average meals:         {:.2}", self.average)
    }
}

/// Everything a finished dinner reports.
#[derive(Debug, Clone)]
pub struct DinnerReport {
    /// Why the monitor stopped.
    pub verdict: Verdict,
    /// Monitor samples, oldest first.
    pub samples: Vec<Sample>,
    /// The table the moment the monitor stopped, before any shutdown.
    pub status: TableStatus,
    /// How each philosopher's task ended, by seat. `None` for a seat that
    /// was never taken or a task that did not end within the shutdown
    /// timeout.
    pub exits: Vec<Option<PhilosopherExit>>,
    /// Meal statistics at the moment the monitor stopped.
    pub summary: DinnerSummary,
    /// Time from start until the monitor stopped.
    pub elapsed: Duration,
    /// Whether every task ended within the shutdown timeout.
    pub clean_shutdown: bool,
}

impl DinnerReport {
    /// Meals per seat when the monitor stopped.
    #[must_use]
    pub fn meals(&self) -> Vec<usize> {
        self.status.seats.iter().map(|seat| seat.meals).collect()
    }

    /// Whether every philosopher had finished when the monitor stopped.
    #[must_use]
    pub fn all_finished(&self) -> bool {
        self.status.seats.iter().all(|seat| seat.finished)
    }
}
