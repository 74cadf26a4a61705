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

//! Identifiers shared by forks, philosophers and the monitor, plus the
//! activity a philosopher publishes while it runs.

use std::fmt;

/// A philosopher's position at the table.
///
/// Seats are numbered `0..N`. Seat `i` owns fork `i` as its left fork and
/// fork `(i + 1) mod N` as its right fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatId(pub usize);

impl SeatId {
    /// Returns the fork on this seat's left.
    #[inline]
    #[must_use]
    pub const fn left_fork(self) -> ForkId {
        ForkId(self.0)
    }

    /// Returns the fork on this seat's right for a table with `seats` places.
    #[inline]
    #[must_use]
    pub const fn right_fork(self, seats: usize) -> ForkId {
        ForkId((self.0 + 1) % seats)
    }

    /// Returns the raw index of the seat.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p[{}]", self.0)
    }
}

/// A fork's position on the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ForkId(pub usize);

impl ForkId {
    /// Returns the raw index of the fork.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ForkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f[{}]", self.0)
    }
}

/// Which of a philosopher's two forks is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The fork with the same index as the seat.
    Left,
    /// The fork shared with the next seat.
    Right,
}

/// What a philosopher is doing right now.
///
/// Stored as a `u8` inside the philosopher's progress so the monitor and the
/// status report can read it without locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Activity {
    /// Seated, not yet started or between steps.
    #[default]
    Idle = 0,
    /// Sleeping through the think delay.
    Thinking = 1,
    /// Waiting on (or pausing between) fork acquisitions.
    PickingUpFork = 2,
    /// Holding both forks.
    Eating = 3,
    /// Releasing forks after a meal.
    PuttingDownFork = 4,
    /// All meals eaten.
    Done = 5,
    /// Stopped by the table's cancellation token.
    Cancelled = 6,
}

impl Activity {
    /// Decodes a value previously produced by `activity as u8`.
    ///
    /// Unknown values map to [`Activity::Idle`].
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Thinking,
            2 => Self::PickingUpFork,
            3 => Self::Eating,
            4 => Self::PuttingDownFork,
            5 => Self::Done,
            6 => Self::Cancelled,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "IDLE",
            Self::Thinking => "THINKING",
            Self::PickingUpFork => "PICKING_UP_FORK",
            Self::Eating => "EATING",
            Self::PuttingDownFork => "PUTTING_DOWN_FORK",
            Self::Done => "DONE",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}
