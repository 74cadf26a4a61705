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

use std::fmt::Debug;

use crate::common::{SeatId, TableStatus};

/// Read-only view of one philosopher's progress.
///
/// The monitor samples philosophers only through this trait, so it never
/// needs (or gets) write access to their counters. Implementations must make
/// each read a single atomic load.
pub trait ProgressSource: Debug + Send + Sync {
    /// The seat this progress belongs to.
    fn seat(&self) -> SeatId;

    /// Meals eaten so far. Never decreases.
    fn meals(&self) -> usize;

    /// Whether the philosopher ate its last meal.
    fn is_finished(&self) -> bool;
}

/// Point-in-time view of the whole table: who holds which fork and what
/// everyone is doing.
///
/// The monitor reports one alongside each sample when it has one.
pub trait TableSnapshot: Debug + Send + Sync {
    /// Reads every seat's counters, activity and fork holdings.
    fn snapshot(&self) -> TableStatus;
}
