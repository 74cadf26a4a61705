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

use std::fmt;

use tokio::sync::mpsc;
use tracing::{info, trace};

use crate::actor::Verdict;
use crate::common::{ForkId, SeatId, TableStatus};

/// Receiving half handed out by [`EventSink::channel`].
pub type EventReceiver = mpsc::UnboundedReceiver<TableEvent>;

/// Something observable that happened at the table.
///
/// Every event is logged through `tracing`. When an observer is attached to
/// the dinner the same event is also delivered over a channel, in the order
/// the underlying transitions happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    /// `seat` now holds `fork`.
    ForkAcquired {
        /// The fork that changed hands.
        fork: ForkId,
        /// The new holder.
        seat: SeatId,
    },
    /// `seat` put `fork` back on the table.
    ForkReleased {
        /// The fork that changed hands.
        fork: ForkId,
        /// The previous holder.
        seat: SeatId,
    },
    /// `seat` finished a meal; `meals` is its new cumulative count.
    MealFinished {
        /// The philosopher that ate.
        seat: SeatId,
        /// Meals eaten so far, including this one.
        meals: usize,
    },
    /// `seat` ate its last meal and left the table.
    PhilosopherFinished {
        /// The philosopher that finished.
        seat: SeatId,
        /// Final meal count.
        meals: usize,
    },
    /// One monitor sample: per-seat cumulative meal counts.
    MonitorSample {
        /// 1-based sample number.
        sample: usize,
        /// Meals per seat, indexed by seat.
        meals: Vec<usize>,
        /// Sum of `meals`.
        total: usize,
    },
    /// Seat-by-seat table status taken right after a monitor sample.
    StatusReport(TableStatus),
    /// The monitor stopped sampling.
    MonitorVerdict(Verdict),
}

impl fmt::Display for TableEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForkAcquired { fork, seat } => write!(f, "{seat} took {fork}"),
            Self::ForkReleased { fork, seat } => write!(f, "{seat} dropped {fork}"),
            Self::MealFinished { seat, meals } => {
                write!(f, "{seat} thought and ate ({meals})")
            }
            Self::PhilosopherFinished { seat, meals } => {
                write!(f, "{seat} finished thinking and eating ({meals})")
            }
            Self::MonitorSample {
                sample,
                meals,
                total,
            } => {
                write!(f, "sample {sample}:")?;
                for (seat, count) in meals.iter().enumerate() {
                    write!(f, " {} has eaten {count} times;", SeatId(seat))?;
                }
                write!(f, " total {total}")
            }
            Self::StatusReport(status) => write!(f, "{}", status.to_string().trim_end()),
            Self::MonitorVerdict(verdict) => write!(f, "{verdict}"),
        }
    }
}

/// Fan-out point for [`TableEvent`]s.
///
/// Cloning is cheap. A sink without an observer only logs.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    observer: Option<mpsc::UnboundedSender<TableEvent>>,
}

impl EventSink {
    /// Creates a sink that only logs.
    #[must_use]
    pub const fn silent() -> Self {
        Self { observer: None }
    }

    /// Creates a sink together with the receiver that observes it.
    #[must_use]
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { observer: Some(tx) }, rx)
    }

    /// Logs `event` and forwards it to the observer, if any.
    ///
    /// Never blocks, so it is safe to call while holding a fork's lock.
    /// A dropped observer is ignored.
    pub fn emit(&self, event: TableEvent) {
        match &event {
            TableEvent::ForkAcquired { .. } | TableEvent::ForkReleased { .. } => {
                trace!("{event}");
            }
            _ => info!("{event}"),
        }
        if let Some(observer) = &self.observer {
            let _ = observer.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observer_sees_events_in_emit_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.emit(TableEvent::ForkAcquired {
            fork: ForkId(0),
            seat: SeatId(0),
        });
        sink.emit(TableEvent::ForkReleased {
            fork: ForkId(0),
            seat: SeatId(0),
        });

        assert!(matches!(rx.try_recv(), Ok(TableEvent::ForkAcquired { .. })));
        assert!(matches!(rx.try_recv(), Ok(TableEvent::ForkReleased { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn emitting_after_observer_dropped_is_harmless() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(TableEvent::MealFinished {
            seat: SeatId(2),
            meals: 1,
        });
    }

    #[test]
    fn sample_renders_every_seat() {
        let event = TableEvent::MonitorSample {
            sample: 3,
            meals: vec![1, 0, 2],
            total: 3,
        };
        assert_eq!(
            event.to_string(),
            "sample 3: p[0] has eaten 1 times; p[1] has eaten 0 times; p[2] has eaten 2 times; total 3"
        );
    }
}
