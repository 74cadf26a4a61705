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

//! A fork: the mutually exclusive resource two neighbouring philosophers share.
//!
//! The holder is guarded by a single `parking_lot::Mutex` and paired with a
//! [`tokio::sync::Notify`]. A waiter registers for the next release *before*
//! it inspects the holder, so a release that lands between the check and the
//! wait still wakes it.

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::trace;

use crate::common::{ForkId, SeatId};
use crate::message::{EventSink, TableEvent};

/// A broken pick-up/put-down discipline.
///
/// These are contract violations, not runtime conditions: [`Fork::release`]
/// and [`Fork::acquire`] panic with them. [`Fork::try_release`] returns them
/// for callers that want to inspect the failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForkError {
    /// The fork was put down while nobody held it.
    #[error("{seat} tried to put down {fork}, which nobody holds")]
    NotHeld {
        /// The fork involved.
        fork: ForkId,
        /// The seat that tried to put it down.
        seat: SeatId,
    },
    /// The fork was put down by someone other than its holder.
    #[error("{seat} tried to put down {fork}, which is held by {holder}")]
    HeldByOther {
        /// The fork involved.
        fork: ForkId,
        /// The seat that tried to put it down.
        seat: SeatId,
        /// The seat that actually holds it.
        holder: SeatId,
    },
    /// The holder tried to pick the same fork up again.
    #[error("{seat} tried to pick up {fork}, which it already holds")]
    AlreadyHeld {
        /// The fork involved.
        fork: ForkId,
        /// The seat that already holds it.
        seat: SeatId,
    },
}

/// A reusable, mutually exclusive resource with an owner identity.
///
/// At most one seat holds a fork at any instant. `holder == None` is the
/// unheld state.
#[derive(Debug)]
pub struct Fork {
    id: ForkId,
    holder: Mutex<Option<SeatId>>,
    released: Notify,
    events: EventSink,
}

impl Fork {
    /// Creates an unheld fork that reports transitions only through `tracing`.
    #[must_use]
    pub fn new(id: ForkId) -> Self {
        Self::with_events(id, EventSink::silent())
    }

    /// Creates an unheld fork that reports transitions to `events`.
    #[must_use]
    pub fn with_events(id: ForkId, events: EventSink) -> Self {
        Self {
            id,
            holder: Mutex::new(None),
            released: Notify::new(),
            events,
        }
    }

    /// Returns this fork's identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ForkId {
        self.id
    }

    /// Returns the seat currently holding the fork, if any.
    #[must_use]
    pub fn holder(&self) -> Option<SeatId> {
        *self.holder.lock()
    }

    /// Returns `true` while some seat holds the fork.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.holder.lock().is_some()
    }

    /// Picks the fork up for `seat`, waiting as long as it takes.
    ///
    /// There is no timeout: if the holder never puts it down, this never
    /// returns. Dropping the future while it waits leaves the fork untouched.
    ///
    /// # Panics
    ///
    /// Panics with [`ForkError::AlreadyHeld`] if `seat` already holds the fork.
    pub async fn acquire(&self, seat: SeatId) {
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.try_acquire(seat) {
                return;
            }

            trace!(fork = %self.id, %seat, "waiting for fork");
            notified.await;
        }
    }

    /// Picks the fork up for `seat` if nobody holds it.
    ///
    /// Returns `false` without waiting when another seat holds it.
    ///
    /// # Panics
    ///
    /// Panics with [`ForkError::AlreadyHeld`] if `seat` already holds the fork.
    pub fn try_acquire(&self, seat: SeatId) -> bool {
        let mut holder = self.holder.lock();
        match *holder {
            None => {
                *holder = Some(seat);
                self.events.emit(TableEvent::ForkAcquired {
                    fork: self.id,
                    seat,
                });
                true
            }
            Some(current) if current == seat => {
                panic!("{}", ForkError::AlreadyHeld { fork: self.id, seat });
            }
            Some(_) => false,
        }
    }

    /// Puts the fork down on behalf of `seat` and wakes every waiter.
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::NotHeld`] if nobody holds the fork and
    /// [`ForkError::HeldByOther`] if another seat holds it. The fork is left
    /// unchanged in both cases.
    pub fn try_release(&self, seat: SeatId) -> Result<(), ForkError> {
        {
            let mut holder = self.holder.lock();
            match *holder {
                Some(current) if current == seat => {
                    *holder = None;
                    self.events.emit(TableEvent::ForkReleased {
                        fork: self.id,
                        seat,
                    });
                }
                Some(current) => {
                    return Err(ForkError::HeldByOther {
                        fork: self.id,
                        seat,
                        holder: current,
                    });
                }
                None => {
                    return Err(ForkError::NotHeld {
                        fork: self.id,
                        seat,
                    });
                }
            }
        }
        self.released.notify_waiters();
        Ok(())
    }

    /// Puts the fork down on behalf of `seat` and wakes every waiter.
    ///
    /// # Panics
    ///
    /// Panics if `seat` does not hold the fork; see [`Fork::try_release`].
    pub fn release(&self, seat: SeatId) {
        if let Err(violation) = self.try_release(seat) {
            panic!("{violation}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn new_fork_is_unheld() {
        let fork = Fork::new(ForkId(3));
        assert_eq!(fork.id(), ForkId(3));
        assert!(!fork.is_held());
        assert_eq!(fork.holder(), None);
    }

    #[test]
    fn try_acquire_records_the_holder() {
        let fork = Fork::new(ForkId(0));
        assert!(fork.try_acquire(SeatId(1)));
        assert_eq!(fork.holder(), Some(SeatId(1)));
        assert!(!fork.try_acquire(SeatId(2)));
        assert_eq!(fork.holder(), Some(SeatId(1)));
    }

    #[test]
    fn releasing_an_unheld_fork_is_rejected() {
        let fork = Fork::new(ForkId(0));
        assert_eq!(
            fork.try_release(SeatId(0)),
            Err(ForkError::NotHeld {
                fork: ForkId(0),
                seat: SeatId(0),
            })
        );
    }

    #[test]
    fn releasing_someone_elses_fork_is_rejected() {
        let fork = Fork::new(ForkId(2));
        assert!(fork.try_acquire(SeatId(2)));
        assert_eq!(
            fork.try_release(SeatId(1)),
            Err(ForkError::HeldByOther {
                fork: ForkId(2),
                seat: SeatId(1),
                holder: SeatId(2),
            })
        );
        assert_eq!(fork.holder(), Some(SeatId(2)));
    }

    #[test]
    #[should_panic(expected = "which nobody holds")]
    fn release_panics_on_contract_violation() {
        Fork::new(ForkId(0)).release(SeatId(0));
    }

    #[test]
    #[should_panic(expected = "which it already holds")]
    fn picking_up_a_held_fork_twice_panics() {
        let fork = Fork::new(ForkId(0));
        assert!(fork.try_acquire(SeatId(0)));
        let _ = fork.try_acquire(SeatId(0));
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_is_woken_by_release() {
        let fork = Arc::new(Fork::new(ForkId(0)));
        fork.acquire(SeatId(0)).await;

        let contender = {
            let fork = Arc::clone(&fork);
            tokio::spawn(async move {
                fork.acquire(SeatId(1)).await;
                fork.holder()
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!contender.is_finished());
        assert_eq!(fork.holder(), Some(SeatId(0)));

        fork.release(SeatId(0));
        let holder = contender.await.expect("contender panicked");
        assert_eq!(holder, Some(SeatId(1)));
    }
}
