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


use std::collections::HashMap;
use std::time::Duration;

use acton_dining::prelude::*;

use crate::setup::*;

mod setup;

#[tokio::test(start_paused = true)]
async fn lockstep_table_deadlocks_on_the_first_sample() -> anyhow::Result<()> {
    initialize_tracing();

    for seats in [2, 3, 5] {
        let report = Dinner::new(lockstep_config(seats))?.run().await;

        assert_eq!(report.verdict, Verdict::Deadlock, "{seats} seats");
        assert_eq!(report.samples.len(), 1);
        assert_eq!(report.samples[0].total, 0);
        assert_eq!(report.meals(), vec![0; seats]);
        assert!(report.status.is_circular_wait(), "{}", report.status);
        for seat in &report.status.seats {
            assert_eq!(seat.activity, Activity::PickingUpFork);
        }

        assert!(report.clean_shutdown);
        assert_eq!(
            report.exits,
            vec![Some(PhilosopherExit::Cancelled { meals: 0 }); seats]
        );
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancelled_philosophers_put_every_fork_back() -> anyhow::Result<()> {
    initialize_tracing();

    let dinner = Dinner::new(lockstep_config(3))?;
    let forks = dinner.forks().to_vec();
    let report = dinner.run().await;

    assert_eq!(report.verdict, Verdict::Deadlock);
    assert!(forks.iter().all(|fork| !fork.is_held()));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn deadlock_verdict_is_reported_once_as_an_event() -> anyhow::Result<()> {
    initialize_tracing();

    let (dinner, mut rx) = Dinner::observed(lockstep_config(3))?;
    dinner.run().await;
    let events = drain(&mut rx);

    let verdicts: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            TableEvent::MonitorVerdict(verdict) => Some(*verdict),
            _ => None,
        })
        .collect();
    assert_eq!(verdicts, vec![Verdict::Deadlock]);
    assert!(events.contains(&TableEvent::MonitorSample {
        sample: 1,
        meals: vec![0, 0, 0],
        total: 0,
    }));
    assert!(!events
        .iter()
        .any(|event| matches!(event, TableEvent::MealFinished { .. })));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn one_philosopher_at_a_time_always_finishes() -> anyhow::Result<()> {
    initialize_tracing();

    // Every philosopher eats all five meals (5 x 4650 ms) before the next one sits down.
    let mut config = lockstep_config(3);
    config.table.launch_stagger_ms = 25_000;
    config.monitor.max_samples = 20;

    let (dinner, mut rx) = Dinner::observed(config)?;
    let report = dinner.run().await;

    assert_eq!(report.verdict, Verdict::AllCompleted);
    assert_eq!(report.meals(), vec![5, 5, 5]);
    assert!(report.all_finished());
    assert_eq!(report.samples.len(), 10);
    assert!(report.elapsed >= Duration::from_millis(73_250));
    assert_eq!(report.summary.total, 15);
    assert_eq!(report.summary.minimum, 5);
    assert_eq!(
        report.exits,
        vec![Some(PhilosopherExit::Finished { meals: 5 }); 3]
    );
    for seat in &report.status.seats {
        assert_eq!(seat.activity, Activity::Done);
        assert_eq!(seat.holding, Holding::Neither);
    }

    let first_meals: Vec<SeatId> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            TableEvent::MealFinished { seat, meals: 1 } => Some(seat),
            _ => None,
        })
        .collect();
    assert_eq!(first_meals, vec![SeatId(0), SeatId(1), SeatId(2)]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn nobody_sits_down_after_the_verdict() -> anyhow::Result<()> {
    initialize_tracing();

    // The first sample (1 s) lands before the second philosopher is seated (10 s).
    let mut config = lockstep_config(3);
    config.table.launch_stagger_ms = 10_000;
    config.monitor.sample_interval_ms = 1_000;

    let (dinner, mut rx) = Dinner::observed(config)?;
    let report = dinner.run().await;

    assert_eq!(report.verdict, Verdict::Deadlock);
    assert_eq!(report.samples.len(), 1);
    assert_eq!(report.elapsed, Duration::from_secs(1));
    assert_eq!(report.meals(), vec![0, 0, 0]);
    assert_eq!(report.summary.total, 0);
    assert_eq!(report.status.seats[0].activity, Activity::Thinking);
    assert_eq!(report.status.seats[1].activity, Activity::Idle);
    assert_eq!(report.status.seats[2].activity, Activity::Idle);
    assert!(report.clean_shutdown);
    assert_eq!(
        report.exits,
        vec![Some(PhilosopherExit::Cancelled { meals: 0 }), None, None]
    );

    assert!(!drain(&mut rx).into_iter().any(|event| matches!(
        event,
        TableEvent::ForkAcquired { .. } | TableEvent::MealFinished { .. }
    )));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn every_sample_comes_with_the_table_status() -> anyhow::Result<()> {
    initialize_tracing();

    let (dinner, mut rx) = Dinner::observed(lockstep_config(3))?;
    dinner.run().await;
    let events = drain(&mut rx);

    let sample = events
        .iter()
        .position(|event| matches!(event, TableEvent::MonitorSample { .. }))
        .expect("the monitor took a sample");
    match &events[sample + 1] {
        TableEvent::StatusReport(status) => {
            assert!(status.is_circular_wait(), "{status}");
            assert!(status.to_string().contains("holding the left fork"));
        }
        other => panic!("expected a status report, got {other:?}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn jitter_lets_some_tables_finish() -> anyhow::Result<()> {
    initialize_tracing();

    let mut completed = 0;
    for seed in 0..100 {
        let report = Dinner::new(seeded_config(seed))?.run().await;
        assert!(report.clean_shutdown, "seed {seed}");

        match report.verdict {
            Verdict::AllCompleted => {
                completed += 1;
                assert_eq!(report.meals(), vec![5; 5], "seed {seed}");
                assert!(report.all_finished());
                let last = report.samples.last().expect("completion needs a sample");
                assert_eq!(last.total, 25);
            }
            Verdict::Deadlock => {
                assert_eq!(report.summary.total, 0, "seed {seed}");
                assert!(report.status.is_circular_wait(), "seed {seed}");
            }
            Verdict::Exhausted => {
                assert_eq!(report.samples.len(), 30);
                assert!(report.samples.iter().all(|sample| sample.total > 0));
            }
            Verdict::Interrupted => panic!("nobody cancelled seed {seed}"),
        }
    }
    assert!(completed > 0, "no seeded run completed");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn same_seed_replays_the_same_dinner() -> anyhow::Result<()> {
    initialize_tracing();

    let first = Dinner::new(seeded_config(42))?.run().await;
    let second = Dinner::new(seeded_config(42))?.run().await;

    assert_eq!(first.verdict, second.verdict);
    assert_eq!(first.samples, second.samples);
    assert_eq!(first.meals(), second.meals());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn event_log_shows_exclusive_forks_taken_left_then_right() -> anyhow::Result<()> {
    initialize_tracing();

    for seed in 0..20 {
        let config = seeded_config(seed);
        let seats = config.table.philosophers;
        let (dinner, mut rx) = Dinner::observed(config)?;
        let report = dinner.run().await;
        let events = drain(&mut rx);

        let mut holders: HashMap<ForkId, SeatId> = HashMap::new();
        let mut held: HashMap<SeatId, Vec<ForkId>> = HashMap::new();
        let mut meals: HashMap<SeatId, usize> = HashMap::new();

        for event in &events {
            match event {
                TableEvent::ForkAcquired { fork, seat } => {
                    assert!(
                        holders.insert(*fork, *seat).is_none(),
                        "seed {seed}: {seat} took {fork} while it was held"
                    );
                    let hand = held.entry(*seat).or_default();
                    let expected = if hand.is_empty() {
                        seat.left_fork()
                    } else {
                        seat.right_fork(seats)
                    };
                    assert_eq!(*fork, expected, "seed {seed}: {seat} took forks out of order");
                    hand.push(*fork);
                }
                TableEvent::ForkReleased { fork, seat } => {
                    assert_eq!(holders.remove(fork), Some(*seat), "seed {seed}");
                    let hand = held.entry(*seat).or_default();
                    // Right goes down before left.
                    assert_eq!(hand.pop(), Some(*fork), "seed {seed}");
                }
                TableEvent::MealFinished { seat, meals: count } => {
                    // Both forks are already back on the table.
                    assert!(held.get(seat).map_or(true, Vec::is_empty), "seed {seed}");
                    let previous = meals.insert(*seat, *count).unwrap_or(0);
                    assert_eq!(*count, previous + 1, "seed {seed}");
                }
                _ => {}
            }
        }

        assert!(holders.is_empty(), "seed {seed}: forks left on the table");
        if report.verdict == Verdict::AllCompleted {
            assert!(meals.values().all(|count| *count == 5), "seed {seed}");
        }
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn monitor_totals_never_decrease() -> anyhow::Result<()> {
    initialize_tracing();

    for seed in 0..20 {
        let report = Dinner::new(seeded_config(seed))?.run().await;
        for pair in report.samples.windows(2) {
            assert!(pair[0].total <= pair[1].total, "seed {seed}");
            for (before, after) in pair[0].meals.iter().zip(&pair[1].meals) {
                assert!(before <= after, "seed {seed}");
            }
        }
        for sample in &report.samples {
            assert_eq!(sample.total, sample.meals.iter().sum::<usize>());
            assert!(sample.meals.iter().all(|meals| *meals <= 5));
        }
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn no_progress_rule_always_reaches_a_decision() -> anyhow::Result<()> {
    initialize_tracing();

    for seed in 0..50 {
        let mut config = seeded_config(seed);
        config.monitor.stall_detection = StallDetection::NoProgress;
        let report = Dinner::new(config)?.run().await;

        // Each sample either moves the total (at most 25 times) or ends the watch.
        match report.verdict {
            Verdict::Deadlock => {
                let last = report.samples.last().expect("a verdict needs a sample");
                let previous = report
                    .samples
                    .iter()
                    .rev()
                    .nth(1)
                    .map_or(0, |sample| sample.total);
                assert_eq!(last.total, previous, "seed {seed}");
                assert!(!last.all_finished());
            }
            Verdict::AllCompleted => assert_eq!(report.meals(), vec![5; 5]),
            other => panic!("seed {seed} ended with {other:?}"),
        }
        assert!(report.clean_shutdown);
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancelling_the_table_interrupts_the_monitor() -> anyhow::Result<()> {
    initialize_tracing();

    let dinner = Dinner::new(DiningConfig::default())?;
    let token = dinner.cancellation_token();
    let forks = dinner.forks().to_vec();
    let task = tokio::spawn(dinner.run());

    tokio::time::sleep(Duration::from_millis(3_000)).await;
    token.cancel();
    let report = task.await?;

    assert_eq!(report.verdict, Verdict::Interrupted);
    assert!(report.samples.is_empty());
    assert!(report.clean_shutdown);
    assert!(report
        .exits
        .iter()
        .all(|exit| matches!(exit, Some(PhilosopherExit::Cancelled { .. }))));
    assert!(forks.iter().all(|fork| !fork.is_held()));
    Ok(())
}

#[test]
fn invalid_tables_are_rejected() {
    let mut config = DiningConfig::default();
    config.table.philosophers = 1;
    assert!(matches!(
        Dinner::new(config),
        Err(ConfigError::TooFewPhilosophers(1))
    ));

    let mut config = DiningConfig::default();
    config.table.meals = 0;
    assert!(matches!(Dinner::new(config), Err(ConfigError::NoMeals)));
}

#[test]
fn status_before_dinner_is_idle_and_empty_handed() -> anyhow::Result<()> {
    let dinner = Dinner::new(DiningConfig::default())?;
    let status = dinner.status();

    assert_eq!(status.seats.len(), 5);
    for (index, seat) in status.seats.iter().enumerate() {
        assert_eq!(seat.seat, SeatId(index));
        assert_eq!(seat.left, ForkId(index));
        assert_eq!(seat.right, ForkId((index + 1) % 5));
        assert_eq!(seat.meals, 0);
        assert_eq!(seat.activity, Activity::Idle);
        assert_eq!(seat.holding, Holding::Neither);
    }
    assert!(!status.is_circular_wait());
    Ok(())
}
