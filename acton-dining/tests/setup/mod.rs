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

use std::sync::Once;

use acton_dining::prelude::*;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Ensures tracing initialization happens only once across all tests.
static INIT: Once = Once::new();

/// Initializes the global tracing subscriber for tests.
///
/// Output goes to `logs/dining_tests.txt` so the console stays readable.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        std::fs::create_dir_all("logs").expect("could not create logs dir");

        let file_appender = RollingFileAppender::new(Rotation::NEVER, "logs", "dining_tests.txt");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Leak the guard so the non-blocking writer is not dropped before process exit
        Box::leak(Box::new(guard));

        let filter = EnvFilter::new("info")
            .add_directive("acton_dining::resource::fork=trace".parse().unwrap())
            .add_directive("acton_dining::actor::monitor=debug".parse().unwrap());

        let subscriber = FmtSubscriber::builder()
            .with_span_events(FmtSpan::NONE)
            .with_max_level(Level::TRACE)
            .compact()
            .with_ansi(false)
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");
    });
}

/// A table whose timings make every philosopher reach for its right fork at
/// the same instant: no jitter, no stagger.
#[allow(dead_code)]
pub fn lockstep_config(philosophers: usize) -> DiningConfig {
    let mut config = DiningConfig::default();
    config.table.philosophers = philosophers;
    config.timing.think_jitter_ms = 0;
    config
}

/// Default timings with a fixed seed and a monitor that waits long enough for
/// a lucky table to finish.
#[allow(dead_code)]
pub fn seeded_config(seed: u64) -> DiningConfig {
    let mut config = DiningConfig::default();
    config.table.seed = Some(seed);
    config.monitor.max_samples = 30;
    config
}

/// Drains every event already delivered to `rx`.
#[allow(dead_code)]
pub fn drain(rx: &mut EventReceiver) -> Vec<TableEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
