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


//! Runs one dinner and prints what happened.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use acton_dining::prelude::*;

#[derive(Parser)]
#[command(name = "acton-dining")]
#[command(version)]
#[command(about = "Dining philosophers with a deadlock-watching monitor")]
struct Cli {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/acton-dining/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of philosophers (and forks)
    #[arg(short, long)]
    philosophers: Option<usize>,

    /// Meals each philosopher eats
    #[arg(short, long)]
    meals: Option<usize>,

    /// Base thinking time in milliseconds
    #[arg(short, long = "think-time")]
    think_time: Option<u64>,

    /// Upper bound of the random extra thinking time in milliseconds
    #[arg(short = 'j', long = "think-jitter")]
    think_jitter: Option<u64>,

    /// Pause between picking up the left and the right fork, in milliseconds
    #[arg(short, long = "fork-time")]
    fork_time: Option<u64>,

    /// Eating time in milliseconds
    #[arg(short, long = "eat-time")]
    eat_time: Option<u64>,

    /// Interval between monitor samples in milliseconds
    #[arg(short, long = "status-time")]
    status_time: Option<u64>,

    /// Maximum number of monitor samples
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Pause between seating consecutive philosophers, in milliseconds
    #[arg(short = 'w', long)]
    stagger: Option<u64>,

    /// Seed for the thinking-time jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Rule the monitor uses to call a deadlock
    #[arg(long, value_enum)]
    stall_detection: Option<StallDetection>,

    /// Also write logs to this directory
    #[arg(long)]
    log_dir: Option<String>,
}

impl Cli {
    /// Overrides the loaded configuration with whatever was given on the command line.
    fn apply(&self, config: &mut DiningConfig) {
        if let Some(philosophers) = self.philosophers {
            config.table.philosophers = philosophers;
        }
        if let Some(meals) = self.meals {
            config.table.meals = meals;
        }
        if let Some(stagger) = self.stagger {
            config.table.launch_stagger_ms = stagger;
        }
        if self.seed.is_some() {
            config.table.seed = self.seed;
        }
        if let Some(think) = self.think_time {
            config.timing.think_base_ms = think;
        }
        if let Some(jitter) = self.think_jitter {
            config.timing.think_jitter_ms = jitter;
        }
        if let Some(fork) = self.fork_time {
            config.timing.fork_delay_ms = fork;
        }
        if let Some(eat) = self.eat_time {
            config.timing.eat_ms = eat;
        }
        if let Some(interval) = self.status_time {
            config.monitor.sample_interval_ms = interval;
        }
        if let Some(samples) = self.iterations {
            config.monitor.max_samples = samples;
        }
        if let Some(rule) = self.stall_detection {
            config.monitor.stall_detection = rule;
        }
        if self.log_dir.is_some() {
            config.tracing.log_directory.clone_from(&self.log_dir);
        }
    }
}

fn print_configuration(config: &DiningConfig) {
    println!("Configuration:");
    println!("  Philosophers:        {}", config.table.philosophers);
    println!("  Meals:               {}", config.table.meals);
    println!(
        "  Thinking time:       {} ms + up to {} ms",
        config.timing.think_base_ms, config.timing.think_jitter_ms
    );
    println!("  Fork delay:          {} ms", config.timing.fork_delay_ms);
    println!("  Eating time:         {} ms", config.timing.eat_ms);
    println!("  Launch stagger:      {} ms", config.table.launch_stagger_ms);
    println!(
        "  Monitor:             {} samples every {} ms ({:?})",
        config.monitor.max_samples,
        config.monitor.sample_interval_ms,
        config.monitor.stall_detection
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DiningConfig::load_from(path)?,
        None => DiningConfig::load(),
    };
    cli.apply(&mut config);
    config.validate()?;

    let _guard = init_tracing(&config.tracing)?;
    print_configuration(&config);

    let dinner = Dinner::new(config)?;
    let token = dinner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; sending everyone home.");
            token.cancel();
        }
    });

    let report = dinner.run().await;
    info!(verdict = %report.verdict, clean_shutdown = report.clean_shutdown, "dinner over");

    println!();
    println!("{}", report.verdict);
    print!("{}", report.status);
    println!("{}", report.summary);
    println!("  Elapsed:               {:.2?}", report.elapsed);
    if !report.clean_shutdown {
        println!("  Some philosophers did not leave the table in time.");
    }
    Ok(())
}
