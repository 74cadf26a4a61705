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


use std::io;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::common::TracingConfig;

/// File name used inside [`TracingConfig::log_directory`].
pub const LOG_FILE_NAME: &str = "acton-dining.log";

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over [`TracingConfig::level`]. With a log directory set,
/// output goes to stdout and to a non-rotating file in that directory; keep
/// the returned guard alive until exit so buffered lines reach the file.
///
/// # Errors
///
/// Fails if the filter does not parse, the log directory cannot be created,
/// or a global subscriber is already installed.
pub fn init_tracing(config: &TracingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("invalid log level `{}`", config.level))?,
    };

    match &config.log_directory {
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .compact()
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("tracing subscriber already installed")?;
            Ok(None)
        }
        Some(directory) => {
            std::fs::create_dir_all(directory)
                .with_context(|| format!("could not create log directory `{directory}`"))?;
            let file_appender = RollingFileAppender::new(Rotation::NEVER, directory, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(io::stdout.and(non_blocking))
                .with_ansi(false)
                .compact()
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("tracing subscriber already installed")?;
            Ok(Some(guard))
        }
    }
}
