// Copyright 2023 The Skene Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::Args;
use tracing::subscriber::set_global_default;
use tracing::{error, Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use super::error::{Error, Result};

/// Logging options, meant to be `#[clap(flatten)]`-ed into a binary's parser.
#[derive(Args, Clone, Debug)]
pub struct LogArgs {
    /// Sets the logging level (trace, debug, info, warning, error)
    #[clap(long, env = "LOG_LEVEL", default_value = "warning")]
    pub log_level: String,
}

/// Parses a level name into a tracing level.
///
/// Accepts `warning` as an alias for `warn`, and maps `fatal` and `panic`
/// down to `error`, the most severe level tracing knows.
pub fn parse_level(value: &str) -> Option<Level> {
    match value.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" | "fatal" | "panic" => Some(Level::ERROR),
        _ => None,
    }
}

/// Builds the subscriber without installing it, so callers and tests decide
/// where it lives (`set_global_default`, `with_default`, ...).
///
/// Events are written to `writer` with full timestamps and the emitting
/// file and line number.
pub fn subscriber<W>(level: Level, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_file(true)
        .with_line_number(true)
        .with_writer(writer)
        .finish()
}

/// Builds the subscriber from `args` and installs it as the global default.
///
/// An unparseable level degrades to `warning` and logs an error once the
/// subscriber is in place, so a bad flag value never aborts startup.
pub fn init<W>(args: &LogArgs, writer: W) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let level = parse_level(&args.log_level);
    set_global_default(subscriber(level.unwrap_or(Level::WARN), writer))
        .map_err(Error::SetGlobalDefault)?;

    if level.is_none() {
        error!("invalid log level {:?}, setting to be warning", args.log_level);
    }

    Ok(())
}

// hyper and tower stay silent unless the whole process runs at trace.
fn env_filter(level: Level) -> EnvFilter {
    if level < Level::TRACE {
        EnvFilter::new(format!("{},hyper=off,tower=off", level))
    } else {
        EnvFilter::new(level.to_string())
    }
}
