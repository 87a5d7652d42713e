//! Diagnostic logging for the command-line host.
//!
//! The library only emits `tracing` events under the `gparse::lexer`,
//! `gparse::parser` and `gparse::evaluator` targets; installing a subscriber
//! is left to the binary.

use std::io;
use tracing::Level;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, with targets and timestamps.
    Pretty,
    Compact,
}

/// Parses a `--log` argument (`error`, `warn`, `info`, `debug`, `trace`).
pub fn parse_level(text: &str) -> Option<Level> {
    text.parse::<Level>().ok()
}

/// Installs a stderr subscriber. `RUST_LOG`, when set, overrides `level`.
/// Does nothing if a global subscriber is already installed.
pub fn init(level: Level, format: LogFormat) {
    let layer = match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .without_time()
            .with_writer(io::stderr)
            .boxed(),
    };

    let result = match EnvFilter::try_from_default_env() {
        Ok(env_filter) => tracing_subscriber::registry()
            .with(layer.with_filter(env_filter))
            .try_init(),
        Err(_) => {
            let targets = Targets::new()
                .with_target("gparse::lexer", level)
                .with_target("gparse::parser", level)
                .with_target("gparse::evaluator", level)
                .with_default(Level::WARN);
            tracing_subscriber::registry()
                .with(layer.with_filter(targets))
                .try_init()
        }
    };

    if let Err(error) = result {
        eprintln!("logging already initialized: {}", error);
    }
}
