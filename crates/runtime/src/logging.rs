//! Logging setup

use crate::RuntimeError;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install the global tracing subscriber
///
/// `level` is one of `trace`, `debug`, `info`, `warn`, `error`.
pub fn init_logging(level: &str, json: bool) -> Result<(), RuntimeError> {
    let level = Level::from_str(level).map_err(|_| {
        RuntimeError::InvalidConfig(format!("unknown log level '{}'", level))
    })?;

    let result = if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    result.map_err(|e| RuntimeError::Logging(e.to_string()))
}
