//! Global tracing subscriber for the covagg binary.
//!
//! Command output goes to stdout, so every log line is written to stderr.

use std::io;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. With `json` each event is one
/// JSON object per line. Only the first call in a process has an effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let format = fmt::layer().with_target(false).with_writer(io::stderr);
    let format: Box<dyn Layer<Registry> + Send + Sync> = if json {
        format.json().boxed()
    } else {
        format.boxed()
    };

    tracing_subscriber::registry()
        .with(format)
        .with(filter)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_ignored() {
        init_tracing(false, Level::DEBUG);
        init_tracing(true, Level::INFO);
        tracing::info!(event = "telemetry.test", "subscriber installed");
    }
}
