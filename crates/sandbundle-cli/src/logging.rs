//! Logging initialization for the CLI.
//!
//! Logging is owned by the CLI crate; the core library only emits `tracing`
//! events. Logs always go to stderr so stdout stays reserved for bundle code
//! and JSON results.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber.
///
/// # Arguments
/// * `verbosity` - 0 = WARN, 1 = DEBUG, 2+ = TRACE
/// * `json` - If true, output JSON lines to stderr
pub fn init(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // RUST_LOG wins for everything the verbosity flag does not cover
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"))
        .add_directive(directive("sandbundle", level))
        .add_directive(directive("sandbundle_core", level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let result = if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    if let Err(err) = result {
        eprintln!("warning: logging already initialized: {err}");
    }
}

fn directive(target: &str, level: Level) -> tracing_subscriber::filter::Directive {
    // `target=level` with a known level always parses.
    format!("{target}={level}")
        .parse()
        .unwrap_or_else(|_| level.into())
}
