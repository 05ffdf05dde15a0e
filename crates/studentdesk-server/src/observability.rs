// Tracing initialization with configurable level and output format.
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

/// Installs the global subscriber. `RUST_LOG` wins over `logging.level`.
///
/// Calling it more than once is harmless; later calls are ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(&config.level));

    let (json_layer, text_layer) = if config.json {
        (Some(fmt::layer().json().with_current_span(true)), None)
    } else {
        (None, Some(fmt::layer()))
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
}
