//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over `logging.level`. Output is human-readable
//! unless `logging.json` is set.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use unibridge_domain::{LoggingConfig, Result, UnibridgeError};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Install the global tracing subscriber. Later calls are no-ops.
///
/// # Errors
/// Returns `UnibridgeError::Config` for an unparsable filter directive and
/// `UnibridgeError::Internal` if another subscriber was installed first.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    INITIALIZED
        .get_or_try_init(|| {
            let filter = build_filter(&config.level)?;

            let (pretty, json) = if config.json {
                (None, Some(fmt::layer().json().with_target(true).flatten_event(true)))
            } else {
                (Some(fmt::layer().with_target(true)), None)
            };

            tracing_subscriber::registry()
                .with(filter)
                .with(pretty)
                .with(json)
                .try_init()
                .map_err(|e| UnibridgeError::Internal(format!("tracing already installed: {e}")))?;

            tracing::debug!(level = %config.level, json = config.json, "tracing initialised");
            Ok(())
        })
        .map(|_| ())
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(level)
            .map_err(|e| UnibridgeError::Config(format!("invalid log filter '{level}': {e}")))
    })
}
