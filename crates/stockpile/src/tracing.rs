// Tracing setup for binaries and services embedding the ledgers

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

//-----------------------------------------------------------------------------
// Tracing Initialization
//-----------------------------------------------------------------------------

/// Install the global tracing subscriber.
///
/// `log_level` accepts any `EnvFilter` directive such as `"info"` or
/// `"stockpile_migration=debug,info"`; `RUST_LOG` takes precedence when set.
/// Installing a second subscriber returns an error.
pub fn init_tracing(log_level: &str, json_output: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .with_context(|| format!("invalid log level directive {:?}", log_level))?;

    let subscriber = Registry::default().with(env_filter);

    if json_output {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true);
        tracing::subscriber::set_global_default(subscriber.with(json_layer))
            .context("a global tracing subscriber is already installed")?;
    } else {
        let fmt_layer = fmt::layer().pretty().with_target(true).with_level(true);
        tracing::subscriber::set_global_default(subscriber.with(fmt_layer))
            .context("a global tracing subscriber is already installed")?;
    }

    Ok(())
}
