//! Test logging utilities shared by unit and integration tests

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

static INIT: Once = Once::new();
static DEBUG_INIT: Once = Once::new();

/// Initialize test logging with info level (called once per test run)
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = init_test_subscriber("info");
    });
}

/// Initialize test logging with debug level (called once per test run)
pub fn init_debug_logging() {
    DEBUG_INIT.call_once(|| {
        let _ = init_test_subscriber("debug");
    });
}

fn init_test_subscriber(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_test_writer();
    tracing::subscriber::set_global_default(Registry::default().with(env_filter).with(fmt_layer))?;

    Ok(())
}
