use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize logging for the `sp500` CLI; `RUST_LOG` overrides the default filter
pub fn init_logger() -> anyhow::Result<()> {
    let format_layer = fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sp500=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(format_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;

    Ok(())
}

/// Prefixes every message with a component tag such as `DATASET`
#[derive(Debug, Clone)]
pub struct Logger {
    context: &'static str,
}

impl Logger {
    pub fn new(context: &'static str) -> Self {
        Self { context }
    }

    pub fn info(&self, message: &str) {
        info!("{}: {}", self.context, message);
    }

    pub fn debug(&self, message: &str) {
        debug!("{}: {}", self.context, message);
    }
}

/// CSV loading and imputation
pub fn log_dataset(message: &str) {
    info!("DATASET: {}", message);
}

/// Price feed requests
pub fn log_market_data(message: &str) {
    info!("MARKET_DATA: {}", message);
}

/// Wall-clock timing for a named step
pub struct Timer {
    start: std::time::Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        Self {
            start: std::time::Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn log_elapsed(&self, context: &str) {
        info!("{}: {} completed in {}", context, self.name, super::format_duration(self.elapsed_ms()));
    }
}
