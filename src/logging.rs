use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "TOGETHER_LOG";
pub const DEFAULT_FILTER: &str = "together=info,sqlx=warn";

fn filter() -> EnvFilter {
    let directives = std::env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_FILTER.into());
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the JSON subscriber on stderr and bridges `log` records into it.
/// Calling it again is harmless.
pub fn init() {
    let _ = tracing_log::LogTracer::init();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .json()
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .try_init();
}
