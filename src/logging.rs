use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter directives.
pub const LOG_ENV: &str = "LEGACY_MIGRATION_LOG";
const DEFAULT_FILTER: &str = "legacy_migration=info,reqwest=warn";

/// Installs JSON logging to stderr with RFC 3339 UTC timestamps and bridges
/// `log` records into tracing. Safe to call more than once.
pub fn init() {
    let _ = tracing_log::LogTracer::init();
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .try_init();
}
