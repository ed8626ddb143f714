use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "POLYCALL_LOG";

const DEFAULT_DIRECTIVES: &str = "warn";

/// Install the global fmt subscriber. Later calls are no-ops, so both hosts
/// and tests may call this freely.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("logging initialised");
    }
}
