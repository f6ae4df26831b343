use tracing::info;
use tracing_subscriber::{prelude::*, util::TryInitError, EnvFilter, Registry};

const DEFAULT_FILTER: &str = "info";

/// Installs the global tracing subscriber.
///
/// Log levels come from `RUST_LOG` and fall back to `info`. Thread names are
/// printed since every worker runs on its own named thread.
pub fn setup_telemetry(service_name: &str) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .try_init()?;

    info!(service = service_name, "Successfully setup telemetry");

    Ok(())
}
