use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,gse_dashboard=debug,gse_core=debug,gse_io=debug";

/// Install the global subscriber: pretty for an operator terminal, JSON for
/// log shipping. `log` records from gse-core are bridged into it.
pub fn init_tracing(json_output: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    // Acquisition, readout and console run on named threads.
    let layer = fmt::layer().with_thread_names(true);

    let installed = if json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.pretty())
            .try_init()
    };
    if let Err(err) = installed {
        eprintln!("gse-dashboard: logging not initialised: {err}");
    }
}
