mod app;
mod config;
mod logging;
mod session;
mod telemetry;

pub use app::{run, run_from_args};
pub use config::RuntimeConfig;
pub use session::Session;
