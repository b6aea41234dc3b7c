pub mod export;
pub mod metrics;
pub mod serial;

pub use export::{write_csv, ExportError, ExportReceipt, Exporter};
pub use metrics::{init_metrics, serve_metrics};
pub use serial::{list_ports, CommandWriter, SerialConfig, SerialSource};
