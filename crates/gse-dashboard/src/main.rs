mod console;
mod infra;
mod readout;
mod runtime;

use std::process::ExitCode;

fn main() -> ExitCode {
    runtime::run_from_args()
}
