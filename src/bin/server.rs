//! Tradenomix API server.
//! Run with: cargo run --bin tradenomix-server

use std::process::ExitCode;

use tradenomix::start_tradenomix;

fn main() -> ExitCode {
    start_tradenomix::run()
}
