mod cli;
mod clock;
mod config;
mod engine;
mod harvest;
mod logging;
mod model;
mod policy;
mod storage;
mod sync;

use std::process;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
