mod cli;
mod runner;

use anyhow::Result;
use clap::Parser;

use cli::Args;

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    runner::run(&args)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}
