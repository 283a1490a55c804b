use clap::Parser;

use telemetry_lens::app::{self, Cli};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    app::run(Cli::parse())
}
