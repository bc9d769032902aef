mod cli;
mod commands;
mod logging;

use cli::{Cli, Commands};
use commands::{inspect, run};

pub fn main_inner() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match &cli.command {
        Commands::Run(args) => run::run(&cli, args),
        Commands::Inspect(args) => inspect::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { main_inner() }
