use clap::{Parser, Subcommand};

use self::{train::TrainArg, versus::VersusArg};

mod train;
mod versus;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Evolve evaluation weights with the genetic algorithm
    Train(#[clap(flatten)] TrainArg),
    /// Play two trained models against each other
    Versus(#[clap(flatten)] VersusArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::Versus(arg) => versus::run(&arg)?,
    }
    Ok(())
}
