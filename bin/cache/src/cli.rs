//! Contains the cache CLI.

use crate::{
    commands::{
        BlockCommand, ClearCommand, ErrorsCommand, ExportCommand, ImportCommand, PruneCommand,
        RangeCommand, StatsCommand,
    },
    flags::GlobalArgs,
    telemetry,
};
use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

/// Subcommands for the CLI.
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Summarizes the cache contents.
    Stats(StatsCommand),
    /// Prints one cached block.
    Block(BlockCommand),
    /// Lists cached, or missing, blocks in a range.
    Range(RangeCommand),
    /// Inspects or clears the fetch-failure ledger.
    Errors(ErrorsCommand),
    /// Writes every cached block to a file.
    Export(ExportCommand),
    /// Loads blocks from an export file.
    Import(ImportCommand),
    /// Empties the cache.
    Clear(ClearCommand),
    /// Deletes blocks older than a cutoff.
    Prune(PruneCommand),
}

/// The ethscope block cache CLI.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (0-3)
    #[arg(long, short, global = true, action = ArgAction::Count)]
    pub v: u8,
    /// Global arguments for the CLI.
    #[clap(flatten)]
    pub global: GlobalArgs,
    /// The subcommand to run.
    #[clap(subcommand)]
    pub subcommand: Commands,
}

impl Cli {
    /// Runs the CLI.
    pub async fn run(self) -> Result<()> {
        telemetry::init_tracing_subscriber(self.v)?;

        let cache = self.global.open_cache().await?;
        match self.subcommand {
            Commands::Stats(stats) => stats.run(&cache).await,
            Commands::Block(block) => block.run(&cache).await,
            Commands::Range(range) => range.run(&cache).await,
            Commands::Errors(errors) => errors.run(&cache).await,
            Commands::Export(export) => export.run(&cache).await,
            Commands::Import(import) => import.run(&cache).await,
            Commands::Clear(clear) => clear.run(&cache).await,
            Commands::Prune(prune) => prune.run(&cache).await,
        }
    }
}
