//! Contains subcommands for the ethscope cache CLI.

mod block;
pub use block::BlockCommand;

mod clear;
pub use clear::ClearCommand;

mod errors;
pub use errors::ErrorsCommand;

mod export;
pub use export::{ExportCommand, FormatArg};

mod import;
pub use import::ImportCommand;

mod prune;
pub use prune::PruneCommand;

mod range;
pub use range::RangeCommand;

mod stats;
pub use stats::StatsCommand;

/// Prints `value` as pretty JSON on stdout.
fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
