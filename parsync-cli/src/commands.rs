use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse and validate a sync config (JSON or YAML)
    Validate {
        path: PathBuf,
        /// Accept a config with `enabled: false` as long as every other rule holds
        #[arg(long)]
        allow_disabled: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run a sync over a JSON Lines file of pending items
    Run {
        path: PathBuf,
        #[arg(long)]
        items: PathBuf,
        #[arg(long, value_enum, default_value_t = EventsMode::None)]
        events: EventsMode,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        platform: PlatformArgs,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// List the pool sizing strategies
    Strategies {
        #[command(flatten)]
        output: OutputArgs,
    },
}
