use clap::Parser;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "parsync", version, about = "Parallel catalog synchronization engine")]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

fn setup_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Validate {
            path,
            allow_disabled,
            output,
        } => cmd::validate::validate_cmd(&path, allow_disabled, output).await,
        Command::Run {
            path,
            items,
            events,
            output,
            platform,
            engine,
        } => cmd::run::run_cmd(&path, &items, events, output, platform, engine).await,
        Command::Strategies { output } => cmd::strategies::strategies_cmd(output),
    }
}
