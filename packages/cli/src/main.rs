mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{parse, replay, ParseArgs, ReplayArgs};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Trellis CLI - inspect segmented pages and replay recorded sessions
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log engine activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to trellis.config.json in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a markup file and report its segments
    Parse(ParseArgs),

    /// Replay a session transcript against the engine
    Replay(ReplayArgs),
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TRELLIS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = Config::resolve(&cwd, cli.config)?;

    match cli.command {
        Command::Parse(args) => parse(args, &config),
        Command::Replay(args) => replay(args, &config),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
