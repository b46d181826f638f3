mod commands;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use vectormem::{Config, Error, Memory, OnnxEmbedder};

use commands::Commands;

/// vectormem - local similarity-search memory for text
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Memory file to use instead of the configured one
    #[arg(long, global = true)]
    memory_file: Option<PathBuf>,

    /// Config file (default: <config_dir>/vectormem/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store bare fragments and embed everything at search time
    #[arg(long, global = true)]
    embed_at_search: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            if cli.json {
                output::print_json(&output::ErrorResponse {
                    error: e.to_string(),
                });
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config, Error> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(path) = &cli.memory_file {
        config.memory_file = path.clone();
    }
    if cli.embed_at_search {
        config.embed_at_search = true;
    }
    Ok(config)
}

fn run(cli: &Cli) -> Result<ExitCode, Error> {
    if let Commands::Version = cli.command {
        return commands::handle_version(cli.json);
    }

    let config = load_config(cli)?;
    config.ensure_directories()?;
    debug!(
        memory_file = %config.memory_file.display(),
        model = %config.embedding_model,
        chunking = %config.chunking_mode,
        "Loaded configuration"
    );

    let embedder = OnnxEmbedder::new(&config.embedding_model)?;
    let mut memory = Memory::new(config.memory_options()?, embedder)?;

    commands::execute(&cli.command, &mut memory, cli.json)
}
