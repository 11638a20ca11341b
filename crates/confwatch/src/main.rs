//! ConfWatch - snapshots, diffs and rollback for configuration files.
//!
//! This is the main entry point for the confwatch CLI.

mod commands;

use clap::{Parser, Subcommand};
use confwatch_core::{Config, Engine};
use confwatch_util::log::{self, LogConfig, LogLevel};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "confwatch")]
#[command(author, version, about = "Track, diff and roll back configuration files", long_about = None)]
struct Cli {
    /// Configuration file (default: <config_dir>/confwatch/config.yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Append logs to this file as well as stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to bind to (default: server.host:server.port from config)
        #[arg(short, long)]
        address: Option<String>,
        /// Do not run the file watcher alongside the server
        #[arg(long)]
        no_watch: bool,
    },
    /// Watch configured files and snapshot every change until Ctrl-C
    Watch,
    /// List watched files
    List,
    /// Record a snapshot of watched files
    Snapshot {
        /// Files to snapshot (default: every watched file)
        files: Vec<String>,
        /// Comment stored with the snapshot
        #[arg(short = 'm', long)]
        comment: Option<String>,
        /// Record even when the content is unchanged
        #[arg(long)]
        force: bool,
    },
    /// Show the snapshot history of a file
    History {
        /// Watched file (name or path)
        file: String,
    },
    /// Show differences for a file
    ///
    /// Without --from/--to the working copy is compared to the latest snapshot.
    Diff {
        /// Watched file (name or path)
        file: String,
        /// Older snapshot hash or prefix
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Newer snapshot hash or prefix
        #[arg(long, requires = "from")]
        to: Option<String>,
    },
    /// Restore a file to an earlier snapshot
    Rollback {
        /// Watched file (name or path)
        file: String,
        /// Tag name, snapshot hash or unique hash prefix
        hash: String,
    },
    /// Name the latest snapshot of a file
    Tag {
        /// Watched file (name or path)
        file: String,
        /// Tag name; usable wherever a snapshot hash is accepted
        name: String,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        print_version();
        return Ok(());
    }

    let (config, source) = Config::load(cli.config.as_deref()).await?;
    init_logging(&cli, &config);
    if let Some(source) = &source {
        tracing::debug!(config = %source.display(), "Using configuration file");
    }

    let engine = Engine::open(config).await?;

    match cli.command {
        Commands::Serve { address, no_watch } => {
            commands::run_server(engine, address, !no_watch).await
        }
        Commands::Watch => commands::run_watch(engine).await,
        Commands::List => commands::handle_list(&engine).await,
        Commands::Snapshot {
            files,
            comment,
            force,
        } => commands::handle_snapshot(&engine, &files, comment.as_deref(), force).await,
        Commands::History { file } => commands::handle_history(&engine, &file).await,
        Commands::Diff { file, from, to } => {
            commands::handle_diff(&engine, &file, from.zip(to)).await
        }
        Commands::Rollback { file, hash } => commands::handle_rollback(&engine, &file, &hash).await,
        Commands::Tag { file, name } => commands::handle_tag(&engine, &file, &name).await,
        Commands::Version => Ok(()),
    }
}

/// Initialize logging based on verbosity and command.
///
/// Long-running commands also append to the default log file unless one is
/// named explicitly.
fn init_logging(cli: &Cli, config: &Config) {
    let long_running = matches!(cli.command, Commands::Serve { .. } | Commands::Watch);
    let file = cli
        .log_file
        .clone()
        .or_else(|| long_running.then(log::default_log_path).flatten());

    log::init(LogConfig {
        print: true,
        level: if cli.verbose {
            LogLevel::Debug
        } else {
            config.log_level
        },
        include_location: cli.verbose,
        file,
    });
}

fn print_version() {
    println!("confwatch {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Snapshots, diffs and rollback for configuration files.");
}
