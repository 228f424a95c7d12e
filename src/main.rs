use anyhow::Result;
use clap::{Parser, Subcommand};

use bucket_backup::backup::CycleOutcome;
use bucket_backup::cli::{
    handle_check, handle_config, handle_init, handle_once, handle_run, ConfigOverrides,
};
use bucket_backup::config::BackupPaths;
use bucket_backup::logging;

#[derive(Parser)]
#[command(
    name = "bucket-backup",
    author = "Kaylee Beyene",
    version,
    about = "Periodic deduplicated backups of a directory to object storage",
    long_about = "bucket-backup archives a local directory on a fixed interval and \
                  uploads the archive to a bucket, skipping the upload when one of \
                  the most recent backups already holds the same content."
)]
struct Cli {
    #[command(flatten)]
    overrides: ConfigOverrides,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = logging::DEFAULT_LEVEL)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and create the bucket
    Init,

    /// Show the effective configuration
    Config,

    /// Validate the configuration and exit
    Check,

    /// Run a single backup cycle and print the event log
    Once {
        /// Print events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Back up on a fixed interval until stopped
    Run,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let paths = BackupPaths::new()?;
    let overrides = &cli.overrides;

    match cli.command {
        Commands::Init => handle_init(&paths, overrides)?,
        Commands::Config => handle_config(&paths, overrides)?,
        Commands::Check => handle_check(&paths, overrides)?,
        Commands::Once { json } => {
            if let CycleOutcome::Failed { stage, reason } = handle_once(&paths, overrides, json)? {
                anyhow::bail!("backup cycle failed at {} stage: {}", stage, reason);
            }
        }
        Commands::Run => handle_run(&paths, overrides)?,
    }

    Ok(())
}
