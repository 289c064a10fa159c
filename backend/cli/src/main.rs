mod console;
mod keys_cmd;
mod run_cmd;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use stepwise_config::{
    apply_all_defaults, config_dir, config_file_path, load_and_prepare, load_config, throttle,
};

#[derive(Parser)]
#[command(name = "stepwise")]
#[command(about = "Step through a running program from the keyboard")]
#[command(version)]
struct Cli {
    /// Config file (default: $STEPWISE_CONFIG_DIR/stepwise.yaml or ~/.stepwise/stepwise.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive stepping session on stdin
    Run {
        /// Numbers to count once started
        #[arg(short = 'n', long, default_value_t = 100)]
        iterations: u64,
        /// Override the leap throttle, in milliseconds
        #[arg(long)]
        throttle_ms: Option<u64>,
    },
    /// Print the effective control key bindings
    Keys {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli
        .config
        .unwrap_or_else(|| config_file_path(&config_dir()));

    // Logging settings come from the file itself, so read it once up front.
    let bootstrap = apply_all_defaults(load_config(&path).await?);
    let log = bootstrap.logging.unwrap_or_default();
    let _guard = logging::init_logger(
        log.dir.as_deref(),
        log.level.as_deref().unwrap_or("info"),
        log.json.unwrap_or(false),
    )?;

    let config = load_and_prepare(&path).await?;

    match cli.command {
        Commands::Run {
            iterations,
            throttle_ms,
        } => {
            let delay = throttle_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| throttle(&config));
            info!(
                config = %path.display(),
                iterations,
                throttle = ?delay,
                "Starting stepwise session"
            );
            run_cmd::run(
                &config,
                run_cmd::RunOptions {
                    iterations,
                    throttle: delay,
                },
            )
            .await?;
        }
        Commands::Keys { json } => keys_cmd::run(&config, json)?,
    }

    Ok(())
}
