use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use tablescrub::config::Config;
use tablescrub::transport::UploadFile;
use tablescrub::utils::{default_log_dir, init_logger, LogTarget};
use tablescrub::Session;

#[derive(Parser, Debug)]
#[command(name = "tablescrub", version, about = "Natural-language find & replace for CSV and Excel files")]
struct Cli {
    /// Backend base URL (overrides TABLESCRUB_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Per-request timeout in milliseconds (overrides TABLESCRUB_TIMEOUT_MS)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Directory for processed_data.csv (overrides TABLESCRUB_OUTPUT_DIR)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive terminal UI (default)
    Tui {
        /// File to upload on start
        file: Option<PathBuf>,
    },
    /// Upload, process and download without a UI
    Run {
        #[arg(long)]
        file: PathBuf,

        /// What to find and what to replace it with
        #[arg(long)]
        instruction: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?.with_overrides(cli.api_url, cli.timeout_ms, cli.output_dir);

    match cli.command.unwrap_or(Command::Tui { file: None }) {
        Command::Tui { file } => {
            let _guard = init_logger(LogTarget::File(default_log_dir()))?;
            tablescrub::tui::run(config, file).await
        }
        Command::Run { file, instruction } => {
            init_logger(LogTarget::Stderr)?;
            if let Err(e) = run_batch(&config, file, &instruction).await {
                error!(error = %e, "pipeline failed");
                return Err(e);
            }
            Ok(())
        }
    }
}

async fn run_batch(config: &Config, path: PathBuf, instruction: &str) -> anyhow::Result<()> {
    let mut session = Session::from_config(config)?;

    let file = UploadFile::from_path(&path)
        .await
        .with_context(|| format!("cannot open {}", path.display()))?;

    let dataset = session.upload(file).await?;
    info!(
        rows = dataset.rows().len(),
        columns = dataset.columns().len(),
        "uploaded {}",
        path.display()
    );

    let result = session.process(instruction).await?;
    let stats = result.stats;
    println!("Pattern:     {}", result.regex_pattern);
    println!("Replacement: {}", result.replacement);
    if let Some(model) = &result.model_used {
        println!("Model:       {}", model);
    }
    println!(
        "Rows: {} total, {} matched, {} replaced, {} unmatched",
        stats.total_rows, stats.matched_rows, stats.replaced_count, stats.unmatched_rows
    );

    let saved = session.download(&config.export.output_dir)?;
    println!("Saved {}", saved.display());
    Ok(())
}
