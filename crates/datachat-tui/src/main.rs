use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use datachat_core::config::{AppConfig, Secrets, SecretsJsonRepository};
use datachat_core::dataset::{Dataset, FilteredDataset, RowFilter};
use datachat_core::services::{AssistantService, OpenAiAssistantClient};
use datachat_core::PageController;
use tracing::info;

mod app;
mod terminal_surface;
mod ui;

/// Ask natural-language questions about a tabular dataset
#[derive(Parser, Debug)]
#[command(name = "datachat", version, about)]
struct Args {
    /// CSV or spreadsheet file to analyze
    data: PathBuf,

    /// Only keep rows where COLUMN equals VALUE (repeatable)
    #[arg(long = "where", value_name = "COLUMN=VALUE")]
    filters: Vec<RowFilter>,

    /// Secrets file, defaults to <config dir>/datachat/secrets.json
    #[arg(long)]
    secrets: Option<PathBuf>,

    /// Assistants API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    api_base: Option<String>,

    /// Directory generated charts are saved to
    #[arg(long)]
    image_dir: Option<PathBuf>,
}

fn init_logging(config: &AppConfig) -> Result<()> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory {}", config.log_dir.display()))?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_dir.join("datachat.log"))
        .context("Failed to open log file")?;

    // Logs go to a file: stdout belongs to the alternate screen
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::default()
        .with_api_base(args.api_base.clone())
        .with_image_dir(args.image_dir.clone());
    init_logging(&config)?;
    info!(data = %args.data.display(), filters = args.filters.len(), "Starting datachat");

    let repo = match &args.secrets {
        Some(path) => Ok(SecretsJsonRepository::at(path)),
        None => SecretsJsonRepository::new(),
    };
    let secrets = Secrets::load(repo, |key| std::env::var(key).ok()).await;

    let dataset = Dataset::load(&args.data)
        .with_context(|| format!("Failed to load dataset {}", args.data.display()))?;
    let filtered = FilteredDataset::new(dataset, args.filters);
    let visible_rows = filtered.current().context("Invalid --where filter")?.len();

    let page = PageController::bootstrap(
        secrets,
        filtered,
        &config,
        |secrets| {
            let client = OpenAiAssistantClient::from_config(secrets, &config)?;
            Ok(Arc::new(client) as Arc<dyn AssistantService>)
        },
    )?;

    let title = format!(
        "{} · {} rows",
        args.data
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        visible_rows
    );
    app::run(page, config, title).await
}
