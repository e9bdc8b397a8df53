mod export;
mod upload;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use shopdoc_core::{AppConfig, OutputShape};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "shopdoc")]
#[command(about = "Export a Shopify product catalog to a ;-delimited document file")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Page through the catalog with cursor pagination and write the export file
    Export(ExportArgs),
    /// Export through a server-side bulk operation and write the export file
    BulkExport(OutputArgs),
    /// Re-upload an export file to the document store in batches
    Upload(UploadArgs),
}

#[derive(Debug, Clone, Default, Args)]
struct OutputArgs {
    /// Destination CSV path (overrides SHOPDOC_OUTPUT_PATH)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Column layout: `columns` or `content` (overrides SHOPDOC_OUTPUT_SHAPE)
    #[arg(long)]
    shape: Option<OutputShape>,
}

#[derive(Debug, Clone, Default, Args)]
struct ExportArgs {
    /// Products per page (overrides SHOPDOC_PAGE_SIZE)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=250))]
    page_size: Option<u32>,
    /// Resume after this cursor (overrides SHOPDOC_START_CURSOR)
    #[arg(long)]
    after: Option<String>,
    /// On a fetch failure, write the rows collected so far (still exits non-zero)
    #[arg(long)]
    partial: bool,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Clone, Default, Args)]
struct UploadArgs {
    /// CSV file to upload (defaults to the configured output path)
    #[arg(long)]
    file: Option<PathBuf>,
    /// Data rows per batch (overrides SHOPDOC_UPLOAD_BATCH_SIZE)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    batch_size: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = shopdoc_core::load_app_config_from_env()?;
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Export(args) => {
            apply_export_overrides(&mut config, &args);
            export::run_export(&config, args.partial).await
        }
        Commands::BulkExport(args) => {
            apply_output_overrides(&mut config, &args);
            export::run_bulk_export(&config).await
        }
        Commands::Upload(args) => upload::run_upload(&config, &args).await,
    }
}

/// `RUST_LOG` wins; otherwise the configured level is used.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn apply_output_overrides(config: &mut AppConfig, args: &OutputArgs) {
    if let Some(path) = &args.output {
        config.output_path.clone_from(path);
    }
    if let Some(shape) = args.shape {
        config.output_shape = shape;
    }
}

fn apply_export_overrides(config: &mut AppConfig, args: &ExportArgs) {
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    if let Some(after) = args.after.as_deref().filter(|a| !a.trim().is_empty()) {
        config.start_cursor = Some(after.to_owned());
    }
    apply_output_overrides(config, &args.output);
}
