//! malt-brew - content upload ingestion
//!
//! Reads one file from disk, runs it through the brewery as a single upload
//! and prints the URL the content unit lives at. On failure the numbered
//! history and the final message are printed instead.

use anyhow::{Context, Result};
use clap::Parser;
use malt_brew::upload::{DATE_KEY, VIEW_NAME_KEY};
use malt_brew::{
    default_enzymes, yeasts, BrewError, Brewery, LocalStorage, MemoryStorage, RequestMeta,
    Storage, UploadedFile, Yeasts,
};
use malt_common::config::{LoggingConfig, RootFolderInitializer, RootFolderResolver, TomlConfig};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for malt-brew
#[derive(Parser, Debug)]
#[command(name = "malt-brew")]
#[command(about = "Ingest one content upload")]
#[command(version)]
struct Args {
    /// File to upload (text content unit, zip or tar archive)
    file: PathBuf,

    /// Form field name to send the file under (defaults to the configured name)
    #[arg(long)]
    field: Option<String>,

    /// Creation timestamp in milliseconds since the epoch (defaults to now)
    #[arg(long)]
    date: Option<String>,

    /// Content type to re-edit when the upload has no content unit
    #[arg(long)]
    view_name: Option<String>,

    /// Extra request metadata
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    meta: Vec<(String, String)>,

    /// Root folder for stored content
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Config file (defaults to <config_dir>/malt/malt.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep stored content in memory only
    #[arg(long)]
    dry_run: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

fn build_meta(args: &Args) -> RequestMeta {
    let mut meta: RequestMeta = args.meta.iter().cloned().collect();
    let date = args
        .date
        .clone()
        .unwrap_or_else(|| malt_common::time::now_millis().to_string());
    meta.insert(DATE_KEY.to_string(), date);
    if let Some(view_name) = &args.view_name {
        meta.insert(VIEW_NAME_KEY.to_string(), view_name.clone());
    }
    meta
}

fn print_failure(error: &BrewError, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(error)?);
        return Ok(());
    }
    for (i, entry) in error.history.iter().enumerate() {
        eprintln!("{:>3}. {}", i + 1, entry);
    }
    eprintln!("error: {}", error.message);
    Ok(())
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    info!(
        "Starting malt-brew v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let brewing = &config.brewing;
    let storage: Arc<dyn Storage> = if args.dry_run {
        info!("Dry run: stored content is discarded");
        Arc::new(MemoryStorage::new(brewing.base_url.clone()))
    } else {
        let root_folder = RootFolderResolver::new(args.root_folder.clone(), &config).resolve();
        let initializer = RootFolderInitializer::new(root_folder);
        initializer
            .ensure_directory_exists()
            .context("Failed to initialize root folder")?;
        let location = initializer.root_folder().join("media");
        info!("Storing content in {}", location.display());
        let media_url = format!("{}/media", brewing.base_url.trim_end_matches('/'));
        Arc::new(LocalStorage::new(location, media_url))
    };

    let mut registry = Yeasts::new();
    yeasts::register_defaults(&mut registry, storage, &brewing.base_url);
    let brewery = Brewery::new(default_enzymes(brewing.max_archive_size), registry)
        .with_field_name(brewing.field_name.clone());

    let field = args.field.clone().unwrap_or_else(|| brewing.field_name.clone());
    let upload = UploadedFile::from_path(&args.file, &field, brewing.max_upload_size)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    match brewery.brew(vec![upload], build_meta(&args)) {
        Ok(url) => {
            if args.json {
                println!("{}", serde_json::json!({ "url": url }));
            } else {
                println!("{}", url);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            print_failure(&error, args.json)?;
            Ok(ExitCode::FAILURE)
        }
    }
}
