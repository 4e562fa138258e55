//! Klartext command-line interface.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use klartext::{
    BatchItem, CancelFlag, ExportFormat, OcrPipeline, PipelineConfig, ProviderCredentials,
    ProviderId, ProviderRegistry, run_batch, supported_languages,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "klartext", version, about = "Extract text and structure from document images")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Pipeline configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract text from a single image
    Extract {
        /// Input image file
        file: PathBuf,

        /// Output format: txt, json, csv, or html
        #[arg(short, long, default_value = "txt")]
        format: ExportFormatArg,

        /// Write the result to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Language hint (ISO 639-1 code, or "auto")
        #[arg(short, long)]
        language: Option<String>,

        /// Pin a specific provider as the first attempt
        #[arg(short, long)]
        provider: Option<String>,

        /// Disable table detection
        #[arg(long)]
        no_tables: bool,
    },

    /// Extract text from multiple images with bounded concurrency
    Batch {
        /// Input image files
        files: Vec<PathBuf>,

        /// Directory for per-file results
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output format: txt, json, csv, or html
        #[arg(short, long, default_value = "json")]
        format: ExportFormatArg,

        /// Language hint (ISO 639-1 code, or "auto")
        #[arg(short, long)]
        language: Option<String>,
    },

    /// List recognition providers and their availability
    Providers,

    /// List supported extraction languages
    Languages,
}

#[derive(Clone, Copy)]
struct ExportFormatArg(ExportFormat);

impl std::str::FromStr for ExportFormatArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<ExportFormat>().map(ExportFormatArg)
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "klartext=warn",
        1 => "klartext=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("bmp") => "image/bmp",
        Some("pdf") => "application/pdf",
        _ => "image/png",
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("extraction")
        .to_string()
}

async fn cmd_extract(
    registry: &ProviderRegistry,
    mut config: PipelineConfig,
    file: &Path,
    format: ExportFormat,
    output: Option<&Path>,
    language: Option<String>,
    provider: Option<String>,
    no_tables: bool,
) -> Result<()> {
    if let Some(language) = language {
        config.language_hint = language;
    }
    if let Some(provider) = provider {
        let id: ProviderId = provider
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        config.provider = Some(id);
    }
    if no_tables {
        config.enable_table_detection = false;
    }

    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let pipeline = OcrPipeline::new(registry, config)?;
    let result = pipeline.process(&bytes, guess_mime(file)).await?;

    let payload = klartext::download(&result, format, &stem_of(file))?;
    match output {
        Some(path) => {
            tokio::fs::write(path, &payload.body)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "Wrote {} ({} blocks, {} tables, {:.1}% confidence)",
                path.display(),
                result.blocks.len(),
                result.tables.len(),
                result.confidence * 100.0
            );
        }
        None => {
            let text = String::from_utf8(payload.body).context("rendered output was not UTF-8")?;
            println!("{text}");
        }
    }
    Ok(())
}

async fn cmd_batch(
    registry: Arc<ProviderRegistry>,
    mut config: PipelineConfig,
    files: &[PathBuf],
    output_dir: Option<&Path>,
    format: ExportFormat,
    language: Option<String>,
) -> Result<()> {
    if files.is_empty() {
        bail!("no input files given");
    }
    if let Some(language) = language {
        config.language_hint = language;
    }

    let mut items = Vec::with_capacity(files.len());
    for file in files {
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("failed to read {}", file.display()))?;
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("input")
            .to_string();
        items.push(BatchItem::new(name, guess_mime(file), bytes));
    }

    let output = run_batch(registry, config, items, CancelFlag::new()).await?;
    eprintln!(
        "Processed {} file(s), {} error(s)",
        output.total_processed, output.total_errors
    );
    for error in &output.errors {
        eprintln!("  {}: {} ({})", error.file_name, error.message, error.kind);
    }

    match output_dir {
        Some(dir) => {
            tokio::fs::create_dir_all(dir).await?;
            // Results keep submission order with errored files removed.
            let failed: Vec<&str> = output.errors.iter().map(|e| e.file_name.as_str()).collect();
            let succeeded = files.iter().filter(|f| {
                let name = f.file_name().and_then(|n| n.to_str()).unwrap_or("input");
                !failed.contains(&name)
            });
            for (result, file) in output.results.iter().zip(succeeded) {
                let stem = stem_of(file);
                let body = klartext::render(result, format)?;
                let path = dir.join(format!("{stem}.{}", format.extension()));
                tokio::fs::write(&path, &body).await?;
                eprintln!("  wrote {}", path.display());
            }
        }
        None => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn cmd_providers(registry: &ProviderRegistry) {
    for info in registry.capabilities() {
        let status = if info.available { "available" } else { "not configured" };
        println!("{:<20} {:<16} {}", info.name, status, info.description);
    }
}

fn cmd_languages() {
    for lang in supported_languages() {
        println!("{:<6} {}", lang.code, lang.name);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let registry = Arc::new(ProviderRegistry::new(&ProviderCredentials::from_env()));
    tracing::debug!(
        providers = registry.capabilities().len(),
        "registry initialized"
    );

    match cli.command {
        Command::Extract {
            file,
            format,
            output,
            language,
            provider,
            no_tables,
        } => {
            cmd_extract(
                &registry,
                config,
                &file,
                format.0,
                output.as_deref(),
                language,
                provider,
                no_tables,
            )
            .await
        }
        Command::Batch {
            files,
            output_dir,
            format,
            language,
        } => {
            cmd_batch(
                registry,
                config,
                &files,
                output_dir.as_deref(),
                format.0,
                language,
            )
            .await
        }
        Command::Providers => {
            cmd_providers(&registry);
            Ok(())
        }
        Command::Languages => {
            cmd_languages();
            Ok(())
        }
    }
}
