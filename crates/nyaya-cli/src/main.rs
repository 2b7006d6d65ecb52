//! `nyaya`: analyze Indian legal documents from the command line or over HTTP.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use nyaya_core::{AnalysisReport, DocumentInfo};
use nyaya_runtime::providers::ProviderRegistry;
use nyaya_runtime::{AnalysisPipeline, RuntimeConfig, Services};

mod server;

#[derive(Parser, Debug)]
#[command(name = "nyaya", version, about = "Explain Indian legal documents in plain language")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(long, default_value_t = 8000)]
        port: u16,
    },

    /// Analyze a document (text or PDF; `-` reads text from stdin)
    Analyze {
        input: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Ask a question about an analyzed document
    Ask {
        /// JSON file holding a document_info or a full report
        #[arg(long, value_name = "FILE")]
        document: PathBuf,

        #[arg(long)]
        question: String,

        #[arg(long, default_value = "en")]
        language: String,
    },

    /// Translate text between English, Hindi and Telugu
    Translate {
        text: String,

        #[arg(long)]
        to: String,

        #[arg(long)]
        from: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Yaml,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = RuntimeConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let pipeline = AnalysisPipeline::from_config(&config, &ProviderRegistry::with_defaults())
        .context("Failed to configure completion provider")?;
    let services = Services::from_config(&config.services);

    match cli.command {
        Command::Serve { host, port } => {
            server::run(&host, port, Arc::new(pipeline), Arc::new(services)).await
        }
        Command::Analyze { input, format } => {
            let text = read_input(&input, &services).await?;
            let report = pipeline.analyze(&text).await;
            print_report(&report, format)
        }
        Command::Ask {
            document,
            question,
            language,
        } => {
            let doc = load_document(&document)?;
            let answer = pipeline.ask(&question, &doc, &language).await;
            if let Some(error) = &answer.error {
                tracing::warn!(error = %error, "Question answering failed");
            }
            println!("{}", answer.answer);
            Ok(())
        }
        Command::Translate { text, to, from } => {
            let translated = pipeline
                .translate(&text, &to, from.as_deref())
                .await
                .context("Translation failed")?;
            println!("{}", translated);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_input(input: &str, services: &Services) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read document from stdin")?;
        return Ok(text);
    }

    let path = Path::new(input);
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        services
            .pdf
            .extract_text(&bytes)
            .await
            .with_context(|| format!("Failed to extract text from {}", path.display()))
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

fn print_report(report: &AnalysisReport, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Yaml => serde_yaml::to_string(report)?,
    };
    println!("{}", rendered);
    Ok(())
}

fn load_document(path: &Path) -> Result<DocumentInfo> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_document(&text).with_context(|| format!("Invalid document in {}", path.display()))
}

/// Accept either a bare document_info or a report wrapping one.
fn parse_document(text: &str) -> Result<DocumentInfo> {
    let mut value: serde_json::Value = serde_json::from_str(text)?;
    if !value.is_object() {
        bail!("expected a JSON object");
    }
    if let Some(inner) = value.get_mut("document_info") {
        value = inner.take();
    }
    Ok(serde_json::from_value(value)?)
}
