//! CLI binary for rxverify.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `VerifierConfig`, reads the uploads from disk and prints the verdict as
//! JSON.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rxverify::{
    parse_desired_items, Strategy, UploadedDocument, Verifier, VerifierConfig, VerifyError,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Check one scanned prescription
  rxverify --items '[{"name":"Amoxicillin","quantity":"1"}]' scan.jpg

  # Several pages uploaded as separate files, items from a file
  rxverify --items-file order.json page1.png page2.pdf

  # Over-the-counter order with no prescription attached
  rxverify --items '[{"name":"Vitamin C"}]'

  # Tolerate OCR noise and brand names with an LLM judge
  rxverify --strategy semantic --provider openai --model gpt-4.1-mini \
      --items '[{"name":"Paracetamol"}]' scan.pdf

EXIT CODES:
  0  verdict printed
  1  runtime failure (OCR, pdfium, provider, configuration)
  2  rejected request (bad items, missing prescription, unsupported file)

ENVIRONMENT VARIABLES:
  RXVERIFY_REQUIREMENTS   Prescription requirement table (JSON name → bool)
  RXVERIFY_TESSERACT      tesseract executable
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  OPENAI_API_KEY          OpenAI API key (semantic strategy)
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
"#;

/// Verify a pharmacy order against uploaded prescription documents.
#[derive(Parser, Debug)]
#[command(
    name = "rxverify",
    version,
    about = "Verify a pharmacy order against uploaded prescription documents",
    long_about = "OCR the uploaded prescription images or PDFs, check that each requested \
medication appears on them, and report whether a prescription was required.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Prescription images or PDFs, in upload order.
    documents: Vec<PathBuf>,

    /// Desired items as JSON: [{"name": "...", "quantity": "..."}].
    #[arg(long, env = "RXVERIFY_ITEMS", conflicts_with = "items_file")]
    items: Option<String>,

    /// Read the desired-items JSON from this file.
    #[arg(long, env = "RXVERIFY_ITEMS_FILE")]
    items_file: Option<PathBuf>,

    /// Prescription requirement table (JSON object of name → bool).
    #[arg(long, env = "RXVERIFY_REQUIREMENTS", default_value = "prescription_required.json")]
    requirements: PathBuf,

    /// Matching strategy: matcher or semantic.
    #[arg(long, env = "RXVERIFY_STRATEGY", default_value = "matcher")]
    strategy: Strategy,

    /// Also report whether the text looks like a prescription.
    #[arg(long, env = "RXVERIFY_FORMAT_CHECK")]
    format_check: bool,

    /// PDF rasterisation DPI (72–600).
    #[arg(long, env = "RXVERIFY_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// tesseract executable.
    #[arg(long, env = "RXVERIFY_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// LLM model ID for the semantic strategy.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider for the semantic strategy: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// Print the verdict on one line.
    #[arg(long, env = "RXVERIFY_COMPACT")]
    compact: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RXVERIFY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RXVERIFY_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("\x1b[31merror:\x1b[0m {err:#}");
            let caller_error = err
                .downcast_ref::<VerifyError>()
                .is_some_and(VerifyError::is_caller_error);
            ExitCode::from(if caller_error { 2 } else { 1 })
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let items_json = match (&cli.items, &cli.items_file) {
        (Some(json), _) => json.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read items from {:?}", path))?,
        (None, None) => {
            return Err(VerifyError::InvalidInput(
                "missing desired items (pass --items or --items-file)".into(),
            )
            .into())
        }
    };
    let desired = parse_desired_items(&items_json)?;

    let documents = cli
        .documents
        .iter()
        .map(|p| {
            UploadedDocument::from_path(p).with_context(|| format!("Failed to read {:?}", p))
        })
        .collect::<Result<Vec<_>>>()?;

    let config = build_config(cli)?;
    let verifier = Verifier::from_config(config).context("Failed to start verifier")?;

    let spinner = (!cli.quiet && !cli.verbose).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message(format!("Reading {} document(s)…", documents.len()));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = verifier.verify(&documents, &desired).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    // Keep the typed error so main can pick the exit code.
    let verdict = result?;

    let json = if cli.compact {
        serde_json::to_string(&verdict)
    } else {
        serde_json::to_string_pretty(&verdict)
    }
    .context("Failed to serialise verdict")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{json}").context("Failed to write to stdout")?;
    Ok(())
}

/// Map CLI args to `VerifierConfig`.
fn build_config(cli: &Cli) -> Result<VerifierConfig> {
    let mut builder = VerifierConfig::builder()
        .strategy(cli.strategy)
        .dpi(cli.dpi)
        .format_check(cli.format_check)
        .requirements_path(cli.requirements.clone())
        .tesseract_bin(cli.tesseract.clone());

    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(path.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }

    builder.build().context("Invalid configuration")
}
