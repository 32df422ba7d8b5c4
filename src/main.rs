use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing_subscriber::{
    EnvFilter, Layer as _, filter::Directive, fmt::format::FmtSpan, layer::SubscriberExt,
    util::SubscriberInitExt as _,
};

use self::{prelude::*, ui::Ui};

mod async_utils;
mod cmd;
mod data_url;
mod engines;
mod image_input;
mod prelude;
mod result;
mod session;
mod ui;

/// Extract text from an image using Tesseract, or an online OCR service.
#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    after_help = r#"
Environment Variables:
  - TESSERACT_CMD (optional): Path to the `tesseract` binary.
  - OCR_SPACE_API_KEY (optional): API key for the online OCR fallback.
    Defaults to the public demo key.
  - OCR_SPACE_ENDPOINT (optional): Override the online OCR server URL.

  These variables may be set in a standard `.env` file.
"#
)]
struct Opts {
    #[clap(subcommand)]
    subcmd: Cmd,
}

/// The subcommands we support.
#[derive(Debug, Subcommand)]
enum Cmd {
    /// Check whether a local Tesseract engine is available.
    Probe(cmd::probe::ProbeOpts),
    /// Extract text from a PNG or JPEG image.
    Extract(cmd::extract::ExtractOpts),
    /// List the languages the local engine can be asked to read.
    Languages,
    /// Print schemas for output formats.
    Schema(cmd::schema::SchemaOpts),
}

/// Our entry point, which can return an error. [`anyhow::Result`] will
/// automatically print a nice error message with optional backtrace.
#[tokio::main]
async fn main() -> Result<()> {
    let ui = Ui::init();

    // Initialize tracing.
    let directive =
        Directive::from_str("info").expect("built-in directive should be valid");
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_writer(ui.get_stderr_writer())
        .with_filter(env_filter);

    tracing_subscriber::registry().with(subscriber).init();

    // Call our real `main` function now that logging is set up.
    real_main(ui).await
}

/// Our real entry point.
#[instrument(level = "debug", name = "main", skip_all)]
async fn real_main(ui: Ui) -> Result<()> {
    // Load environment variables from a `.env` file, if it exists.
    dotenvy::dotenv().ok();

    // Parse command-line arguments.
    let opts = Opts::parse();
    debug!("Parsed options: {:?}", opts);

    // Run the appropriate subcommand.
    match &opts.subcmd {
        Cmd::Probe(probe_opts) => {
            cmd::probe::cmd_probe(probe_opts).await?;
        }
        Cmd::Extract(extract_opts) => {
            cmd::extract::cmd_extract(&ui, extract_opts).await?;
        }
        Cmd::Languages => {
            cmd::languages::cmd_languages().await?;
        }
        Cmd::Schema(schema_opts) => {
            cmd::schema::cmd_schema(schema_opts).await?;
        }
    }
    Ok(())
}
