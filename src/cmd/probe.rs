//! The `probe` subcommand.

use clap::Args;

use crate::{
    async_utils::io::{write_output, write_output_json},
    engines::install::INSTALL_HELP,
    prelude::*,
};

use super::{EngineOpts, OutputFormat};

/// Probe command line arguments.
#[derive(Debug, Args)]
pub struct ProbeOpts {
    #[clap(flatten)]
    pub engine: EngineOpts,

    /// Output format.
    #[clap(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

/// The `probe` subcommand. Fails if no usable engine was found.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_probe(opts: &ProbeOpts) -> Result<()> {
    let status = opts.engine.probe().await;

    match opts.format {
        OutputFormat::Text => {
            let line = format!("{}: {}\n", opts.engine.prober().binary().display(), status);
            write_output(None, line.as_bytes()).await?;
        }
        OutputFormat::Json => write_output_json(None, &status).await?,
    }

    if status.is_usable() {
        Ok(())
    } else {
        eprintln!("{}", INSTALL_HELP);
        Err(anyhow!("Tesseract-OCR is {}", status))
    }
}

