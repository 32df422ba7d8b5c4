//! Command-line entry points.

use clap::{Args, ValueEnum};

use crate::{
    engines::{
        EngineStatus, OcrEngine,
        install::SystemPackageInstaller,
        probe::EngineProber,
        remote::{DEFAULT_ENDPOINT, DEMO_API_KEY, RemoteOcrEngine},
    },
    prelude::*,
};

pub mod extract;
pub mod languages;
pub mod probe;
pub mod schema;

/// Options for finding the local Tesseract engine.
#[derive(Debug, Clone, Args)]
pub struct EngineOpts {
    /// The `tesseract` binary to run.
    #[clap(long = "tesseract", env = "TESSERACT_CMD", default_value = "tesseract")]
    pub tesseract: PathBuf,

    /// If Tesseract is missing, try once to install it using the system
    /// package manager (`apt-get` or `brew`). Usually needs root.
    #[clap(long)]
    pub install: bool,
}

impl EngineOpts {
    /// Build a prober for our engine binary.
    pub fn prober(&self) -> EngineProber {
        EngineProber::new(&self.tesseract)
    }

    /// Probe the engine, installing it first if it is missing and we've been
    /// asked to.
    pub async fn probe(&self) -> EngineStatus {
        let prober = self.prober();
        if self.install {
            prober.probe_or_install(&SystemPackageInstaller).await
        } else {
            prober.probe().await
        }
    }

    /// Install the engine and probe again, if we've been asked to.
    /// Otherwise return `status` unchanged.
    pub async fn maybe_install(&self, status: EngineStatus) -> EngineStatus {
        if self.install && !status.is_usable() {
            self.prober()
                .install_and_reprobe(&SystemPackageInstaller)
                .await
        } else {
            status
        }
    }
}

/// Options for the online OCR fallback.
#[derive(Debug, Clone, Args)]
pub struct RemoteOpts {
    /// If Tesseract is not available, send the image to the online OCR.space
    /// API instead. Only English is supported.
    #[clap(long)]
    pub remote: bool,

    /// API key for OCR.space. Defaults to the public demo key.
    #[clap(
        long,
        env = "OCR_SPACE_API_KEY",
        default_value = DEMO_API_KEY,
        hide_env_values = true
    )]
    pub api_key: String,

    /// Override the OCR.space endpoint.
    #[clap(long, env = "OCR_SPACE_ENDPOINT", default_value = DEFAULT_ENDPOINT, hide = true)]
    pub endpoint: String,
}

impl RemoteOpts {
    /// Create the remote engine.
    pub fn engine(&self) -> Result<Box<dyn OcrEngine>> {
        Ok(Box::new(RemoteOcrEngine::new(
            self.endpoint.clone(),
            self.api_key.clone(),
        )?))
    }
}

/// How to print results.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text.
    #[default]
    Text,
    /// A JSON record.
    Json,
}
