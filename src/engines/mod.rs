//! OCR engine interface.
//!
//! We have exactly two engines: a local `tesseract` binary, and the hosted
//! OCR.space API, which we only use when the user asks for it.

use std::{error, fmt};

use clap::ValueEnum;
use schemars::JsonSchema;

use crate::{image_input::UploadedImage, prelude::*};

pub mod install;
pub mod probe;
pub mod remote;
pub mod tesseract;

pub use self::probe::EngineStatus;

/// Default engine configuration: "assume a single uniform block of text".
pub const DEFAULT_ENGINE_CONFIG: &str = "--psm 6";

/// Languages we know how to ask Tesseract for. The names are Tesseract's
/// own language codes.
#[derive(
    Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq, Serialize, ValueEnum,
)]
pub enum Language {
    #[default]
    #[clap(name = "eng")]
    #[serde(rename = "eng")]
    English,
    #[clap(name = "spa")]
    #[serde(rename = "spa")]
    Spanish,
    #[clap(name = "fra")]
    #[serde(rename = "fra")]
    French,
    #[clap(name = "deu")]
    #[serde(rename = "deu")]
    German,
    #[clap(name = "chi_sim")]
    #[serde(rename = "chi_sim")]
    SimplifiedChinese,
    #[clap(name = "jpn")]
    #[serde(rename = "jpn")]
    Japanese,
    #[clap(name = "kor")]
    #[serde(rename = "kor")]
    Korean,
}

impl Language {
    /// Every supported language, in display order.
    pub const ALL: &[Language] = &[
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::SimplifiedChinese,
        Language::Japanese,
        Language::Korean,
    ];

    /// The Tesseract language code, as passed to `-l`.
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "eng",
            Language::Spanish => "spa",
            Language::French => "fra",
            Language::German => "deu",
            Language::SimplifiedChinese => "chi_sim",
            Language::Japanese => "jpn",
            Language::Korean => "kor",
        }
    }

    /// A human-readable name.
    pub fn display_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::SimplifiedChinese => "Chinese (Simplified)",
            Language::Japanese => "Japanese",
            Language::Korean => "Korean",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Engine-specific options, such as `--psm 6`. We don't interpret these; we
/// split them on whitespace and hand them to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig(String);

impl EngineConfig {
    pub fn new(config: impl Into<String>) -> Self {
        Self(config.into())
    }

    /// The raw configuration string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The configuration as individual command-line arguments.
    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_CONFIG)
    }
}

/// Everything an engine needs to OCR one image.
pub struct RecognitionRequest<'a> {
    /// The decoded image.
    pub image: &'a UploadedImage,

    /// The language to read.
    pub language: Language,

    /// Engine-specific options.
    pub config: &'a EngineConfig,
}

/// Interface to an OCR engine.
#[async_trait]
pub trait OcrEngine: Send + Sync + 'static {
    /// A short name for this engine, used in logs and reports.
    fn name(&self) -> &'static str;

    /// Extract text from an image.
    ///
    /// Finding no text is not an error: the returned string may be empty or
    /// contain only whitespace.
    async fn recognize(
        &self,
        request: &RecognitionRequest<'_>,
    ) -> Result<String, RecognitionError>;
}

/// Prefix used for all failures of the online OCR service.
const REMOTE_FAILURE_PREFIX: &str = "Online OCR failed";

/// Message shown when the online OCR service reports that it could not
/// process our image.
pub const REMOTE_PROCESSING_ERROR: &str = "Error in OCR processing";

/// An error which occurred while running OCR.
#[derive(Debug)]
pub enum RecognitionError {
    /// The local engine is not installed, or we never found it.
    EngineNotFound { binary: PathBuf },

    /// The local engine ran, but failed.
    EngineInvocation(anyhow::Error),

    /// We could not prepare the image for the engine.
    ImageEncoding(anyhow::Error),

    /// We could not talk to the online OCR service, or it timed out.
    RemoteNetwork(reqwest::Error),

    /// The online OCR service sent us something we couldn't understand.
    RemoteParse(String),

    /// The online OCR service reported a processing error.
    RemoteProcessing { messages: Vec<String> },
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognitionError::EngineNotFound { binary } => write!(
                f,
                "OCR engine {:?} was not found; install Tesseract-OCR or use --remote",
                binary.display()
            ),
            RecognitionError::EngineInvocation(err) => {
                write!(f, "OCR engine failed: {:#}", err)
            }
            RecognitionError::ImageEncoding(err) => {
                write!(f, "cannot prepare image for OCR: {:#}", err)
            }
            RecognitionError::RemoteNetwork(err) => {
                write!(f, "{}: {}", REMOTE_FAILURE_PREFIX, err)
            }
            RecognitionError::RemoteParse(msg) => {
                write!(f, "{}: {}", REMOTE_FAILURE_PREFIX, msg)
            }
            RecognitionError::RemoteProcessing { .. } => {
                write!(f, "{}", REMOTE_PROCESSING_ERROR)
            }
        }
    }
}

impl error::Error for RecognitionError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            RecognitionError::EngineInvocation(err)
            | RecognitionError::ImageEncoding(err) => Some(&**err),
            RecognitionError::RemoteNetwork(err) => Some(err),
            RecognitionError::EngineNotFound { .. }
            | RecognitionError::RemoteParse(_)
            | RecognitionError::RemoteProcessing { .. } => None,
        }
    }
}
