//! The `extract` subcommand.

use clap::Args;

use crate::{
    async_utils::io::{write_output, write_output_json},
    engines::{
        DEFAULT_ENGINE_CONFIG, EngineConfig, EngineStatus, Language, OcrEngine,
        install::INSTALL_HELP, tesseract::TesseractEngine,
    },
    image_input::UploadedImage,
    prelude::*,
    result::{ExtractionReport, RecognitionResult},
    session::{ExtractionOutcome, Session},
    ui::{ProgressConfig, Ui},
};

use super::{EngineOpts, OutputFormat, RemoteOpts};

/// Extract command line arguments.
#[derive(Debug, Args)]
pub struct ExtractOpts {
    /// The image to read. Must be a `.png`, `.jpg` or `.jpeg` file.
    pub image_path: PathBuf,

    /// The language of the text in the image.
    #[clap(short = 'l', long, value_enum, default_value_t)]
    pub language: Language,

    /// Options passed through to Tesseract. The default tells it to expect a
    /// single uniform block of text.
    #[clap(long, default_value = DEFAULT_ENGINE_CONFIG, allow_hyphen_values = true)]
    pub config: String,

    #[clap(flatten)]
    pub engine: EngineOpts,

    #[clap(flatten)]
    pub remote: RemoteOpts,

    /// Output format.
    #[clap(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Also save the extracted text to this file, exactly as extracted.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `extract` subcommand.
#[instrument(level = "debug", skip_all, fields(image = %opts.image_path.display()))]
pub async fn cmd_extract(ui: &Ui, opts: &ExtractOpts) -> Result<()> {
    // Find out what we're working with before we look at the image.
    let mut session = Session::new(opts.engine.prober().probe().await);
    let status = opts.engine.maybe_install(session.engine_status()).await;
    session.set_engine_status(status);
    let engine = choose_engine(session.engine_status(), opts)?;

    // Decode the image. Bad files stop here, before any OCR.
    let image = UploadedImage::from_path(&opts.image_path).await?;
    info!(
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        format = ?image.format(),
        "Loaded {}",
        image.name()
    );
    session.upload(image);

    let config = EngineConfig::new(opts.config.as_str());
    ui.with_spinner(
        &ProgressConfig {
            emoji: "🔎",
            msg: "Extracting text...",
            done_msg: "Extracted text",
        },
        session.extract(engine.as_ref(), opts.language, &config),
    )
    .await?;
    debug!(state = ?session.state(), "Extraction finished");

    let (image, outcome) = session.into_parts();
    let image = image.context("session lost its image")?;
    let (result, empty) = finished_result(outcome)?;

    match opts.format {
        OutputFormat::Text if empty => {}
        OutputFormat::Text => write_output(None, result.text.as_bytes()).await?,
        OutputFormat::Json => {
            let report = ExtractionReport {
                image: image.name().to_owned(),
                width: image.width(),
                height: image.height(),
                engine: engine.name().to_owned(),
                language: opts.language,
                empty,
                result: result.clone(),
            };
            write_output_json(None, &report).await?;
        }
    }

    if let Some(path) = &opts.output_path {
        if empty {
            warn!("Not writing {} because no text was found", path.display());
        } else {
            write_output(Some(path), result.text.as_bytes()).await?;
            info!("Saved extracted text to {}", path.display());
        }
    }
    Ok(())
}

/// Unpack a finished extraction into its result and whether it was empty.
/// Engine failures become errors, keeping the
/// [`RecognitionError`](crate::engines::RecognitionError) as the source.
fn finished_result(outcome: ExtractionOutcome) -> Result<(RecognitionResult, bool)> {
    match outcome {
        ExtractionOutcome::HasText(result) => {
            info!(
                characters = result.char_count,
                words = result.word_count,
                lines = result.line_count,
                "Text extracted successfully"
            );
            Ok((result, false))
        }
        ExtractionOutcome::Empty(result) => {
            warn!("No text found in the image");
            Ok((result, true))
        }
        ExtractionOutcome::Failed(err) => Err(err.into()),
        ExtractionOutcome::NotRun => Err(anyhow!("OCR did not run")),
    }
}

/// Pick the local engine if we have it, or the online one if the user
/// allowed it.
fn choose_engine(status: EngineStatus, opts: &ExtractOpts) -> Result<Box<dyn OcrEngine>> {
    if status.is_usable() {
        Ok(Box::new(TesseractEngine::new(&opts.engine.tesseract, status)))
    } else if opts.remote.remote {
        warn!("Tesseract-OCR is {}; using the online OCR API instead", status);
        opts.remote.engine()
    } else {
        eprintln!("{}", INSTALL_HELP);
        Err(anyhow!("Tesseract-OCR is {}", status))
    }
}
