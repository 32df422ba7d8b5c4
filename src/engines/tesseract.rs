//! Tesseract OCR engine.

use std::io;

use tokio::process::Command;

use crate::{async_utils::check_for_command_failure, prelude::*};

use super::{EngineStatus, OcrEngine, RecognitionError, RecognitionRequest};

/// OCR engine wrapping the `tesseract` CLI tool.
#[derive(Clone, Debug)]
pub struct TesseractEngine {
    /// The `tesseract` binary.
    binary: PathBuf,

    /// What our probe found. We refuse to run at all unless this is usable.
    status: EngineStatus,
}

impl TesseractEngine {
    /// Create a new `tesseract` engine from the result of probing `binary`.
    pub fn new(binary: impl Into<PathBuf>, status: EngineStatus) -> Self {
        Self {
            binary: binary.into(),
            status,
        }
    }

    fn not_found(&self) -> RecognitionError {
        RecognitionError::EngineNotFound {
            binary: self.binary.clone(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    #[instrument(level = "debug", skip_all, fields(image = %request.image.name(), lang = %request.language))]
    async fn recognize(
        &self,
        request: &RecognitionRequest<'_>,
    ) -> Result<String, RecognitionError> {
        // Don't spawn anything if we already know the engine is missing.
        if !self.status.is_usable() {
            return Err(self.not_found());
        }

        let png = request
            .image
            .to_png()
            .map_err(RecognitionError::ImageEncoding)?;

        // Write our input to a temporary file.
        let tmpdir = tempfile::TempDir::with_prefix("tesseract")
            .context("cannot create tesseract working directory")
            .map_err(RecognitionError::EngineInvocation)?;
        let input_path = tmpdir.path().join("input.png");
        let output_path = tmpdir.path().join("output.txt");
        tokio::fs::write(&input_path, &png)
            .await
            .context("cannot write tesseract input file")
            .map_err(RecognitionError::EngineInvocation)?;

        // Run tesseract on the input file. It appends `.txt` to the output
        // base name itself.
        let result = Command::new(&self.binary)
            .arg(&input_path)
            .arg(output_path.with_extension(""))
            .arg("-l")
            .arg(request.language.code())
            .args(request.config.args())
            .output()
            .await;
        let output = match result {
            Ok(output) => output,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(self.not_found());
            }
            Err(err) => {
                return Err(RecognitionError::EngineInvocation(
                    anyhow::Error::new(err).context("cannot run tesseract"),
                ));
            }
        };
        check_for_command_failure("tesseract", &output)
            .map_err(RecognitionError::EngineInvocation)?;

        // Read the output file.
        let text = tokio::fs::read_to_string(&output_path)
            .await
            .context("cannot read tesseract output file")
            .map_err(RecognitionError::EngineInvocation)?;
        debug!(chars = text.chars().count(), "Tesseract finished");
        Ok(text)
    }
}
