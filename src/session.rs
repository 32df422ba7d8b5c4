//! One interactive OCR session: an image, a button press, and a result.
//!
//! The session moves through these states:
//!
//! ```text
//! Idle -> ImageUploaded -> Extracting -> TextDisplayed
//!                                    \-> ErrorDisplayed
//! ```
//!
//! Uploading a new image from any state starts over at `ImageUploaded`. A
//! fresh [`Session`] starts out `Idle`.

use crate::{
    engines::{
        EngineConfig, EngineStatus, Language, OcrEngine, RecognitionError,
        RecognitionRequest,
    },
    image_input::UploadedImage,
    prelude::*,
    result::RecognitionResult,
};

/// Where a session is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No image yet.
    Idle,
    /// We have an image, but haven't run OCR on it.
    ImageUploaded,
    /// OCR is running.
    Extracting,
    /// OCR finished. The text may be empty.
    TextDisplayed,
    /// OCR failed.
    ErrorDisplayed,
}

/// What happened the last time we ran OCR on the current image.
#[derive(Debug)]
pub enum ExtractionOutcome {
    /// We haven't tried yet.
    NotRun,
    /// The engine ran and found no text. This is not an error.
    Empty(RecognitionResult),
    /// The engine found some text.
    HasText(RecognitionResult),
    /// The engine failed.
    Failed(RecognitionError),
}

/// State for a single OCR session.
pub struct Session {
    /// What we learned about the local engine when the session started.
    engine_status: EngineStatus,
    state: SessionState,
    image: Option<UploadedImage>,
    outcome: ExtractionOutcome,
}

impl Session {
    /// Start a new session, given the result of probing for the local engine.
    pub fn new(engine_status: EngineStatus) -> Self {
        Self {
            engine_status,
            state: SessionState::Idle,
            image: None,
            outcome: ExtractionOutcome::NotRun,
        }
    }

    pub fn engine_status(&self) -> EngineStatus {
        self.engine_status
    }

    /// Record the result of an explicit re-probe.
    pub fn set_engine_status(&mut self, engine_status: EngineStatus) {
        self.engine_status = engine_status;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    #[cfg(test)]
    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    #[cfg(test)]
    pub fn outcome(&self) -> &ExtractionOutcome {
        &self.outcome
    }

    /// Consume the session, returning the current image and the outcome of
    /// the last extraction.
    pub fn into_parts(self) -> (Option<UploadedImage>, ExtractionOutcome) {
        (self.image, self.outcome)
    }

    /// Replace the current image, discarding any previous result.
    pub fn upload(&mut self, image: UploadedImage) {
        debug!(
            name = image.name(),
            width = image.width(),
            height = image.height(),
            "Image uploaded"
        );
        self.image = Some(image);
        self.outcome = ExtractionOutcome::NotRun;
        self.state = SessionState::ImageUploaded;
    }

    /// Run OCR on the current image. Blocks until the engine returns.
    ///
    /// Engine failures are recorded in the outcome rather than returned as
    /// errors. We only return an error if there is no image to work on.
    #[instrument(level = "debug", skip_all, fields(engine = engine.name(), lang = %language))]
    pub async fn extract(
        &mut self,
        engine: &dyn OcrEngine,
        language: Language,
        config: &EngineConfig,
    ) -> Result<&ExtractionOutcome> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| anyhow!("no image has been uploaded"))?;

        self.state = SessionState::Extracting;
        let request = RecognitionRequest {
            image,
            language,
            config,
        };
        let (state, outcome) = match engine.recognize(&request).await {
            Ok(text) => {
                let result = RecognitionResult::from_text(text);
                if result.is_blank() {
                    (SessionState::TextDisplayed, ExtractionOutcome::Empty(result))
                } else {
                    (SessionState::TextDisplayed, ExtractionOutcome::HasText(result))
                }
            }
            Err(err) => {
                error!("OCR failed: {}", err);
                (SessionState::ErrorDisplayed, ExtractionOutcome::Failed(err))
            }
        };
        self.state = state;
        self.outcome = outcome;
        Ok(&self.outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use image::{DynamicImage, Rgb, RgbImage};

    use super::*;

    /// An engine that returns canned answers, and remembers what it was
    /// asked.
    struct CannedEngine {
        answer: fn() -> Result<String, RecognitionError>,
        seen: Mutex<Vec<(String, Language, String)>>,
    }

    impl CannedEngine {
        fn new(answer: fn() -> Result<String, RecognitionError>) -> Self {
            Self {
                answer,
                seen: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl OcrEngine for CannedEngine {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn recognize(
            &self,
            request: &RecognitionRequest<'_>,
        ) -> Result<String, RecognitionError> {
            self.seen.lock().unwrap().push((
                request.image.name().to_owned(),
                request.language,
                request.config.as_str().to_owned(),
            ));
            (self.answer)()
        }
    }

    fn image(name: &str) -> UploadedImage {
        UploadedImage::from_dynamic_image(
            name,
            DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]))),
        )
    }

    #[tokio::test]
    async fn extract_without_image_is_an_error() {
        let mut session = Session::new(EngineStatus::Available);
        let engine = CannedEngine::new(|| Ok("Hello".to_owned()));
        let result = session
            .extract(&engine, Language::English, &EngineConfig::default())
            .await;
        assert!(result.is_err());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(engine.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn text_is_displayed() -> Result<()> {
        let mut session = Session::new(EngineStatus::Available);
        session.upload(image("a.png"));
        assert_eq!(session.state(), SessionState::ImageUploaded);
        assert!(matches!(session.outcome(), ExtractionOutcome::NotRun));

        let engine = CannedEngine::new(|| Ok("Hello world\n".to_owned()));
        let config = EngineConfig::default();
        match session.extract(&engine, Language::German, &config).await? {
            ExtractionOutcome::HasText(result) => {
                assert_eq!(result.text, "Hello world\n");
                assert_eq!(result.word_count, 2);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(session.state(), SessionState::TextDisplayed);
        assert_eq!(
            engine.seen.lock().unwrap().as_slice(),
            &[("a.png".to_owned(), Language::German, "--psm 6".to_owned())]
        );
        Ok(())
    }

    #[tokio::test]
    async fn blank_text_is_empty_not_error() -> Result<()> {
        let mut session = Session::new(EngineStatus::Available);
        session.upload(image("blank.png"));
        let engine = CannedEngine::new(|| Ok(" \n\u{c}".to_owned()));
        let outcome = session
            .extract(&engine, Language::English, &EngineConfig::default())
            .await?;
        assert!(matches!(outcome, ExtractionOutcome::Empty(_)));
        assert_eq!(session.state(), SessionState::TextDisplayed);
        Ok(())
    }

    #[tokio::test]
    async fn failures_are_displayed() -> Result<()> {
        let mut session = Session::new(EngineStatus::Unavailable);
        session.upload(image("a.png"));
        let engine = CannedEngine::new(|| {
            Err(RecognitionError::EngineNotFound {
                binary: PathBuf::from("tesseract"),
            })
        });
        let outcome = session
            .extract(&engine, Language::English, &EngineConfig::default())
            .await?;
        assert!(matches!(
            outcome,
            ExtractionOutcome::Failed(RecognitionError::EngineNotFound { .. })
        ));
        assert_eq!(session.state(), SessionState::ErrorDisplayed);
        Ok(())
    }

    #[tokio::test]
    async fn new_upload_clears_previous_outcome() -> Result<()> {
        let mut session = Session::new(EngineStatus::Available);
        session.upload(image("first.png"));
        let engine = CannedEngine::new(|| Ok("Hello".to_owned()));
        session
            .extract(&engine, Language::English, &EngineConfig::default())
            .await?;

        session.upload(image("second.png"));
        assert_eq!(session.state(), SessionState::ImageUploaded);
        assert!(matches!(session.outcome(), ExtractionOutcome::NotRun));
        assert_eq!(session.image().map(|i| i.name()), Some("second.png"));
        Ok(())
    }

    #[tokio::test]
    async fn repeated_extraction_is_stable() -> Result<()> {
        let mut session = Session::new(EngineStatus::Available);
        session.upload(image("a.png"));
        let engine = CannedEngine::new(|| Ok("Same".to_owned()));
        let config = EngineConfig::default();
        let mut texts = vec![];
        for _ in 0..2 {
            if let ExtractionOutcome::HasText(result) =
                session.extract(&engine, Language::English, &config).await?
            {
                texts.push(result.text.clone());
            }
        }
        assert_eq!(texts, vec!["Same", "Same"]);
        Ok(())
    }

    #[tokio::test]
    async fn into_parts_hands_over_image_and_outcome() -> Result<()> {
        let mut session = Session::new(EngineStatus::Available);
        session.upload(image("a.png"));
        let engine = CannedEngine::new(|| Ok("Hello".to_owned()));
        session
            .extract(&engine, Language::English, &EngineConfig::default())
            .await?;
        let (image, outcome) = session.into_parts();
        assert_eq!(image.map(|i| i.name().to_owned()).as_deref(), Some("a.png"));
        assert!(matches!(outcome, ExtractionOutcome::HasText(_)));
        Ok(())
    }

    #[test]
    fn reprobe_updates_status() {
        let mut session = Session::new(EngineStatus::Unavailable);
        session.set_engine_status(EngineStatus::InstallAttempted { success: true });
        assert!(session.engine_status().is_usable());
    }
}
