//! OCR using the hosted OCR.space API.
//!
//! This is a fallback for machines without Tesseract. It only reads English,
//! and the default API key is OCR.space's public demo key, which is heavily
//! rate limited.

use std::time::Duration;

use serde_json::Value;

use crate::{data_url::data_url, image_input::UploadedImage, prelude::*};

use super::{Language, OcrEngine, RecognitionError, RecognitionRequest};

/// The OCR.space endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.ocr.space/parse/image";

/// OCR.space's free demo key.
pub const DEMO_API_KEY: &str = "helloworld";

/// The language we always ask the online service for.
const REMOTE_LANGUAGE: &str = "eng";

/// How long we wait for the online service.
pub const REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// The parts of an OCR.space response that we care about.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResponse {
    /// Did processing fail?
    is_errored_on_processing: bool,

    /// One entry per page. May be `null` when processing fails.
    #[serde(default)]
    parsed_results: Option<Vec<OcrSpaceParsedResult>>,

    /// A string or a list of strings, when something went wrong.
    #[serde(default)]
    error_message: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceParsedResult {
    parsed_text: String,
}

/// OCR engine wrapping the OCR.space API.
#[derive(Clone, Debug)]
pub struct RemoteOcrEngine {
    /// HTTP client, with our timeout applied.
    client: reqwest::Client,

    /// Where to POST our images.
    endpoint: String,

    /// Our API key.
    api_key: String,
}

impl RemoteOcrEngine {
    /// Create a new engine talking to `endpoint`, giving up after
    /// [`REMOTE_TIMEOUT`].
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, api_key, REMOTE_TIMEOUT)
    }

    /// Create a new engine with a custom request timeout.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("cannot create HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// Send an image to the online service and return the text of the first
    /// page.
    #[instrument(level = "debug", skip_all, fields(image = %image.name()))]
    pub async fn recognize_image(
        &self,
        image: &UploadedImage,
    ) -> Result<String, RecognitionError> {
        let png = image.to_png().map_err(RecognitionError::ImageEncoding)?;
        let base64_image = data_url("image/png", &png);
        let form = [
            ("apikey", self.api_key.as_str()),
            ("base64Image", base64_image.as_str()),
            ("language", REMOTE_LANGUAGE),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(RecognitionError::RemoteNetwork)?;
        let status = response.status();
        debug!(%status, "Online OCR responded");
        if let Err(err) = response.error_for_status_ref() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, body = %body, "Online OCR returned an error page");
            return Err(RecognitionError::RemoteNetwork(err));
        }
        let body = response
            .text()
            .await
            .map_err(RecognitionError::RemoteNetwork)?;

        parse_response(&body)
    }
}

#[async_trait]
impl OcrEngine for RemoteOcrEngine {
    fn name(&self) -> &'static str {
        "ocr.space"
    }

    async fn recognize(
        &self,
        request: &RecognitionRequest<'_>,
    ) -> Result<String, RecognitionError> {
        if request.language != Language::English {
            warn!(
                "Online OCR only reads English; ignoring language {}",
                request.language
            );
        }
        if request.config.args().next().is_some() {
            debug!(
                "Online OCR ignores engine configuration {:?}",
                request.config.as_str()
            );
        }
        self.recognize_image(request.image).await
    }
}

/// Turn an OCR.space response body into text.
fn parse_response(body: &str) -> Result<String, RecognitionError> {
    let response = serde_json::from_str::<OcrSpaceResponse>(body)
        .map_err(|err| RecognitionError::RemoteParse(err.to_string()))?;

    if response.is_errored_on_processing {
        let messages = error_messages(response.error_message.as_ref());
        warn!(?messages, "Online OCR reported a processing error");
        return Err(RecognitionError::RemoteProcessing { messages });
    }

    response
        .parsed_results
        .and_then(|results| results.into_iter().next())
        .map(|result| result.parsed_text)
        .ok_or_else(|| {
            RecognitionError::RemoteParse("response contained no parsed results".to_owned())
        })
}

/// Flatten OCR.space's `ErrorMessage`, which may be a string or a list.
fn error_messages(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(msg)) => vec![msg.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(msg) => msg.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::Null) | None => vec![],
        Some(other) => vec![other.to_string()],
    }
}
