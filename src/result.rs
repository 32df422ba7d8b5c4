//! What we report after running OCR.

use schemars::JsonSchema;

use crate::{engines::Language, prelude::*};

/// Extracted text, plus some counts derived from it.
///
/// All the counts are computed from `text` and nothing else.
#[derive(Clone, Debug, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct RecognitionResult {
    /// The text, exactly as returned by the OCR engine.
    pub text: String,

    /// Number of characters (Unicode scalar values) in `text`.
    pub char_count: usize,

    /// Number of whitespace-separated words in `text`.
    pub word_count: usize,

    /// Number of lines in `text`.
    pub line_count: usize,
}

impl RecognitionResult {
    /// Build a result from raw engine output.
    pub fn from_text(text: String) -> Self {
        let char_count = text.chars().count();
        let word_count = text.split_whitespace().count();
        let line_count = text.lines().count();
        Self {
            text,
            char_count,
            word_count,
            line_count,
        }
    }

    /// Did the engine find nothing but whitespace?
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A JSON record describing one extraction, for `--format json`.
#[derive(Clone, Debug, JsonSchema, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ExtractionReport {
    /// The name of the image file.
    pub image: String,

    /// Image width in pixels.
    pub width: u32,

    /// Image height in pixels.
    pub height: u32,

    /// Which engine produced the text: `tesseract` or `ocr.space`.
    pub engine: String,

    /// The language we asked the engine to read.
    pub language: Language,

    /// True if the engine ran but found no text.
    pub empty: bool,

    /// The text and its counts.
    #[serde(flatten)]
    pub result: RecognitionResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_derived_from_text() {
        let result = RecognitionResult::from_text("Hello world\nsecond  line\n".to_owned());
        assert_eq!(result.char_count, 25);
        assert_eq!(result.word_count, 4);
        assert_eq!(result.line_count, 2);
        assert!(!result.is_blank());
    }

    #[test]
    fn counts_characters_not_bytes() {
        let result = RecognitionResult::from_text("日本語 テキスト".to_owned());
        assert_eq!(result.char_count, 8);
        assert_eq!(result.word_count, 2);
        assert_eq!(result.line_count, 1);
    }

    #[test]
    fn empty_and_blank_text() {
        let empty = RecognitionResult::from_text(String::new());
        assert_eq!(
            (empty.char_count, empty.word_count, empty.line_count),
            (0, 0, 0)
        );
        assert!(empty.is_blank());

        // Tesseract ends its output with a form feed.
        let blank = RecognitionResult::from_text(" \n\u{c}".to_owned());
        assert_eq!(blank.word_count, 0);
        assert!(blank.is_blank());
    }

    #[test]
    fn report_flattens_result() {
        let report = ExtractionReport {
            image: "page.png".to_owned(),
            width: 10,
            height: 20,
            engine: "tesseract".to_owned(),
            language: Language::English,
            empty: false,
            result: RecognitionResult::from_text("Hi".to_owned()),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["text"], "Hi");
        assert_eq!(value["word_count"], 1);
        assert_eq!(value["language"], "eng");
    }
}
