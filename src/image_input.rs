//! Loading the user's image.
//!
//! We accept PNG and JPEG files only. The file extension is checked first,
//! then the content is sniffed and decoded. Any failure here happens before
//! an OCR engine is ever called.

use std::{error, fmt, io::Cursor};

use image::{ColorType, DynamicImage, ImageFormat};

use crate::{async_utils::spawn_blocking_propagating_panics, prelude::*};

/// File extensions we accept, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// MIME types we are willing to decode, regardless of extension.
const SUPPORTED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg"];

/// A decoded image, ready to be handed to an OCR engine.
#[derive(Clone, Debug)]
pub struct UploadedImage {
    /// The file name the image was loaded from.
    name: String,

    /// The decoded bitmap.
    image: DynamicImage,

    /// The encoding the image arrived in.
    format: ImageFormat,
}

impl UploadedImage {
    /// Read and decode an image file.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub async fn from_path(path: &Path) -> Result<Self, DecodeError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        check_extension(&name)?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| DecodeError::Io {
                path: path.to_owned(),
                source,
            })?;

        // Decoding a large JPEG is CPU-bound.
        spawn_blocking_propagating_panics(move || Self::from_bytes(&name, &bytes)).await
    }

    /// Decode an image from memory. `name` is used to check the extension.
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<Self, DecodeError> {
        check_extension(name)?;

        let not_an_image = || DecodeError::NotAnImage {
            name: name.to_owned(),
        };
        let mime_type = infer::get(bytes)
            .map(|kind| kind.mime_type())
            .ok_or_else(not_an_image)?;
        if !SUPPORTED_MIME_TYPES.contains(&mime_type) {
            return Err(not_an_image());
        }
        let format = ImageFormat::from_mime_type(mime_type).ok_or_else(not_an_image)?;

        let image = image::load_from_memory_with_format(bytes, format).map_err(|source| {
            DecodeError::Image {
                name: name.to_owned(),
                source,
            }
        })?;
        Ok(Self {
            name: name.to_owned(),
            image,
            format,
        })
    }

    /// Wrap an image we already have in memory.
    #[cfg(test)]
    pub fn from_dynamic_image(name: &str, image: DynamicImage) -> Self {
        Self {
            name: name.to_owned(),
            image,
            format: ImageFormat::Png,
        }
    }

    /// The file name this image came from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The color mode of the decoded bitmap.
    pub fn color(&self) -> ColorType {
        self.image.color()
    }

    /// The encoding the image arrived in.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Re-encode the bitmap as PNG. Both engines want PNG input.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buffer, ImageFormat::Png)
            .with_context(|| format!("cannot encode {} as PNG", self.name))?;
        Ok(buffer.into_inner())
    }
}

/// Reject file names without one of our [`SUPPORTED_EXTENSIONS`].
fn check_extension(name: &str) -> Result<(), DecodeError> {
    let extension = Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension {
        Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(DecodeError::UnsupportedExtension {
            name: name.to_owned(),
        }),
    }
}

/// Why we could not turn a file into an [`UploadedImage`].
#[derive(Debug)]
pub enum DecodeError {
    /// The file could not be read.
    Io { path: PathBuf, source: std::io::Error },

    /// The file name does not end in `.png`, `.jpg` or `.jpeg`.
    UnsupportedExtension { name: String },

    /// The content is not a PNG or JPEG image.
    NotAnImage { name: String },

    /// The content looked like an image, but could not be decoded.
    Image {
        name: String,
        source: image::ImageError,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Io { path, .. } => {
                write!(f, "cannot read image file {:?}", path.display())
            }
            DecodeError::UnsupportedExtension { name } => write!(
                f,
                "{:?} is not a supported image file (expected one of: {})",
                name,
                SUPPORTED_EXTENSIONS.join(", ")
            ),
            DecodeError::NotAnImage { name } => {
                write!(f, "{:?} does not contain a PNG or JPEG image", name)
            }
            DecodeError::Image { name, .. } => write!(f, "cannot decode image {:?}", name),
        }
    }
}

impl error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DecodeError::Io { source, .. } => Some(source),
            DecodeError::Image { source, .. } => Some(source),
            DecodeError::UnsupportedExtension { .. } | DecodeError::NotAnImage { .. } => {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    /// Encode a solid-color RGB image in the given format.
    fn solid_image_bytes(
        width: u32,
        height: u32,
        color: [u8; 3],
        format: ImageFormat,
    ) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn decodes_png_with_attributes() {
        let bytes = solid_image_bytes(4, 3, [255, 255, 255], ImageFormat::Png);
        let image = UploadedImage::from_bytes("page.png", &bytes).unwrap();
        assert_eq!(image.name(), "page.png");
        assert_eq!(image.width(), 4);
        assert_eq!(image.height(), 3);
        assert_eq!(image.color(), ColorType::Rgb8);
        assert_eq!(image.format(), ImageFormat::Png);
    }

    #[test]
    fn decodes_jpeg_with_uppercase_extension() {
        let bytes = solid_image_bytes(8, 8, [0, 0, 0], ImageFormat::Jpeg);
        let image = UploadedImage::from_bytes("SCAN.JPEG", &bytes).unwrap();
        assert_eq!(image.format(), ImageFormat::Jpeg);
        assert_eq!((image.width(), image.height()), (8, 8));
    }

    #[test]
    fn content_wins_over_mismatched_extension() {
        let bytes = solid_image_bytes(2, 2, [0, 0, 0], ImageFormat::Png);
        let image = UploadedImage::from_bytes("photo.jpg", &bytes).unwrap();
        assert_eq!(image.format(), ImageFormat::Png);
    }

    #[test]
    fn rejects_unsupported_extension_before_decoding() {
        let bytes = solid_image_bytes(2, 2, [0, 0, 0], ImageFormat::Png);
        let err = UploadedImage::from_bytes("page.gif", &bytes).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedExtension { .. }));
        let err = UploadedImage::from_bytes("no_extension", &bytes).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedExtension { .. }));
    }

    #[test]
    fn rejects_non_image_content() {
        let err = UploadedImage::from_bytes("notes.png", b"just some text").unwrap_err();
        assert!(matches!(err, DecodeError::NotAnImage { .. }));
    }

    #[test]
    fn rejects_truncated_png() {
        let bytes = solid_image_bytes(16, 16, [10, 20, 30], ImageFormat::Png);
        let err = UploadedImage::from_bytes("cut.png", &bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, DecodeError::Image { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn from_path_reports_missing_file() {
        let err = UploadedImage::from_path(Path::new("/nonexistent/missing.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::Io { .. }));
    }

    #[test]
    fn to_png_produces_png_bytes() {
        let bytes = solid_image_bytes(3, 3, [0, 0, 0], ImageFormat::Jpeg);
        let image = UploadedImage::from_bytes("x.jpg", &bytes).unwrap();
        let png = image.to_png().unwrap();
        assert_eq!(infer::get(&png).map(|k| k.mime_type()), Some("image/png"));
    }
}
