//! Converting binary data to a `data:` URL.

use base64::{Engine as _, prelude::BASE64_STANDARD};

/// Convert binary data to a `data:` URL.
pub fn data_url(mime_type: &str, data: &[u8]) -> String {
    let base64_data = BASE64_STANDARD.encode(data);
    // The OCR.space API wants the raw Base64 text after the prefix, without any
    // percent-encoding. The form encoder will escape it for transport.
    format!("data:{};base64,{}", mime_type, base64_data)
}
