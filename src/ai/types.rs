//! Common types for the provider normalization layer

use base64::Engine as _;

/// One logical AI operation, built per call and dropped after settlement.
#[derive(Debug, Clone)]
pub struct AiRequest {
    /// Capability name resolved against the configuration ("describe", ...).
    pub capability: String,
    pub prompt: String,
    /// Optional system message, prepended for chat-shaped providers.
    pub system: Option<String>,
    /// Input images, sent as data-URI parts.
    pub images: Vec<ImageInput>,
    /// File reference for the Gemini file-data shape.
    pub file_uri: Option<String>,
    /// Ask the provider for image output (`modalities: ["image"]`).
    pub want_image: bool,
}

impl AiRequest {
    pub fn text(capability: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            prompt: prompt.into(),
            system: None,
            images: Vec::new(),
            file_uri: None,
            want_image: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.images.push(ImageInput { bytes });
        self
    }

    pub fn with_images(mut self, images: Vec<Vec<u8>>) -> Self {
        self.images
            .extend(images.into_iter().map(|bytes| ImageInput { bytes }));
        self
    }

    pub fn with_file_uri(mut self, uri: impl Into<String>) -> Self {
        self.file_uri = Some(uri.into());
        self
    }

    pub fn wanting_image(mut self) -> Self {
        self.want_image = true;
        self
    }
}

/// Raw input image. The MIME type is sniffed from magic bytes when the
/// data-URI is built.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
}

impl ImageInput {
    pub fn mime_type(&self) -> &'static str {
        sniff_mime(&self.bytes)
    }

    /// `data:{mime};base64,{payload}` for the image_url content part.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Sniff an image MIME type from magic bytes; JPEG is the fallback.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG") {
        "image/png"
    } else if bytes.starts_with(b"GIF") {
        "image/gif"
    } else if bytes.starts_with(b"RIFF") && bytes.len() >= 20 && bytes[..20].windows(4).any(|w| w == b"WEBP") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// The settled result of one logical call, uniform across providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub payload: Payload,
    /// Provider-assigned generation id, used only for cost lookup. Present
    /// on failures too when the provider billed a partial attempt.
    pub generation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text { body: String },
    Image { bytes: Vec<u8>, format: String },
    ImageRef { url: String },
    Failure { message: String, retryable: bool },
}

impl Outcome {
    pub fn failure(message: impl Into<String>, retryable: bool) -> Self {
        Self {
            payload: Payload::Failure {
                message: message.into(),
                retryable,
            },
            generation_id: None,
        }
    }

    pub fn with_generation_id(mut self, generation_id: Option<String>) -> Self {
        self.generation_id = generation_id;
        self
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_failure(&self) -> bool {
        matches!(self.payload, Payload::Failure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    #[test]
    fn test_sniff_mime_png() {
        assert_eq!(sniff_mime(b"\x89PNG\r\n\x1a\n...."), "image/png");
    }

    #[test]
    fn test_sniff_mime_gif() {
        assert_eq!(sniff_mime(b"GIF89a...."), "image/gif");
    }

    #[test]
    fn test_sniff_mime_webp() {
        assert_eq!(sniff_mime(b"RIFF\x00\x00\x00\x00WEBPVP8 ....."), "image/webp");
    }

    #[test]
    fn test_sniff_mime_defaults_to_jpeg() {
        assert_eq!(sniff_mime(b"\xff\xd8\xff\xe0"), "image/jpeg");
        assert_eq!(sniff_mime(b""), "image/jpeg");
    }

    #[test]
    fn test_data_uri_round_trip() {
        let image = ImageInput {
            bytes: b"\x89PNG\r\n\x1a\nhello".to_vec(),
        };
        let uri = image.to_data_uri();
        assert!(uri.starts_with("data:image/png;base64,"));
        let payload = uri.strip_prefix("data:image/png;base64,").unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .unwrap();
        assert_eq!(decoded, image.bytes);
    }
}
