use base64::{engine::general_purpose::STANDARD, Engine as _};

/// MIME type sent upstream when the upload does not declare an image type.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// An uploaded image, already encoded for transport.
///
/// The bytes are not inspected; any payload is accepted as long as it was
/// uploaded.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub mime_type: String,
    pub base64: String,
    pub size: usize,
}

impl ImageUpload {
    pub fn from_bytes(bytes: &[u8], content_type: Option<&str>) -> Self {
        let mime_type = content_type
            .filter(|ct| ct.starts_with("image/"))
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_string();

        Self {
            mime_type,
            base64: STANDARD.encode(bytes),
            size: bytes.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_declared_image_type() {
        let upload = ImageUpload::from_bytes(b"\x89PNG", Some("image/png"));
        assert_eq!(upload.mime_type, "image/png");
        assert_eq!(upload.base64, "iVBORw==");
        assert_eq!(upload.size, 4);
    }

    #[test]
    fn falls_back_to_jpeg_for_missing_or_non_image_types() {
        assert_eq!(ImageUpload::from_bytes(b"x", None).mime_type, DEFAULT_IMAGE_MIME);
        assert_eq!(
            ImageUpload::from_bytes(b"x", Some("application/octet-stream")).mime_type,
            DEFAULT_IMAGE_MIME
        );
    }
}
