//! Input boundaries: supported formats and size limits.

use crate::error::{KlartextError, Result};
use once_cell::sync::Lazy;
use std::collections::HashSet;

pub const JPEG_MIME: &str = "image/jpeg";
pub const PNG_MIME: &str = "image/png";
pub const GIF_MIME: &str = "image/gif";
pub const WEBP_MIME: &str = "image/webp";
pub const TIFF_MIME: &str = "image/tiff";
pub const BMP_MIME: &str = "image/bmp";
pub const PDF_MIME: &str = "application/pdf";

pub const MAX_FILE_SIZE_BYTES: usize = 50 * 1024 * 1024;
pub const MAX_BATCH_FILES: usize = 20;

pub static SUPPORTED_MIME_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        JPEG_MIME, PNG_MIME, GIF_MIME, WEBP_MIME, TIFF_MIME, BMP_MIME, PDF_MIME,
    ])
});

pub fn is_supported(mime: &str) -> bool {
    SUPPORTED_MIME_TYPES.contains(mime)
}

/// Sniff the MIME type from magic bytes.
pub fn detect(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|kind| kind.mime_type())
}

/// Check one input against the format and size boundaries.
///
/// The sniffed type wins over the declared one when both are present;
/// a client-supplied label is advisory only.
pub fn validate_input(bytes: &[u8], declared_mime: &str) -> Result<&'static str> {
    if bytes.is_empty() {
        return Err(KlartextError::validation("input file is empty"));
    }
    if bytes.len() > MAX_FILE_SIZE_BYTES {
        return Err(KlartextError::FileTooLarge {
            size: bytes.len(),
            limit: MAX_FILE_SIZE_BYTES,
        });
    }

    let effective = match detect(bytes) {
        Some(sniffed) => sniffed,
        None => SUPPORTED_MIME_TYPES
            .get(declared_mime)
            .copied()
            .ok_or_else(|| KlartextError::UnsupportedFormat(declared_mime.to_string()))?,
    };
    if !is_supported(effective) {
        return Err(KlartextError::UnsupportedFormat(effective.to_string()));
    }
    Ok(effective)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_set() {
        assert!(is_supported(PNG_MIME));
        assert!(is_supported(PDF_MIME));
        assert!(!is_supported("image/svg+xml"));
        assert!(!is_supported("text/plain"));
    }

    #[test]
    fn test_detect_png_magic() {
        let png_header = [0x89u8, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0, 0];
        assert_eq!(detect(&png_header), Some(PNG_MIME));
    }

    #[test]
    fn test_validate_rejects_empty_and_oversized() {
        assert!(matches!(
            validate_input(&[], PNG_MIME).unwrap_err(),
            KlartextError::Validation { .. }
        ));

        let oversized = vec![0u8; MAX_FILE_SIZE_BYTES + 1];
        assert!(matches!(
            validate_input(&oversized, PNG_MIME).unwrap_err(),
            KlartextError::FileTooLarge { .. }
        ));
    }

    #[test]
    fn test_sniffed_type_overrides_declared() {
        let png_header = [0x89u8, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0, 0];
        assert_eq!(validate_input(&png_header, "text/plain").unwrap(), PNG_MIME);
    }

    #[test]
    fn test_unsniffable_falls_back_to_declared() {
        let opaque = [0u8, 1, 2, 3, 4, 5, 6, 7];
        assert_eq!(validate_input(&opaque, TIFF_MIME).unwrap(), TIFF_MIME);
        assert!(matches!(
            validate_input(&opaque, "application/zip").unwrap_err(),
            KlartextError::UnsupportedFormat(_)
        ));
    }
}
