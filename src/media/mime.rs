use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Sniff the MIME type of an image or video payload from its leading bytes.
pub fn detect_mime(bytes: &[u8]) -> Option<&'static str> {
    // ISO base media: `....ftyp` box at offset 4.
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return Some(match &bytes[8..12] {
            b"qt  " => "video/quicktime",
            _ => "video/mp4",
        });
    }

    match image::guess_format(bytes) {
        Ok(format) => Some(format.to_mime_type()),
        Err(_) => None,
    }
}

/// Guess a MIME type from a file extension.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "mov" => Some("video/quicktime"),
        _ => image::ImageFormat::from_extension(&ext).map(|f| f.to_mime_type()),
    }
}

/// Resolve a MIME type for a file, preferring content over the file name.
pub fn resolve_mime(path: &Path, bytes: &[u8]) -> &'static str {
    detect_mime(bytes)
        .or_else(|| mime_from_extension(path))
        .unwrap_or_else(|| {
            tracing::warn!(
                "Unrecognized media format for {} (first 4 bytes: {:02X?}), falling back to {}",
                path.display(),
                &bytes[..bytes.len().min(4)],
                OCTET_STREAM
            );
            OCTET_STREAM
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_png() {
        assert_eq!(
            detect_mime(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            Some("image/png")
        );
    }

    #[test]
    fn test_detect_jpeg() {
        assert_eq!(detect_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
    }

    #[test]
    fn test_detect_webp() {
        assert_eq!(
            detect_mime(&[
                0x52, 0x49, 0x46, 0x46, 0x00, 0x00, 0x00, 0x00, 0x57, 0x45, 0x42, 0x50
            ]),
            Some("image/webp")
        );
    }

    #[test]
    fn test_detect_mp4() {
        let mut header = vec![0x00, 0x00, 0x00, 0x18];
        header.extend_from_slice(b"ftypisom");
        assert_eq!(detect_mime(&header), Some("video/mp4"));
    }

    #[test]
    fn test_unknown_and_empty() {
        assert_eq!(detect_mime(&[0x00, 0x01, 0x02, 0x03]), None);
        assert_eq!(detect_mime(&[]), None);
    }

    #[test]
    fn test_extension_lookup() {
        assert_eq!(mime_from_extension(Path::new("room.JPG")), Some("image/jpeg"));
        assert_eq!(mime_from_extension(Path::new("clip.mp4")), Some("video/mp4"));
        assert_eq!(mime_from_extension(Path::new("notes")), None);
    }

    #[test]
    fn test_resolve_prefers_content_over_extension() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(resolve_mime(Path::new("mislabeled.jpg"), &png), "image/png");
        assert_eq!(resolve_mime(Path::new("photo.webp"), b"junk"), "image/webp");
        assert_eq!(resolve_mime(Path::new("blob.bin"), b"junk"), OCTET_STREAM);
    }
}
