//! Header-only dimension probing.
//!
//! | Step | Crate / function |
//! |---|---|
//! | Open | `image::ImageReader::open` (buffered file handle) |
//! | Recognize container | `ImageReader::with_guessed_format` (magic bytes, then extension) |
//! | Read dimensions | `ImageReader::into_dimensions` (header only, no pixel decode) |
//!
//! Recognized containers are whatever decoders are compiled into `image`:
//! JPEG, PNG, TIFF and WebP.
//!
//! The reader owns the file handle; it is released when the reader is dropped,
//! on the success path and on every error path alike.

use super::backend::BackendError;
use super::params::PhotoMetadata;
use image::{ImageError, ImageReader};
use std::io::ErrorKind;
use std::path::Path;

/// Read the pixel dimensions of the photo at `path`.
///
/// - Missing file → [`BackendError::NotFound`]
/// - Unrecognized or corrupt container → [`BackendError::UnreadableFormat`]
/// - Any other I/O failure → [`BackendError::Io`]
pub fn read_metadata(path: &Path) -> Result<PhotoMetadata, BackendError> {
    let reader = ImageReader::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => BackendError::NotFound(path.to_path_buf()),
        _ => BackendError::Io(e),
    })?;
    let reader = reader.with_guessed_format()?;

    if reader.format().is_none() {
        return Err(BackendError::UnreadableFormat {
            path: path.to_path_buf(),
            reason: "container format not recognized".to_string(),
        });
    }

    let (width, height) = reader.into_dimensions().map_err(|e| match e {
        ImageError::IoError(io) => BackendError::Io(io),
        other => BackendError::UnreadableFormat {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })?;

    Ok(PhotoMetadata { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageEncoder, RgbImage};
    use tempfile::TempDir;

    /// Create a small valid JPEG file with the given dimensions.
    fn create_test_jpeg(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let file = std::fs::File::create(path).unwrap();
        let writer = std::io::BufWriter::new(file);
        image::codecs::jpeg::JpegEncoder::new(writer)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
    }

    #[test]
    fn landscape_jpeg_reports_width_first() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("landscape.jpg");
        create_test_jpeg(&path, 320, 180);

        let meta = read_metadata(&path).unwrap();
        assert_eq!(meta, PhotoMetadata { width: 320, height: 180 });
    }

    #[test]
    fn portrait_jpeg_is_not_transposed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("portrait.jpg");
        create_test_jpeg(&path, 120, 300);

        let meta = read_metadata(&path).unwrap();
        assert_eq!(meta.width, 120);
        assert_eq!(meta.height, 300);
    }

    #[test]
    fn png_dimensions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("shot.png");
        RgbImage::new(64, 48).save(&path).unwrap();

        let meta = read_metadata(&path).unwrap();
        assert_eq!(meta, PhotoMetadata { width: 64, height: 48 });
    }

    #[test]
    fn format_is_sniffed_from_content_not_extension() {
        let tmp = TempDir::new().unwrap();
        let png = tmp.path().join("real.png");
        RgbImage::new(40, 30).save(&png).unwrap();
        let misnamed = tmp.path().join("misnamed.dat");
        std::fs::rename(&png, &misnamed).unwrap();

        let meta = read_metadata(&misnamed).unwrap();
        assert_eq!(meta, PhotoMetadata { width: 40, height: 30 });
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = read_metadata(Path::new("/nonexistent/photo.jpg"));
        assert!(matches!(result, Err(BackendError::NotFound(_))));
    }

    #[test]
    fn text_file_is_unreadable_format() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "definitely not a photo").unwrap();

        let result = read_metadata(&path);
        assert!(matches!(result, Err(BackendError::UnreadableFormat { .. })));
    }

    #[test]
    fn corrupt_jpeg_is_unreadable_format() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"not really a jpeg at all").unwrap();

        let result = read_metadata(&path);
        assert!(matches!(result, Err(BackendError::UnreadableFormat { .. })));
    }
}
