use super::geometric::EnsureRGB;
use crate::error::DatasetError;
use crate::transforms::Transform;
use anyhow::{anyhow, Context, Result};
use dicom_pixeldata::PixelDecoder;
use image::{
    ColorType, DynamicImage, ImageBuffer, ImageDecoder, ImageError, ImageReader, Luma, LumaA,
    Rgb, Rgba,
};
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

// ============================================================================
// Process-wide decode settings
// ============================================================================

/// Decoder behaviour shared by every loader in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeSettings {
    /// Keep images whose pixel stream ends early. The rows decoded before
    /// the end of the file are kept, the rest is zero-filled. The header
    /// must still be readable, and corrupt data (bad checksums, invalid
    /// codes) fails either way.
    ///
    /// Only decoders that report the early end as an error are affected.
    /// The JPEG decoder pads missing data on its own, so a cut JPEG loads
    /// in both modes.
    pub tolerate_truncated: bool,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            tolerate_truncated: true,
        }
    }
}

static DECODE_SETTINGS: OnceLock<DecodeSettings> = OnceLock::new();

/// Sets the process-wide decode settings. Call once during start-up, before
/// any dataset is built.
///
/// Repeating the call with identical settings is a no-op. Different settings
/// after the first call (or after the first load, which locks in the
/// default) fail with [`DatasetError::AlreadyInitialized`].
pub fn init_decoding(settings: DecodeSettings) -> Result<()> {
    let current = *DECODE_SETTINGS.get_or_init(|| settings);
    if current != settings {
        return Err(DatasetError::AlreadyInitialized.into());
    }
    Ok(())
}

/// Current process-wide settings, locking in the default if none were set.
pub fn decode_settings() -> DecodeSettings {
    *DECODE_SETTINGS.get_or_init(DecodeSettings::default)
}

// ============================================================================
// Format detection
// ============================================================================

/// The two on-disk layouts the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Anything the `image` crate can open (PNG, JPEG, TIFF, ...).
    Raster,
    /// DICOM file carrying a pixel data element.
    Dicom,
}

impl SourceFormat {
    /// Picks the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let is_dicom = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("dcm"));
        if is_dicom {
            SourceFormat::Dicom
        } else {
            SourceFormat::Raster
        }
    }
}

// ============================================================================
// LoadImage
// ============================================================================

/// Loads an image file from disk as RGB8.
///
/// `.dcm` files go through DICOM parsing and decode the first frame of their
/// pixel data; every other path is opened with the `image` crate, the format
/// being guessed from the file content. Both branches end in 3-channel RGB.
///
/// # Example
/// ```ignore
/// let loader = LoadImage::new();
/// let image = loader.apply(PathBuf::from("scan.dcm"))?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LoadImage {
    settings: DecodeSettings,
}

impl LoadImage {
    /// Creates a loader that follows the process-wide [`DecodeSettings`].
    pub fn new() -> Self {
        Self::with_settings(decode_settings())
    }

    /// Creates a loader with its own settings, bypassing the process-wide ones.
    pub fn with_settings(settings: DecodeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> DecodeSettings {
        self.settings
    }

    fn load_dicom(&self, path: &Path) -> Result<DynamicImage> {
        let object = dicom_object::open_file(path)
            .with_context(|| format!("Failed to read DICOM file: {}", path.display()))?;
        let pixel_data = object
            .decode_pixel_data()
            .with_context(|| format!("Failed to decode DICOM pixel data: {}", path.display()))?;
        let frame = pixel_data
            .to_dynamic_image(0)
            .with_context(|| format!("Failed to convert DICOM frame: {}", path.display()))?;
        Ok(frame)
    }

    fn load_raster(&self, path: &Path) -> Result<DynamicImage> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?;
        let decoder = ImageReader::new(BufReader::new(file))
            .with_guessed_format()
            .with_context(|| format!("Failed to read image: {}", path.display()))?
            .into_decoder()
            .with_context(|| format!("Failed to decode image header: {}", path.display()))?;

        let (width, height) = decoder.dimensions();
        let color = decoder.color_type();
        let mut buffer = vec![0u8; decoder.total_bytes() as usize];

        match decoder.read_image(&mut buffer) {
            Ok(()) => {}
            Err(err) if self.settings.tolerate_truncated && is_truncation(&err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "image data ends early, keeping the partially decoded pixels"
                );
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to decode image: {}", path.display()))
            }
        }

        image_from_raw(width, height, color, buffer)
            .with_context(|| format!("Failed to assemble image: {}", path.display()))
    }
}

impl Default for LoadImage {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform<PathBuf, DynamicImage> for LoadImage {
    fn apply(&self, path: PathBuf) -> Result<DynamicImage> {
        let format = SourceFormat::from_path(&path);
        debug!(path = %path.display(), ?format, "loading image");
        let image = match format {
            SourceFormat::Dicom => self.load_dicom(&path)?,
            SourceFormat::Raster => self.load_raster(&path)?,
        };
        EnsureRGB.apply(image)
    }
}

/// Whether a decode error means the data ended early, as opposed to data
/// that is present but invalid. Depending on the decoder, the early end
/// surfaces as an `UnexpectedEof` I/O error (possibly wrapped) or as a
/// format error saying so.
fn is_truncation(err: &ImageError) -> bool {
    match err {
        ImageError::IoError(io_err) => io_err.kind() == io::ErrorKind::UnexpectedEof,
        ImageError::Decoding(decoding) => {
            let mut source = decoding.source();
            while let Some(inner) = source {
                if let Some(io_err) = inner.downcast_ref::<io::Error>() {
                    if io_err.kind() == io::ErrorKind::UnexpectedEof {
                        return true;
                    }
                }
                source = inner.source();
            }
            let message = decoding.to_string().to_lowercase();
            message.contains("unexpected end") || message.contains("unexpected eof")
        }
        _ => false,
    }
}

/// Rebuilds a `DynamicImage` from a decoder's native byte buffer.
fn image_from_raw(width: u32, height: u32, color: ColorType, buf: Vec<u8>) -> Result<DynamicImage> {
    let size_error = || anyhow!("Pixel buffer does not match {}x{} {:?}", width, height, color);
    let image = match color {
        ColorType::L8 => DynamicImage::ImageLuma8(
            ImageBuffer::<Luma<u8>, _>::from_raw(width, height, buf).ok_or_else(size_error)?,
        ),
        ColorType::La8 => DynamicImage::ImageLumaA8(
            ImageBuffer::<LumaA<u8>, _>::from_raw(width, height, buf).ok_or_else(size_error)?,
        ),
        ColorType::Rgb8 => DynamicImage::ImageRgb8(
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buf).ok_or_else(size_error)?,
        ),
        ColorType::Rgba8 => DynamicImage::ImageRgba8(
            ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, buf).ok_or_else(size_error)?,
        ),
        ColorType::L16 => DynamicImage::ImageLuma16(
            ImageBuffer::<Luma<u16>, _>::from_raw(width, height, widen::<u16>(&buf))
                .ok_or_else(size_error)?,
        ),
        ColorType::La16 => DynamicImage::ImageLumaA16(
            ImageBuffer::<LumaA<u16>, _>::from_raw(width, height, widen::<u16>(&buf))
                .ok_or_else(size_error)?,
        ),
        ColorType::Rgb16 => DynamicImage::ImageRgb16(
            ImageBuffer::<Rgb<u16>, _>::from_raw(width, height, widen::<u16>(&buf))
                .ok_or_else(size_error)?,
        ),
        ColorType::Rgba16 => DynamicImage::ImageRgba16(
            ImageBuffer::<Rgba<u16>, _>::from_raw(width, height, widen::<u16>(&buf))
                .ok_or_else(size_error)?,
        ),
        ColorType::Rgb32F => DynamicImage::ImageRgb32F(
            ImageBuffer::<Rgb<f32>, _>::from_raw(width, height, widen::<f32>(&buf))
                .ok_or_else(size_error)?,
        ),
        ColorType::Rgba32F => DynamicImage::ImageRgba32F(
            ImageBuffer::<Rgba<f32>, _>::from_raw(width, height, widen::<f32>(&buf))
                .ok_or_else(size_error)?,
        ),
        other => return Err(anyhow!("Unsupported color type {:?}", other)),
    };
    Ok(image)
}

// Decoders write native-endian samples; the byte buffer has no alignment
// guarantee, hence the copying cast.
fn widen<T: bytemuck::Pod>(buf: &[u8]) -> Vec<T> {
    bytemuck::pod_collect_to_vec(buf)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage, RgbaImage};
    use tempfile::tempdir;

    fn checkerboard(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        })
    }

    #[test]
    fn test_source_format_from_extension() {
        assert_eq!(SourceFormat::from_path(Path::new("a/scan.dcm")), SourceFormat::Dicom);
        assert_eq!(SourceFormat::from_path(Path::new("a/scan.DCM")), SourceFormat::Dicom);
        assert_eq!(SourceFormat::from_path(Path::new("a/photo.png")), SourceFormat::Raster);
        assert_eq!(SourceFormat::from_path(Path::new("a/dcm")), SourceFormat::Raster);
        assert_eq!(SourceFormat::from_path(Path::new("a/scan.dcm.png")), SourceFormat::Raster);
    }

    #[test]
    fn test_load_raster_forces_rgb() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("rgba.png");
        RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 40])).save(&path)?;

        let loaded = LoadImage::new().apply(path)?;
        assert!(matches!(loaded, DynamicImage::ImageRgb8(_)));
        assert_eq!(loaded.dimensions(), (3, 2));
        assert_eq!(loaded.to_rgb8().get_pixel(0, 0), &Rgb([10, 20, 30]));
        Ok(())
    }

    #[test]
    fn test_format_is_guessed_from_content() -> Result<()> {
        let dir = tempdir()?;
        let png_path = dir.path().join("board.png");
        checkerboard(4, 4).save(&png_path)?;
        let renamed = dir.path().join("board.img");
        std::fs::rename(&png_path, &renamed)?;

        let loaded = LoadImage::new().apply(renamed)?;
        assert_eq!(loaded.to_rgb8(), checkerboard(4, 4));
        Ok(())
    }

    #[test]
    fn test_dicom_extension_never_opens_as_raster() -> Result<()> {
        // A valid PNG behind a `.dcm` name must be handed to the DICOM reader,
        // which rejects it.
        let dir = tempdir()?;
        let path = dir.path().join("scan.dcm");
        checkerboard(4, 4).save_with_format(&path, image::ImageFormat::Png)?;

        let err = LoadImage::new().apply(path).unwrap_err();
        assert!(format!("{:#}", err).contains("DICOM"));
        Ok(())
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = LoadImage::new()
            .apply(PathBuf::from("does/not/exist.png"))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("does/not/exist.png"));
    }

    #[test]
    fn test_image_from_raw_rejects_short_buffer() {
        assert!(image_from_raw(4, 4, ColorType::Rgb8, vec![0; 10]).is_err());
    }

    #[test]
    fn test_only_early_end_counts_as_truncation() {
        let eof = ImageError::IoError(io::Error::new(io::ErrorKind::UnexpectedEof, "short read"));
        assert!(is_truncation(&eof));

        let denied = ImageError::IoError(io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
        assert!(!is_truncation(&denied));

        let unsupported = ImageError::Unsupported(
            image::error::UnsupportedError::from_format_and_kind(
                image::error::ImageFormatHint::Unknown,
                image::error::UnsupportedErrorKind::GenericFeature("interlace".into()),
            ),
        );
        assert!(!is_truncation(&unsupported));

        let png = image::error::ImageFormatHint::Exact(image::ImageFormat::Png);
        let cut = ImageError::Decoding(image::error::DecodingError::new(
            png.clone(),
            "Unexpected end of data before image end.",
        ));
        assert!(is_truncation(&cut));

        let crc = ImageError::Decoding(image::error::DecodingError::new(
            png,
            "CRC error: expected 0x6d09df32 have 0x4b87f19b while decoding IDAT chunk.",
        ));
        assert!(!is_truncation(&crc));
    }

    #[test]
    fn test_init_decoding_is_set_once() -> Result<()> {
        let current = decode_settings();
        init_decoding(current)?;

        let flipped = DecodeSettings {
            tolerate_truncated: !current.tolerate_truncated,
        };
        let err = init_decoding(flipped).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DatasetError>(),
            Some(&DatasetError::AlreadyInitialized)
        );
        assert_eq!(decode_settings(), current);
        Ok(())
    }
}
