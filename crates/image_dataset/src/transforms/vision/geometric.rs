use crate::error::DatasetError;
use crate::transforms::Transform;
use anyhow::Result;
use image::{imageops::FilterType, DynamicImage};
use serde::{Deserialize, Serialize};

// ============================================================================
// EnsureRGB
// ============================================================================
/// Forces an image into 3-channel RGB8, flattening alpha, grayscale and
/// higher bit depths.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsureRGB;

impl Transform<DynamicImage, DynamicImage> for EnsureRGB {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(match img {
            DynamicImage::ImageRgb8(_) => img,
            _ => DynamicImage::ImageRgb8(img.to_rgb8()),
        })
    }
}

// ============================================================================
// TargetSize
// ============================================================================

/// Output size of a resize as `(width, height)`.
///
/// A single number means a square: `TargetSize::from(224)` is `224x224`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TargetSizeRepr", into = "TargetSizeRepr")]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    pub(crate) fn validate(self) -> Result<Self, DatasetError> {
        if self.width == 0 || self.height == 0 {
            return Err(DatasetError::InvalidTargetSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }
}

impl From<u32> for TargetSize {
    fn from(side: u32) -> Self {
        Self::square(side)
    }
}

impl From<(u32, u32)> for TargetSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

// Config files may spell the size as `224` or `[320, 240]`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TargetSizeRepr {
    Square(u32),
    Pair(u32, u32),
}

impl From<TargetSizeRepr> for TargetSize {
    fn from(repr: TargetSizeRepr) -> Self {
        match repr {
            TargetSizeRepr::Square(side) => Self::square(side),
            TargetSizeRepr::Pair(width, height) => Self::new(width, height),
        }
    }
}

impl From<TargetSize> for TargetSizeRepr {
    fn from(size: TargetSize) -> Self {
        TargetSizeRepr::Pair(size.width, size.height)
    }
}

// ============================================================================
// Resize
// ============================================================================

/// Resizes an image to exactly the target size, ignoring the aspect ratio.
///
/// # Filter Types
/// - `Nearest`: Nearest neighbour. Never blends neighbouring values, so
///   categorical pixel data (masks, label maps) keeps its exact values.
/// - `Triangle`: Bilinear filter
/// - `CatmullRom`: Bicubic sharpening
/// - `Gaussian`: Blurring/smoothing
/// - `Lanczos3`: Lanczos with window 3
#[derive(Debug, Clone, Copy)]
pub struct Resize {
    size: TargetSize,
    filter: FilterType,
}

impl Resize {
    pub fn new(size: impl Into<TargetSize>, filter: FilterType) -> Result<Self> {
        let size: TargetSize = size.into();
        Ok(Self {
            size: size.validate()?,
            filter,
        })
    }

    /// Nearest-neighbour resize, the dataset default.
    pub fn nearest(size: impl Into<TargetSize>) -> Result<Self> {
        Self::new(size, FilterType::Nearest)
    }

    pub fn size(&self) -> TargetSize {
        self.size
    }
}

impl Transform<DynamicImage, DynamicImage> for Resize {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(img.resize_exact(self.size.width, self.size.height, self.filter))
    }
}
