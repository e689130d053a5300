use crate::sample::Pixels;
use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use image::{DynamicImage, GenericImageView};
use tch::{Kind, Tensor};

// ============================================================================
// ToTensor
// ============================================================================

/// Converts an image to a channel-first f32 tensor in the `[0.0, 1.0]` range.
///
/// Channel Handling
/// | Input Format   | Output Shape | Scale      |
/// |----------------|--------------|------------|
/// | L8 / L16       | `[1, H, W]`  | 1/255, 1/65535 |
/// | LA8 / LA16     | `[2, H, W]`  | 1/255, 1/65535 |
/// | RGB8 / RGB16   | `[3, H, W]`  | 1/255, 1/65535 |
/// | RGBA8 / RGBA16 | `[4, H, W]`  | 1/255, 1/65535 |
/// | RGB32F / RGBA32F | `[3|4, H, W]` | unchanged |
///
/// Values that already are tensors (`Pixels::Tensor`) pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToTensor;

impl ToTensor {
    /// Reorders an interleaved `[H, W, C]` buffer into `[C, H, W]`.
    fn hwc_to_chw(tensor: Tensor, height: u32, width: u32, channels: i64) -> Result<Tensor> {
        tensor
            .f_reshape(&[height as i64, width as i64, channels])
            .and_then(|t| t.f_permute(&[2, 0, 1]))
            .context("Failed to reorder pixels into channel-first layout")
    }

    fn from_u8(raw: &[u8], height: u32, width: u32, channels: i64) -> Result<Tensor> {
        let tensor = Self::hwc_to_chw(Tensor::from_slice(raw), height, width, channels)?;
        Ok(tensor.to_kind(Kind::Float).f_div_scalar(255.0)?)
    }

    // tch has no unsigned 16-bit element type, so widen first.
    fn from_u16(raw: &[u16], height: u32, width: u32, channels: i64) -> Result<Tensor> {
        let widened: Vec<i32> = raw.iter().map(|&v| v as i32).collect();
        let tensor = Self::hwc_to_chw(Tensor::from_slice(&widened), height, width, channels)?;
        Ok(tensor.to_kind(Kind::Float).f_div_scalar(65535.0)?)
    }

    fn from_f32(raw: &[f32], height: u32, width: u32, channels: i64) -> Result<Tensor> {
        Self::hwc_to_chw(Tensor::from_slice(raw), height, width, channels)
    }
}

impl Transform<DynamicImage, Tensor> for ToTensor {
    fn apply(&self, img: DynamicImage) -> Result<Tensor> {
        let (width, height) = img.dimensions();
        ensure!(
            width > 0 && height > 0,
            "Image dimensions must be positive (got {}x{})",
            width,
            height
        );

        match img {
            DynamicImage::ImageLuma8(img) => Self::from_u8(img.as_raw(), height, width, 1),
            DynamicImage::ImageLumaA8(img) => Self::from_u8(img.as_raw(), height, width, 2),
            DynamicImage::ImageRgb8(img) => Self::from_u8(img.as_raw(), height, width, 3),
            DynamicImage::ImageRgba8(img) => Self::from_u8(img.as_raw(), height, width, 4),
            DynamicImage::ImageLuma16(img) => Self::from_u16(img.as_raw(), height, width, 1),
            DynamicImage::ImageLumaA16(img) => Self::from_u16(img.as_raw(), height, width, 2),
            DynamicImage::ImageRgb16(img) => Self::from_u16(img.as_raw(), height, width, 3),
            DynamicImage::ImageRgba16(img) => Self::from_u16(img.as_raw(), height, width, 4),
            DynamicImage::ImageRgb32F(img) => Self::from_f32(img.as_raw(), height, width, 3),
            DynamicImage::ImageRgba32F(img) => Self::from_f32(img.as_raw(), height, width, 4),
            other => {
                let rgb = other.to_rgb8();
                Self::from_u8(rgb.as_raw(), height, width, 3)
            }
        }
    }
}

impl Transform<Pixels, Tensor> for ToTensor {
    fn apply(&self, pixels: Pixels) -> Result<Tensor> {
        match pixels {
            Pixels::Image(img) => Transform::<DynamicImage, Tensor>::apply(self, img),
            Pixels::Tensor(tensor) => Ok(tensor),
        }
    }
}
