use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use tch::{Kind, Tensor};

// ============================================================================
// MinMaxNormalize
// ============================================================================

/// Linearly rescales a tensor into `[min, max]` using the tensor's own
/// minimum and maximum.
///
/// ```text
/// output = (input - input.min()) / (input.max() - input.min()) * (max - min) + min
/// ```
///
/// A constant tensor has no range to stretch and comes out filled with `min`.
/// NaN or infinite values are an error.
/// Integral tensors are promoted to f32 first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxNormalize {
    min: f64,
    max: f64,
}

impl MinMaxNormalize {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        ensure!(
            min.is_finite() && max.is_finite() && min < max,
            "Min-max bounds must be finite with min < max (got [{}, {}])",
            min,
            max
        );
        Ok(Self { min, max })
    }

    /// Rescale into `[0, 1]`.
    pub fn unit() -> Self {
        Self { min: 0.0, max: 1.0 }
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

impl Default for MinMaxNormalize {
    fn default() -> Self {
        Self::unit()
    }
}

impl Transform<Tensor, Tensor> for MinMaxNormalize {
    fn apply(&self, tensor: Tensor) -> Result<Tensor> {
        let tensor = if tensor.is_floating_point() {
            tensor
        } else {
            tensor.to_kind(Kind::Float)
        };

        let lo = tensor
            .f_min()
            .context("Cannot min-max normalize an empty tensor")?
            .double_value(&[]);
        let hi = tensor.f_max()?.double_value(&[]);
        // min/max propagate NaN, so this also catches NaN anywhere.
        ensure!(
            lo.is_finite() && hi.is_finite(),
            "Cannot min-max normalize a tensor with non-finite values (range [{}, {}])",
            lo,
            hi
        );
        let span = hi - lo;

        if span <= 0.0 {
            return Ok(tensor.f_full_like(self.min)?);
        }

        // Clamp absorbs the last-ulp rounding of the division.
        Ok(tensor
            .f_sub_scalar(lo)?
            .f_div_scalar(span)?
            .f_mul_scalar(self.max - self.min)?
            .f_add_scalar(self.min)?
            .f_clamp(self.min, self.max)?)
    }
}

// ============================================================================
// Normalize
// ============================================================================

/// Normalizes tensors using channel-wise statistics.
///
/// # Mathematical Operation:
/// ```text
/// output[c,h,w] = (input[c,h,w] - mean[c]) / std[c]
/// ```
///
/// Usable as a custom normalizer when the model expects standardized input
/// rather than min-max scaled input.
#[derive(Debug, Clone)]
pub struct Normalize {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl Normalize {
    pub fn new(mean: &[f32], std: &[f32]) -> Result<Self> {
        ensure!(!mean.is_empty(), "Normalization mean cannot be empty");
        ensure!(
            mean.len() == std.len(),
            "Mean has {} channels but std has {}",
            mean.len(),
            std.len()
        );
        ensure!(
            std.iter().all(|&s| s != 0.0),
            "Standard deviation must be non-zero for every channel"
        );
        Ok(Self {
            mean: mean.to_vec(),
            std: std.to_vec(),
        })
    }

    /// ImageNet statistics (RGB)
    pub fn imagenet() -> Self {
        Self {
            mean: vec![0.485, 0.456, 0.406],
            std: vec![0.229, 0.224, 0.225],
        }
    }
}

impl Transform<Tensor, Tensor> for Normalize {
    fn apply(&self, tensor: Tensor) -> Result<Tensor> {
        let (num_channels, _height, _width) = tensor
            .size3()
            .context("Input must be 3D tensor [C, H, W]")?;

        ensure!(
            num_channels as usize == self.mean.len(),
            "Channel count mismatch: input has {} channels but normalization expects {}",
            num_channels,
            self.mean.len()
        );

        let mean_t = Tensor::from_slice(&self.mean)
            .reshape(&[num_channels, 1, 1])
            .to_kind(tensor.kind());
        let std_t = Tensor::from_slice(&self.std)
            .reshape(&[num_channels, 1, 1])
            .to_kind(tensor.kind());

        Ok((tensor - mean_t) / std_t)
    }
}
