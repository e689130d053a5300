//! src/pipeline.rs
//!
//! The fixed per-item transform sequence shared by every image source.
//!
//! ```text
//!   index ──► ImageSource::decode ──► augmentation (optional, whole item)
//!                                          │
//!                      ┌───────────────────┘
//!                      ▼
//!          per view: ToTensor ──► normalizer (optional)  ──►  (Views<Tensor>, label)
//! ```
//!
//! The source decides *where* pixels come from; the pipeline decides *what
//! happens to them*, always in this order.

use crate::dataset::{Dataset, ImageSource};
use crate::error::DatasetError;
use crate::sample::{Pixels, Views};
use crate::transforms::vision::{MinMaxNormalize, ToTensor};
use crate::transforms::Transform;
use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use tch::Tensor;

/// Caller-supplied augmentation. It receives the whole item (single view or
/// all views) and may return either shape.
pub type Augmentation = Arc<dyn Transform<Views<Pixels>, Views<Pixels>>>;

type Normalizer = Box<dyn Transform<Tensor, Tensor>>;

/// How tensors are normalized after conversion.
pub enum Normalization {
    /// Leave the converted tensor as is.
    None,
    /// Min-max rescale into `[min, max]`.
    MinMax { min: f64, max: f64 },
    /// Any shape-preserving tensor function.
    Custom(Normalizer),
}

impl Normalization {
    pub fn custom<T>(normalizer: T) -> Self
    where
        T: Transform<Tensor, Tensor> + 'static,
    {
        Normalization::Custom(Box::new(normalizer))
    }

    fn resolve(self) -> Result<Option<Normalizer>> {
        Ok(match self {
            Normalization::None => None,
            Normalization::MinMax { min, max } => {
                let normalizer: Normalizer = Box::new(MinMaxNormalize::new(min, max)?);
                Some(normalizer)
            }
            Normalization::Custom(normalizer) => Some(normalizer),
        })
    }
}

/// Min-max into `[0, 1]`.
impl Default for Normalization {
    fn default() -> Self {
        Normalization::MinMax { min: 0.0, max: 1.0 }
    }
}

/// `true` selects the default min-max normalization, `false` disables it.
impl From<bool> for Normalization {
    fn from(enabled: bool) -> Self {
        if enabled {
            Normalization::default()
        } else {
            Normalization::None
        }
    }
}

impl fmt::Debug for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalization::None => f.write_str("None"),
            Normalization::MinMax { min, max } => f
                .debug_struct("MinMax")
                .field("min", min)
                .field("max", max)
                .finish(),
            Normalization::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Runs decode → augment → normalize for one item of an [`ImageSource`].
///
/// Retrieval only needs `&self`, so a pipeline can be shared between worker
/// threads behind an `Arc`. Swapping the augmentation needs `&mut self`,
/// which rules out a swap while retrievals are in flight.
pub struct TransformPipeline<S> {
    source: S,
    augmentation: Option<Augmentation>,
    normalizer: Option<Normalizer>,
}

impl<S: ImageSource> TransformPipeline<S> {
    /// Wraps `source`, resolving `normalization` once.
    pub fn new(source: S, normalization: Normalization) -> Result<Self> {
        Ok(Self {
            source,
            augmentation: None,
            normalizer: normalization.resolve()?,
        })
    }

    pub fn with_augmentation<A>(mut self, augmentation: A) -> Self
    where
        A: Transform<Views<Pixels>, Views<Pixels>> + 'static,
    {
        self.augmentation = Some(Arc::new(augmentation));
        self
    }

    /// Replaces the augmentation (`None` disables it). Applies from the next
    /// retrieval on, e.g. to switch augmentation on after a warm-up phase.
    pub fn set_augmentation(&mut self, augmentation: Option<Augmentation>) {
        self.augmentation = augmentation;
    }

    pub fn has_augmentation(&self) -> bool {
        self.augmentation.is_some()
    }

    pub fn has_normalizer(&self) -> bool {
        self.normalizer.is_some()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Produces the item at `index`: one tensor per view plus the label from
    /// the source, unchanged. Nothing is caught; any stage failing fails the
    /// retrieval.
    pub fn get_item(&self, index: usize) -> Result<(Views<Tensor>, S::Label)> {
        let (raw, label) = self.source.decode(index)?;
        let raw = match &self.augmentation {
            Some(augmentation) => augmentation.apply(raw)?,
            None => raw,
        };
        let tensors = raw.try_map(|view| self.normalize(view))?;
        Ok((tensors, label))
    }

    fn normalize(&self, pixels: Pixels) -> Result<Tensor> {
        let tensor = Transform::<Pixels, Tensor>::apply(&ToTensor, pixels)?;
        let Some(normalizer) = &self.normalizer else {
            return Ok(tensor);
        };

        let expected = tensor.size();
        let normalized = normalizer.apply(tensor)?;
        let actual = normalized.size();
        if actual != expected {
            return Err(DatasetError::ShapeMismatch { expected, actual }.into());
        }
        Ok(normalized)
    }
}

impl<S: ImageSource> Dataset for TransformPipeline<S> {
    type Item = (Views<Tensor>, S::Label);

    fn get(&self, index: usize) -> Result<Self::Item> {
        self.get_item(index)
    }

    fn len(&self) -> usize {
        self.source.len()
    }
}
