//! src/image_set.rs
//!
//! Path-based image source and the builder that assembles it into a full
//! dataset.
//!
//! ```ignore
//! let dataset = ImageDataset::builder(paths)
//!     .labels(vec!["cat", "dog", "cat"])
//!     .img_size(224)
//!     .normalize(true)
//!     .build()?;
//!
//! let (views, label) = dataset.get(0)?;
//! assert_eq!(label.class_index(), Some(0));
//! ```

use crate::dataset::ImageSource;
use crate::error::DatasetError;
use crate::label::{ClassVocabulary, Label, LabelEncoding};
use crate::pipeline::{Augmentation, Normalization, TransformPipeline};
use crate::sample::{Pixels, Views};
use crate::transforms::vision::{DecodeSettings, LoadImage, Resize, TargetSize};
use crate::transforms::Transform;
use anyhow::{Context, Result};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A fixed-size view over image files plus optional labels.
///
/// Every retrieval re-reads the file from disk: nothing is cached, and no
/// state changes after construction.
#[derive(Debug)]
pub struct ImageSet<L> {
    paths: Vec<PathBuf>,
    labels: Option<Vec<L>>,
    vocabulary: Option<ClassVocabulary<L>>,
    resize: Option<Resize>,
    loader: LoadImage,
}

/// Path-based images run through the standard transform pipeline.
pub type ImageDataset<L> = TransformPipeline<ImageSet<L>>;

impl<L> ImageSet<L> {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn labels(&self) -> Option<&[L]> {
        self.labels.as_deref()
    }

    /// The class vocabulary in index order, if labels are encoded.
    pub fn class_names(&self) -> Option<&[L]> {
        self.vocabulary.as_ref().map(ClassVocabulary::classes)
    }

    pub fn target_size(&self) -> Option<TargetSize> {
        self.resize.map(|r| r.size())
    }
}

impl<L> ImageSet<L>
where
    L: PartialEq + Clone + Debug,
{
    fn resolve_label(&self, index: usize) -> Result<Label<L>> {
        let Some(labels) = &self.labels else {
            return Ok(Label::Unlabeled);
        };
        let raw = &labels[index];
        match &self.vocabulary {
            Some(vocabulary) => Ok(Label::Class(vocabulary.index_of(raw)?)),
            None => Ok(Label::Raw(raw.clone())),
        }
    }

    fn load(&self, path: &Path) -> Result<Pixels> {
        let image = self.loader.apply(path.to_path_buf())?;
        let image = match &self.resize {
            Some(resize) => resize.apply(image)?,
            None => image,
        };
        Ok(Pixels::Image(image))
    }
}

impl<L> ImageSource for ImageSet<L>
where
    L: PartialEq + Clone + Debug + Send + Sync,
{
    type Label = Label<L>;

    fn len(&self) -> usize {
        self.paths.len()
    }

    fn decode(&self, index: usize) -> Result<(Views<Pixels>, Label<L>)> {
        let path = self.paths.get(index).ok_or(DatasetError::IndexOutOfRange {
            index,
            len: self.paths.len(),
        })?;
        debug!(index, path = %path.display(), "decoding item");

        let pixels = self.load(path)?;
        let label = self
            .resolve_label(index)
            .with_context(|| format!("Failed to encode label of {}", path.display()))?;
        Ok((Views::Single(pixels), label))
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Collects the dataset options, validates them and resolves everything that
/// is fixed for the dataset's lifetime (class vocabulary, normalizer).
///
/// Starts unlabeled; [`labels`](Self::labels) switches the label type.
pub struct ImageDatasetBuilder<L> {
    paths: Vec<PathBuf>,
    labels: Option<Vec<L>>,
    encoding: LabelEncoding<L>,
    target_size: Option<TargetSize>,
    augmentation: Option<Augmentation>,
    normalization: Normalization,
    decode_settings: Option<DecodeSettings>,
}

impl TransformPipeline<ImageSet<()>> {
    /// Starts a builder over `paths`, one item per path in the given order.
    pub fn builder<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> ImageDatasetBuilder<()> {
        ImageDatasetBuilder {
            paths: paths.into_iter().map(Into::into).collect(),
            labels: None,
            encoding: LabelEncoding::Derived,
            target_size: None,
            augmentation: None,
            normalization: Normalization::default(),
            decode_settings: None,
        }
    }
}

impl<L> ImageDatasetBuilder<L> {
    /// Attaches one raw label per path. By default the class vocabulary is
    /// derived as the sorted set of distinct labels.
    ///
    /// A preceding [`raw_labels`](Self::raw_labels) carries over. Class names
    /// given earlier are typed for the old label type and are dropped, so
    /// call [`class_names`](Self::class_names) after this.
    pub fn labels<M>(self, labels: impl IntoIterator<Item = M>) -> ImageDatasetBuilder<M> {
        let encoding = match self.encoding {
            LabelEncoding::Raw => LabelEncoding::Raw,
            LabelEncoding::Derived | LabelEncoding::Explicit(_) => LabelEncoding::Derived,
        };
        ImageDatasetBuilder {
            paths: self.paths,
            labels: Some(labels.into_iter().collect()),
            encoding,
            target_size: self.target_size,
            augmentation: self.augmentation,
            normalization: self.normalization,
            decode_settings: self.decode_settings,
        }
    }

    /// Explicit class vocabulary; its order defines the class indices.
    pub fn class_names(mut self, class_names: impl IntoIterator<Item = L>) -> Self {
        self.encoding = LabelEncoding::Explicit(class_names.into_iter().collect());
        self
    }

    /// Emit labels unchanged instead of encoding them as class indices.
    pub fn raw_labels(mut self) -> Self {
        self.encoding = LabelEncoding::Raw;
        self
    }

    /// Resize every image to exactly this size (nearest neighbour).
    /// A single number means a square.
    pub fn img_size(mut self, size: impl Into<TargetSize>) -> Self {
        self.target_size = Some(size.into());
        self
    }

    pub fn augmentation<A>(mut self, augmentation: A) -> Self
    where
        A: Transform<Views<Pixels>, Views<Pixels>> + 'static,
    {
        self.augmentation = Some(Arc::new(augmentation));
        self
    }

    /// `true` (the default) for min-max into `[0, 1]`, `false` for none, or
    /// any [`Normalization`].
    pub fn normalize(mut self, normalization: impl Into<Normalization>) -> Self {
        self.normalization = normalization.into();
        self
    }

    /// Overrides the process-wide decode settings for this dataset only.
    pub fn decode_settings(mut self, settings: DecodeSettings) -> Self {
        self.decode_settings = Some(settings);
        self
    }
}

impl<L> ImageDatasetBuilder<L>
where
    L: Ord + Clone + Debug + Send + Sync + 'static,
{
    /// Builds the source alone, without the transform pipeline.
    pub fn build_source(self) -> Result<ImageSet<L>> {
        Ok(self.split()?.0)
    }

    pub fn build(self) -> Result<ImageDataset<L>> {
        let (source, augmentation, normalization) = self.split()?;
        let mut dataset = TransformPipeline::new(source, normalization)?;
        dataset.set_augmentation(augmentation);
        Ok(dataset)
    }

    fn split(self) -> Result<(ImageSet<L>, Option<Augmentation>, Normalization)> {
        if let Some(labels) = &self.labels {
            if labels.len() != self.paths.len() {
                return Err(DatasetError::LengthMismatch {
                    paths: self.paths.len(),
                    labels: labels.len(),
                }
                .into());
            }
        }

        let vocabulary = match (&self.labels, self.encoding) {
            (None, _) | (Some(_), LabelEncoding::Raw) => None,
            (Some(labels), LabelEncoding::Derived) => Some(ClassVocabulary::derive(labels)),
            (Some(_), LabelEncoding::Explicit(classes)) => {
                Some(ClassVocabulary::explicit(classes)?)
            }
        };

        let resize = self.target_size.map(|size| Resize::nearest(size)).transpose()?;
        let loader = match self.decode_settings {
            Some(settings) => LoadImage::with_settings(settings),
            None => LoadImage::new(),
        };

        info!(
            items = self.paths.len(),
            labeled = self.labels.is_some(),
            classes = ?vocabulary.as_ref().map(ClassVocabulary::len),
            target_size = ?self.target_size,
            "built image set"
        );

        let source = ImageSet {
            paths: self.paths,
            labels: self.labels,
            vocabulary,
            resize,
            loader,
        };
        Ok((source, self.augmentation, self.normalization))
    }
}
