//! Map-style image datasets for supervised and self-supervised training.
//!
//! A dataset is a list of image paths plus optional labels. Each `get(i)`
//! decodes one file (raster formats or DICOM), resizes it to a fixed size,
//! runs an optional augmentation, converts every view to a channel-first
//! tensor and min-max normalizes it.
//!
//! ```ignore
//! let dataset = ImageDataset::builder(paths)
//!     .labels(["cat", "dog", "cat"])
//!     .img_size(224)
//!     .build()?;
//!
//! let (views, label) = dataset.get(0)?;
//! ```

pub mod dataset;
pub mod error;
pub mod image_set;
pub mod label;
pub mod pipeline;
pub mod readers;
pub mod sample;
pub mod transforms;

pub use dataset::{Dataset, DatasetIter, ImageSource};
pub use error::DatasetError;
pub use image_set::{ImageDataset, ImageDatasetBuilder, ImageSet};
pub use label::{ClassVocabulary, Label, LabelEncoding, UNLABELED_CLASS_INDEX};
pub use pipeline::{Augmentation, Normalization, TransformPipeline};
pub use readers::ImageDirSource;
pub use sample::{Pixels, Views};
pub use transforms::vision::{init_decoding, DecodeSettings, TargetSize};
pub use transforms::{from_fn, Transform};
