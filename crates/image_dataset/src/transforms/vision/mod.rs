//! src/transforms/vision/mod.rs
//!
//! Image loading and the fixed per-item vision steps.
//!
//! ```text
//! transforms/vision/
//! ├── io.rs           → File loading (raster + DICOM), process-wide decode settings
//! ├── geometric.rs    → Spatial transformations (RGB forcing, exact resize)
//! ├── conversion.rs   → Format conversions (image → tensor)
//! └── photometric.rs  → Value rescaling (min-max, mean/std)
//! ```
//!
//! Augmentations are not provided here; callers plug their own through
//! [`crate::pipeline::TransformPipeline::set_augmentation`].

pub mod conversion;
pub mod geometric;
pub mod io;
pub mod photometric;

pub use conversion::ToTensor;
pub use geometric::{EnsureRGB, Resize, TargetSize};
pub use io::{decode_settings, init_decoding, DecodeSettings, LoadImage, SourceFormat};
pub use photometric::{MinMaxNormalize, Normalize};
