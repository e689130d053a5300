use anyhow::Result;
use image::{DynamicImage, GenericImageView};
use tch::Tensor;

/// One image-like value flowing through the pipeline.
///
/// Sources usually hand out decoded images; augmentations are free to return
/// either variant, so the pipeline accepts both and converts images to tensors
/// right before normalization.
#[derive(Debug)]
pub enum Pixels {
    Image(DynamicImage),
    Tensor(Tensor),
}

/// Creates a shallow clone: tensors share storage, images are copied.
impl Clone for Pixels {
    fn clone(&self) -> Self {
        match self {
            Pixels::Image(img) => Pixels::Image(img.clone()),
            Pixels::Tensor(t) => Pixels::Tensor(t.shallow_clone()),
        }
    }
}

impl Pixels {
    /// Spatial size as `(width, height)`.
    /// Tensors are assumed to be channel-first (`[.., H, W]`).
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Pixels::Image(img) => Some(img.dimensions()),
            Pixels::Tensor(t) => {
                let size = t.size();
                match size.as_slice() {
                    [.., h, w] => Some((*w as u32, *h as u32)),
                    _ => None,
                }
            }
        }
    }

    pub fn as_image(&self) -> Option<&DynamicImage> {
        match self {
            Pixels::Image(img) => Some(img),
            Pixels::Tensor(_) => None,
        }
    }

    pub fn into_image(self) -> Option<DynamicImage> {
        match self {
            Pixels::Image(img) => Some(img),
            Pixels::Tensor(_) => None,
        }
    }
}

impl From<DynamicImage> for Pixels {
    fn from(img: DynamicImage) -> Self {
        Pixels::Image(img)
    }
}

impl From<Tensor> for Pixels {
    fn from(t: Tensor) -> Self {
        Pixels::Tensor(t)
    }
}

/// A dataset item's image payload: one view, or several views of the same
/// item (paired crops for contrastive training, multi-crop, ...).
///
/// Order and length of `Multi` are preserved by every pipeline stage.
#[derive(Debug, Clone)]
pub enum Views<T> {
    Single(T),
    Multi(Vec<T>),
}

impl<T> Views<T> {
    pub fn len(&self) -> usize {
        match self {
            Views::Single(_) => 1,
            Views::Multi(views) => views.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Views::Multi(_))
    }

    /// Applies `f` to every view, stopping at the first error.
    pub fn try_map<U, F>(self, mut f: F) -> Result<Views<U>>
    where
        F: FnMut(T) -> Result<U>,
    {
        Ok(match self {
            Views::Single(view) => Views::Single(f(view)?),
            Views::Multi(views) => {
                Views::Multi(views.into_iter().map(f).collect::<Result<Vec<_>>>()?)
            }
        })
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Views::Single(view) => vec![view],
            Views::Multi(views) => views,
        }
    }

    /// Returns the single view, or `None` for a multi-view item.
    pub fn into_single(self) -> Option<T> {
        match self {
            Views::Single(view) => Some(view),
            Views::Multi(_) => None,
        }
    }
}

impl<T> From<T> for Views<T> {
    fn from(view: T) -> Self {
        Views::Single(view)
    }
}
