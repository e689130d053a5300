use crate::sample::{Pixels, Views};
use anyhow::Result;

/// A `Dataset` is a fixed-length, randomly addressable sequence of items.
///
/// This is the whole contract a training loop relies on: it asks for
/// `len()` and then for `get(i)` with `i` in `0..len()`, possibly from several
/// worker threads at once. Batching, shuffling and prefetching belong to the
/// consumer.
///
/// All implementations must be `Send + Sync` to allow for safe sharing
/// across threads.
pub trait Dataset: Send + Sync {
    /// What one retrieval yields.
    type Item;

    /// Random-access lookup by index. Out-of-range indices are an error.
    fn get(&self, index: usize) -> Result<Self::Item>;

    /// Returns total number of items.
    fn len(&self) -> usize;

    /// Checks if the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over every item in index order, decoding each one lazily.
    fn iter(&self) -> DatasetIter<'_, Self>
    where
        Self: Sized,
    {
        DatasetIter {
            dataset: self,
            next: 0,
        }
    }
}

/// Sequential iterator returned by [`Dataset::iter`].
pub struct DatasetIter<'a, D> {
    dataset: &'a D,
    next: usize,
}

impl<'a, D: Dataset> Iterator for DatasetIter<'a, D> {
    type Item = Result<D::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.dataset.len() {
            return None;
        }
        let item = self.dataset.get(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.dataset.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl<'a, D: Dataset> ExactSizeIterator for DatasetIter<'a, D> {}

/// The source-specific half of a dataset: resolves an index to an
/// unnormalized image (or several views) and its label.
///
/// [`TransformPipeline`](crate::pipeline::TransformPipeline) supplies the rest
/// (augmentation, tensor conversion, normalization), so a new kind of source
/// (in-memory arrays, remote blobs, ...) only has to implement this trait.
///
/// `decode` must be deterministic and free of side effects other than I/O.
pub trait ImageSource: Send + Sync {
    type Label;

    fn len(&self) -> usize;

    fn decode(&self, index: usize) -> Result<(Views<Pixels>, Self::Label)>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
