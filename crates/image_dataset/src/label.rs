use crate::error::DatasetError;
use anyhow::Result;
use std::collections::BTreeSet;
use std::fmt::Debug;
use tch::Tensor;

/// Class index reported for every item of an unlabeled dataset.
pub const UNLABELED_CLASS_INDEX: i64 = 0;

/// The label attached to one dataset item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label<L> {
    /// The dataset has no labels; stands in for class `0` so every item has
    /// the same shape.
    Unlabeled,
    /// Position of the raw label in the class vocabulary.
    Class(usize),
    /// Raw label, passed through because no vocabulary is in use.
    Raw(L),
}

impl<L> Label<L> {
    /// Integer class index, or `None` for raw labels.
    pub fn class_index(&self) -> Option<i64> {
        match self {
            Label::Unlabeled => Some(UNLABELED_CLASS_INDEX),
            Label::Class(index) => Some(*index as i64),
            Label::Raw(_) => None,
        }
    }

    /// Scalar int64 tensor of the class index, as a classification loss expects.
    pub fn to_tensor(&self) -> Option<Tensor> {
        self.class_index().map(Tensor::from)
    }

    pub fn as_raw(&self) -> Option<&L> {
        match self {
            Label::Raw(raw) => Some(raw),
            _ => None,
        }
    }
}

/// How raw labels are turned into [`Label`]s.
#[derive(Debug, Clone)]
pub enum LabelEncoding<L> {
    /// Vocabulary is the sorted set of distinct labels.
    Derived,
    /// Vocabulary is given explicitly; its order defines the indices.
    Explicit(Vec<L>),
    /// No vocabulary; labels are emitted unchanged.
    Raw,
}

impl<L> Default for LabelEncoding<L> {
    fn default() -> Self {
        LabelEncoding::Derived
    }
}

/// Ordered, duplicate-free table mapping label values to class indices.
///
/// Fixed once built: the mapping stays stable for the life of the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassVocabulary<L> {
    classes: Vec<L>,
}

impl<L: Ord + Clone + Debug> ClassVocabulary<L> {
    /// Sorted, de-duplicated set of the given labels.
    pub fn derive<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a L>,
        L: 'a,
    {
        let classes: BTreeSet<&L> = labels.into_iter().collect();
        Self {
            classes: classes.into_iter().cloned().collect(),
        }
    }
}

impl<L: PartialEq + Debug> ClassVocabulary<L> {
    /// Uses the given order as-is. Duplicates would make the mapping
    /// ambiguous and are rejected.
    pub fn explicit(classes: Vec<L>) -> Result<Self> {
        for (i, class) in classes.iter().enumerate() {
            if classes[..i].contains(class) {
                return Err(DatasetError::DuplicateClass {
                    label: format!("{:?}", class),
                }
                .into());
            }
        }
        Ok(Self { classes })
    }

    /// Class index of `label`. Labels outside the vocabulary are an error;
    /// there is no fallback bucket.
    pub fn index_of(&self, label: &L) -> Result<usize> {
        self.classes
            .iter()
            .position(|class| class == label)
            .ok_or_else(|| {
                DatasetError::UnknownClass {
                    label: format!("{:?}", label),
                }
                .into()
            })
    }
}

impl<L> ClassVocabulary<L> {
    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_vocabulary_is_sorted_and_unique() -> Result<()> {
        let labels = vec!["dog", "cat", "dog", "bird"];
        let vocab = ClassVocabulary::derive(&labels);

        assert_eq!(vocab.classes(), &["bird", "cat", "dog"]);
        assert_eq!(vocab.index_of(&"cat")?, 1);
        assert_eq!(vocab.index_of(&"dog")?, 2);
        Ok(())
    }

    #[test]
    fn test_explicit_vocabulary_keeps_order() -> Result<()> {
        let vocab = ClassVocabulary::explicit(vec!["dog", "cat"])?;
        assert_eq!(vocab.index_of(&"dog")?, 0);
        assert_eq!(vocab.index_of(&"cat")?, 1);
        Ok(())
    }

    #[test]
    fn test_explicit_vocabulary_rejects_duplicates() {
        let err = ClassVocabulary::explicit(vec![1, 2, 1]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DatasetError>(),
            Some(&DatasetError::DuplicateClass {
                label: "1".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_label_fails() {
        let vocab = ClassVocabulary::explicit(vec!["cat"]).unwrap();
        let err = vocab.index_of(&"fox").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::UnknownClass { .. })
        ));
    }

    #[test]
    fn test_label_class_index() {
        assert_eq!(Label::<u8>::Unlabeled.class_index(), Some(0));
        assert_eq!(Label::<u8>::Class(4).class_index(), Some(4));
        assert_eq!(Label::Raw(9u8).class_index(), None);
        assert_eq!(Label::Raw(9u8).as_raw(), Some(&9));

        let t = Label::<u8>::Class(3).to_tensor().unwrap();
        assert_eq!(t.int64_value(&[]), 3);
    }
}
