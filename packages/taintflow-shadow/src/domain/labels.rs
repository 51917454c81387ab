//! Origin labels and shared label sets

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Opaque marker identifying a data origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable set of origin labels
///
/// Sets are shared between shadow bytes through [`LabelSetRef`]; a set is
/// never mutated once built, unions always produce a new set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LabelSet {
    labels: BTreeSet<Label>,
}

/// Shared handle to a label set
pub type LabelSetRef = Arc<LabelSet>;

impl LabelSet {
    pub fn singleton(label: Label) -> Self {
        let mut labels = BTreeSet::new();
        labels.insert(label);
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: Label) -> bool {
        self.labels.contains(&label)
    }

    pub fn iter(&self) -> impl Iterator<Item = Label> + '_ {
        self.labels.iter().copied()
    }

    /// Union of two optional sets
    ///
    /// Reuses an existing handle whenever the result equals one of the
    /// inputs, so repeated unions of the same data do not allocate.
    pub fn union(a: Option<&LabelSetRef>, b: Option<&LabelSetRef>) -> Option<LabelSetRef> {
        match (a, b) {
            (None, None) => None,
            (Some(a), None) => Some(Arc::clone(a)),
            (None, Some(b)) => Some(Arc::clone(b)),
            (Some(a), Some(b)) => {
                if Arc::ptr_eq(a, b) || b.labels.is_subset(&a.labels) {
                    Some(Arc::clone(a))
                } else if a.labels.is_subset(&b.labels) {
                    Some(Arc::clone(b))
                } else {
                    let labels = a.labels.union(&b.labels).copied().collect();
                    Some(Arc::new(LabelSet { labels }))
                }
            }
        }
    }
}

impl FromIterator<Label> for LabelSet {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", label)?;
        }
        write!(f, "}}")
    }
}
