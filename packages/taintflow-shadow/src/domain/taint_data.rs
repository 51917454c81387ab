//! Per-byte taint record

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::labels::{Label, LabelSet, LabelSetRef};

/// Taint state of one shadow byte
///
/// A byte without labels is untainted. Its masks may still hold residue from
/// earlier operations; that residue carries no meaning and must never be
/// used to create taint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaintData {
    /// Origin labels, `None` when untainted
    pub labels: Option<LabelSetRef>,

    /// Taint compute number: count of mixing operations since the origin
    pub tcn: u32,

    /// Bit set = output bit still reversibly controlled by tainted input
    pub cb_mask: u8,

    /// Bit set = output bit known to be a literal 1 when not controlled
    pub one_mask: u8,

    /// Bit set = output bit known to be a literal 0 when not controlled
    pub zero_mask: u8,
}

impl TaintData {
    /// Freshly labelled byte: fully controlled, nothing literal
    pub fn labelled(label: Label) -> Self {
        Self {
            labels: Some(Arc::new(LabelSet::singleton(label))),
            tcn: 0,
            cb_mask: 0xFF,
            one_mask: 0,
            zero_mask: 0,
        }
    }

    /// Record carrying an existing label set
    pub fn with_labels(labels: LabelSetRef) -> Self {
        if labels.is_empty() {
            return Self::default();
        }
        Self {
            labels: Some(labels),
            tcn: 0,
            cb_mask: 0xFF,
            one_mask: 0,
            zero_mask: 0,
        }
    }

    pub fn is_tainted(&self) -> bool {
        self.labels.as_ref().map_or(false, |ls| !ls.is_empty())
    }

    /// Combine two records
    ///
    /// Labels are unioned, the compute number is the larger of the two (plus
    /// one when `increment_tcn`), controlled bits are OR-ed. Literal bits do
    /// not survive a union.
    pub fn union(a: &TaintData, b: &TaintData, increment_tcn: bool) -> TaintData {
        let mut result = TaintData {
            labels: LabelSet::union(a.labels.as_ref(), b.labels.as_ref()),
            tcn: a.tcn.max(b.tcn),
            cb_mask: a.cb_mask | b.cb_mask,
            one_mask: 0,
            zero_mask: 0,
        };
        if increment_tcn {
            result.increment_tcn();
        }
        result
    }

    pub fn increment_tcn(&mut self) {
        self.tcn = self.tcn.saturating_add(1);
    }

    pub fn label_count(&self) -> usize {
        self.labels.as_ref().map_or(0, |ls| ls.len())
    }
}

impl fmt::Display for TaintData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.labels {
            Some(ls) => write!(
                f,
                "{} tcn={} cb={:#04x} one={:#04x} zero={:#04x}",
                ls, self.tcn, self.cb_mask, self.one_mask, self.zero_mask
            ),
            None => write!(f, "{{}}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_untainted() {
        let td = TaintData::default();
        assert!(!td.is_tainted());
        assert_eq!(td.label_count(), 0);
    }

    #[test]
    fn test_labelled_is_fully_controlled() {
        let td = TaintData::labelled(Label(3));
        assert!(td.is_tainted());
        assert_eq!(td.cb_mask, 0xFF);
        assert_eq!(td.tcn, 0);
    }

    #[test]
    fn test_union_combines_labels_and_masks() {
        let mut a = TaintData::labelled(Label(1));
        a.cb_mask = 0x0F;
        a.tcn = 2;
        let mut b = TaintData::labelled(Label(2));
        b.cb_mask = 0x30;
        b.tcn = 5;
        b.one_mask = 0xC0;

        let u = TaintData::union(&a, &b, false);
        assert_eq!(u.label_count(), 2);
        assert_eq!(u.tcn, 5);
        assert_eq!(u.cb_mask, 0x3F);
        assert_eq!(u.one_mask, 0);

        let u = TaintData::union(&a, &b, true);
        assert_eq!(u.tcn, 6);
    }

    #[test]
    fn test_union_of_untainted_stays_untainted() {
        let u = TaintData::union(&TaintData::default(), &TaintData::default(), true);
        assert!(!u.is_tainted());
        assert_eq!(u.tcn, 1);
    }

    #[test]
    fn test_with_empty_labels_is_untainted() {
        let td = TaintData::with_labels(Arc::new(LabelSet::default()));
        assert!(!td.is_tainted());
    }
}
