use std::mem::size_of;

use super::record::Record;
use crate::error::{BTreeError, BTreeResult};

const fn _max(a: usize, b: usize) -> usize {
    [a, b][(a < b) as usize]
}

/// Node capacities and checking behaviour, fixed when the tree is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BTreeConfig {
    order: usize,
    binsearch_threshold: usize,
    self_verify: bool,
}

impl BTreeConfig {
    pub const MIN_ORDER: usize = 2;
    pub const DEFAULT_BINSEARCH_THRESHOLD: usize = 16;

    /// `order` is the largest number of keys a node may hold before it has
    /// to split.
    pub fn new(order: usize) -> BTreeResult<Self> {
        if order < Self::MIN_ORDER {
            return Err(BTreeError::InvalidOrder(order));
        }

        Ok(Self {
            order,
            binsearch_threshold: Self::DEFAULT_BINSEARCH_THRESHOLD,
            self_verify: false,
        })
    }

    /// Sizes nodes so a full leaf occupies roughly 256 bytes of records.
    pub fn for_types<K, V>() -> Self {
        Self {
            order: _max(8, 256 / _max(1, size_of::<Record<K, V>>())),
            binsearch_threshold: Self::DEFAULT_BINSEARCH_THRESHOLD,
            self_verify: false,
        }
    }

    /// Nodes holding more than `threshold` keys are searched by bisection,
    /// smaller ones by a linear scan.
    pub fn with_binsearch_threshold(mut self, threshold: usize) -> Self {
        self.binsearch_threshold = threshold;
        self
    }

    /// Run the full structural check after every insert and delete.
    pub fn with_self_verify(mut self, self_verify: bool) -> Self {
        self.self_verify = self_verify;
        self
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    #[inline]
    pub fn binsearch_threshold(&self) -> usize {
        self.binsearch_threshold
    }

    #[inline]
    pub fn self_verify(&self) -> bool {
        self.self_verify
    }

    #[inline]
    pub fn leaf_slotmax(&self) -> usize {
        self.order
    }

    #[inline]
    pub fn inner_slotmax(&self) -> usize {
        self.order
    }

    #[inline]
    pub fn leaf_slotmin(&self) -> usize {
        (self.order + 1) / 2
    }

    /// An inner split hands one of its `order + 1` keys to the parent, so
    /// the two halves can only guarantee `order / 2` keys each.
    #[inline]
    pub fn inner_slotmin(&self) -> usize {
        self.order / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_orders() {
        assert_eq!(BTreeConfig::for_types::<u64, u64>().order(), 16);
        assert_eq!(BTreeConfig::for_types::<u8, ()>().order(), 256);
        assert_eq!(BTreeConfig::for_types::<[u8; 512], ()>().order(), 8);
    }

    #[test]
    fn test_rejects_small_orders() {
        assert_eq!(BTreeConfig::new(0), Err(BTreeError::InvalidOrder(0)));
        assert_eq!(BTreeConfig::new(1), Err(BTreeError::InvalidOrder(1)));
        assert!(BTreeConfig::new(2).is_ok());
    }

    #[test]
    fn test_slot_bounds() {
        let odd = BTreeConfig::new(3).unwrap();
        assert_eq!((odd.leaf_slotmin(), odd.inner_slotmin()), (2, 1));

        let even = BTreeConfig::new(4).unwrap();
        assert_eq!((even.leaf_slotmin(), even.inner_slotmin()), (2, 2));

        let smallest = BTreeConfig::new(2).unwrap();
        assert_eq!((smallest.leaf_slotmin(), smallest.inner_slotmin()), (1, 1));
    }
}
