use std::{iter::FusedIterator, ops::Bound};

use super::{btree::BTree, node::NodeId, record::Record};

/// Walks the leaf chain forwards, starting at a given leaf slot.
pub struct Iter<'a, K, V> {
    tree: &'a BTree<K, V>,
    curr_leaf: Option<NodeId>,
    curr_slot: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(tree: &'a BTree<K, V>, leaf: NodeId, slot: usize) -> Self {
        Self {
            tree,
            curr_leaf: Some(leaf),
            curr_slot: slot,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = &'a Record<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        loop {
            let leaf = tree.leaf(self.curr_leaf?);
            if let Some(record) = leaf.records.get(self.curr_slot) {
                self.curr_slot += 1;
                return Some(record);
            }
            self.curr_leaf = leaf.next_leaf;
            self.curr_slot = 0;
        }
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Walks the leaf chain backwards. `curr_slot` is one past the record
/// returned next.
pub struct RevIter<'a, K, V> {
    tree: &'a BTree<K, V>,
    curr_leaf: Option<NodeId>,
    curr_slot: usize,
}

impl<'a, K, V> RevIter<'a, K, V> {
    pub(crate) fn new(tree: &'a BTree<K, V>, leaf: NodeId, slot: usize) -> Self {
        Self {
            tree,
            curr_leaf: Some(leaf),
            curr_slot: slot,
        }
    }
}

impl<'a, K, V> Iterator for RevIter<'a, K, V> {
    type Item = &'a Record<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        loop {
            let leaf = tree.leaf(self.curr_leaf?);
            if self.curr_slot > 0 {
                self.curr_slot -= 1;
                return leaf.records.get(self.curr_slot);
            }
            self.curr_leaf = leaf.prev_leaf;
            self.curr_slot = match leaf.prev_leaf {
                Some(prev) => tree.leaf(prev).records.len(),
                None => 0,
            };
        }
    }
}

impl<K, V> FusedIterator for RevIter<'_, K, V> {}

/// Forward walk that stops at the end bound.
pub struct Range<'a, K, V> {
    iter: Iter<'a, K, V>,
    end: Bound<K>,
}

impl<'a, K, V> Range<'a, K, V> {
    pub(crate) fn new(iter: Iter<'a, K, V>, end: Bound<K>) -> Self {
        Self { iter, end }
    }
}

impl<'a, K: Ord, V> Iterator for Range<'a, K, V> {
    type Item = &'a Record<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.iter.next()?;
        let within = match &self.end {
            Bound::Included(end) => record.key() <= end,
            Bound::Excluded(end) => record.key() < end,
            Bound::Unbounded => true,
        };

        if within {
            Some(record)
        } else {
            self.iter.curr_leaf = None;
            None
        }
    }
}

impl<K: Ord, V> FusedIterator for Range<'_, K, V> {}
