use std::{fmt::Debug, ops::RangeBounds};

use crate::{btree_base::btree::BTree, error::BTreeResult};

/// Key/value map over the B+ tree index.
pub struct BTreeMap<K, V> {
    _tree: BTree<K, V>,
}

impl<K: Ord + Clone + Debug, V> BTreeMap<K, V> {
    pub fn new() -> Self {
        Self { _tree: BTree::new() }
    }

    pub fn with_order(order: usize) -> BTreeResult<Self> {
        Ok(Self {
            _tree: BTree::with_order(order)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self._tree.is_empty()
    }

    pub fn len(&self) -> usize {
        self._tree.len()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self._tree.contains_key(key)
    }

    /// Stores `value` under `key`, returning the value it replaces.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        self._tree.insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self._tree.get(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self._tree.delete(key).ok().map(|record| record.into_parts().1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self._tree.traverse().map(|record| (record.key(), record.value()))
    }

    pub fn range<R: RangeBounds<K>>(&self, range: R) -> impl Iterator<Item = (&K, &V)> + '_ {
        self._tree
            .range(range)
            .map(|record| (record.key(), record.value()))
    }

    pub fn as_tree(&self) -> &BTree<K, V> {
        &self._tree
    }
}

impl<K: Ord + Clone + Debug, V> Default for BTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

pub type DefaultBTreeMap<K, V> = BTreeMap<K, V>;
