use std::{
    collections::VecDeque,
    fmt::{self, Debug, Display},
    mem,
    ops::{Bound, RangeBounds},
};

use super::{
    config::BTreeConfig,
    deletion::{DeletionResult, DeletionResultFlags},
    iter::{Iter, Range, RevIter},
    node::{InnerNode, LeafNode, Node, NodeId, NodeImpl},
    record::Record,
    tree_stats::TreeStats,
};
use crate::error::{BTreeError, BTreeResult};

/// B+ tree index. Every node lives in an arena owned by the tree; parents
/// hold the handles of their children and leaves are chained in key order.
pub struct BTree<K, V> {
    root_: NodeId,
    head_leaf_: NodeId,
    tail_leaf_: NodeId,
    nodes: Vec<Option<Node<K, V>>>,
    free_list: Vec<NodeId>,
    stats_: TreeStats,
    config: BTreeConfig,
}

/// Construction
impl<K: Ord + Clone + Debug, V> BTree<K, V> {
    /// Empty tree with node capacities derived from the key and value types.
    pub fn new() -> Self {
        Self::with_config(BTreeConfig::for_types::<K, V>())
    }

    pub fn with_order(order: usize) -> BTreeResult<Self> {
        Ok(Self::with_config(BTreeConfig::new(order)?))
    }

    pub fn with_config(config: BTreeConfig) -> Self {
        let mut tree = Self {
            root_: 0,
            head_leaf_: 0,
            tail_leaf_: 0,
            nodes: Vec::new(),
            free_list: Vec::new(),
            stats_: TreeStats::new(config.leaf_slotmax()),
            config,
        };
        let root = tree.new_leaf(Vec::new());
        tree.root_ = root;
        tree.head_leaf_ = root;
        tree.tail_leaf_ = root;

        tree
    }

    /// Drops every record and returns to a single empty leaf.
    pub fn clear(&mut self) {
        *self = Self::with_config(self.config);
    }
}

impl<K: Ord + Clone + Debug, V> Default for BTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// node object allocation and deallocation functions
impl<K, V> BTree<K, V> {
    fn alloc_node(&mut self, node: Node<K, V>) -> NodeId {
        match self.free_list.pop() {
            Some(id) => {
                debug_assert!(self.nodes[id].is_none());
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn new_leaf(&mut self, records: Vec<Record<K, V>>) -> NodeId {
        self.stats_.leaves += 1;
        self.alloc_node(Node::new_leaf(records))
    }

    fn new_inner(&mut self, level: u16, slotkey: Vec<K>, childid: Vec<NodeId>) -> NodeId {
        self.stats_.inner_nodes += 1;
        self.alloc_node(Node::new_inner(level, slotkey, childid))
    }

    /// Takes the node out of the arena; its handle becomes reusable.
    fn free_node(&mut self, id: NodeId) -> Node<K, V> {
        let node = match self.nodes.get_mut(id).and_then(Option::take) {
            Some(node) => node,
            None => panic!("BTree::free_node: node {} is not allocated", id),
        };
        if node.is_leafnode() {
            self.stats_.leaves -= 1;
        } else {
            self.stats_.inner_nodes -= 1;
        }
        self.free_list.push(id);

        node
    }

    fn try_node(&self, id: NodeId) -> Option<&Node<K, V>> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node<K, V> {
        match self.try_node(id) {
            Some(node) => node,
            None => panic!("BTree: dangling node handle {}", id),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        match self.nodes.get_mut(id).and_then(Option::as_mut) {
            Some(node) => node,
            None => panic!("BTree: dangling node handle {}", id),
        }
    }

    #[inline]
    pub(crate) fn leaf(&self, id: NodeId) -> &LeafNode<K, V> {
        self.node(id).as_leaf()
    }

    #[inline]
    fn leaf_mut(&mut self, id: NodeId) -> &mut LeafNode<K, V> {
        self.node_mut(id).as_leaf_mut()
    }

    #[inline]
    fn inner(&self, id: NodeId) -> &InnerNode<K> {
        self.node(id).as_inner()
    }

    #[inline]
    fn inner_mut(&mut self, id: NodeId) -> &mut InnerNode<K> {
        self.node_mut(id).as_inner_mut()
    }
}

/// B+ Tree Node Binary Search Functions
impl<K: Ord + Clone + Debug, V> BTree<K, V> {
    /// First slot whose key is not less than `key`.
    fn find_lower(&self, n: &impl NodeImpl<K>, key: &K) -> usize {
        let slotuse = n.slotuse();
        if slotuse > self.config.binsearch_threshold() {
            let mut lo = 0;
            let mut hi = slotuse;
            while lo < hi {
                let mid = (lo + hi) >> 1;
                if key <= n.key(mid) {
                    hi = mid
                } else {
                    lo = mid + 1
                }
            }
            lo
        } else {
            // small nodes are scanned linearly
            let mut lo = 0;
            while lo < slotuse && n.key(lo) < key {
                lo += 1;
            }
            lo
        }
    }

    /// First slot whose key is greater than `key`. On an inner node this is
    /// the child responsible for `key`.
    fn find_upper(&self, n: &impl NodeImpl<K>, key: &K) -> usize {
        let slotuse = n.slotuse();
        if slotuse > self.config.binsearch_threshold() {
            let mut lo = 0;
            let mut hi = slotuse;
            while lo < hi {
                let mid = (lo + hi) >> 1;
                if key < n.key(mid) {
                    hi = mid
                } else {
                    lo = mid + 1
                }
            }
            lo
        } else {
            let mut lo = 0;
            while lo < slotuse && n.key(lo) <= key {
                lo += 1;
            }
            lo
        }
    }
}

/// Access Functions to the item count
impl<K, V> BTree<K, V> {
    pub fn size(&self) -> usize {
        self.stats_.size
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Number of node layers, 1 while the root is a leaf.
    pub fn height(&self) -> usize {
        self.node(self.root_).level() as usize + 1
    }

    pub fn get_stats(&self) -> &TreeStats {
        &self.stats_
    }

    pub fn config(&self) -> &BTreeConfig {
        &self.config
    }
}

/// Access function querying the tree by descending to a leaf
impl<K: Ord + Clone + Debug, V> BTree<K, V> {
    fn find_leaf(&self, key: &K) -> NodeId {
        let mut n = self.root_;
        while !self.node(n).is_leafnode() {
            let inner = self.inner(n);
            n = inner.get_child(self.find_upper(inner, key));
        }
        n
    }

    /// Returns the record stored under `key`.
    pub fn search(&self, key: &K) -> BTreeResult<&Record<K, V>> {
        let leaf = self.leaf(self.find_leaf(key));
        let slot = self.find_lower(leaf, key);

        if slot < leaf.slotuse() && leaf.key(slot) == key {
            Ok(&leaf.records[slot])
        } else {
            Err(BTreeError::NotFound)
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.search(key).ok().map(Record::value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.search(key).is_ok()
    }

    pub fn first(&self) -> Option<&Record<K, V>> {
        self.leaf(self.head_leaf_).records.first()
    }

    pub fn last(&self) -> Option<&Record<K, V>> {
        self.leaf(self.tail_leaf_).records.last()
    }

    /// Leaf and slot of the first record with a key not less than `key`.
    fn lower_bound(&self, key: &K) -> (NodeId, usize) {
        let leaf = self.find_leaf(key);
        (leaf, self.find_lower(self.leaf(leaf), key))
    }

    /// Leaf and slot of the first record with a key greater than `key`.
    fn upper_bound(&self, key: &K) -> (NodeId, usize) {
        let leaf = self.find_leaf(key);
        (leaf, self.find_upper(self.leaf(leaf), key))
    }

    /// All records in ascending key order, read along the leaf chain.
    pub fn traverse(&self) -> Iter<'_, K, V> {
        Iter::new(self, self.head_leaf_, 0)
    }

    /// All records in descending key order.
    pub fn traverse_rev(&self) -> RevIter<'_, K, V> {
        RevIter::new(self, self.tail_leaf_, self.leaf(self.tail_leaf_).slotuse())
    }

    /// Records whose keys fall into `range`, in ascending order.
    pub fn range<R: RangeBounds<K>>(&self, range: R) -> Range<'_, K, V> {
        let (leaf, slot) = match range.start_bound() {
            Bound::Included(key) => self.lower_bound(key),
            Bound::Excluded(key) => self.upper_bound(key),
            Bound::Unbounded => (self.head_leaf_, 0),
        };
        Range::new(Iter::new(self, leaf, slot), range.end_bound().cloned())
    }
}

impl<'a, K: Ord + Clone + Debug, V> IntoIterator for &'a BTree<K, V> {
    type Item = &'a Record<K, V>;
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.traverse()
    }
}

/// Insertion
impl<K: Ord + Clone + Debug, V> BTree<K, V> {
    /// Inserts `value` under `key`. An existing record with the same key is
    /// overwritten and its old value returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (replaced, fits) = self.insert_descend(self.root_, key, value);

        if !fits {
            let oldroot = self.root_;
            let level = self.node(oldroot).level() + 1;
            let (splitkey, splitnode) = self.split_node(oldroot);
            self.root_ = self.new_inner(level, vec![splitkey], vec![oldroot, splitnode]);
            log::debug!(
                "BTree::insert grew a new root {}, height {}",
                self.root_,
                self.height()
            );
        }

        if replaced.is_none() {
            self.stats_.size += 1;
        }
        self.self_verify();

        replaced
    }

    /// Descend down the nodes to a leaf and put the record into its slot.
    /// Returns the overwritten value, if any, and whether the node `n` still
    /// fits its capacity. A child that overflows is split here and the new
    /// separator and sibling are taken into `n`.
    fn insert_descend(&mut self, n: NodeId, key: K, value: V) -> (Option<V>, bool) {
        if self.node(n).is_leafnode() {
            let slotmax = self.config.leaf_slotmax();
            let slot = self.find_lower(self.leaf(n), &key);
            let leaf = self.leaf_mut(n);

            if slot < leaf.slotuse() && leaf.key(slot) == &key {
                log::trace!("BTree::insert_descend overwrite {:?} in leaf {}", key, n);
                let old = mem::replace(&mut leaf.records[slot].value, value);
                return (Some(old), true);
            }

            leaf.records.insert(slot, Record::new(key, value));
            (None, !leaf.is_overflow(slotmax))
        } else {
            let slotmax = self.config.inner_slotmax();
            let inner = self.inner(n);
            let slot = self.find_upper(inner, &key);
            let child = inner.get_child(slot);

            let (replaced, fits) = self.insert_descend(child, key, value);

            if !fits {
                let (newkey, newchild) = self.split_node(child);
                log::debug!(
                    "BTree::insert_descend newchild with key {:?} node {} at slot {}",
                    newkey,
                    newchild,
                    slot
                );
                let inner = self.inner_mut(n);
                inner.slotkey.insert(slot, newkey);
                inner.childid.insert(slot + 1, newchild);
            }

            (replaced, !self.inner(n).is_overflow(slotmax))
        }
    }

    fn split_node(&mut self, n: NodeId) -> (K, NodeId) {
        if self.node(n).is_leafnode() {
            self.split_leaf_node(n)
        } else {
            self.split_inner_node(n)
        }
    }

    /// Split up an overflowing leaf into two siblings. The leaf keeps the
    /// lower half; the upper half moves into a new leaf spliced into the
    /// chain right after it. Returns the new leaf's first key and handle.
    fn split_leaf_node(&mut self, n: NodeId) -> (K, NodeId) {
        let slotmax = self.config.leaf_slotmax();
        let leaf = self.leaf_mut(n);
        debug_assert!(leaf.is_overflow(slotmax));

        let records = leaf.split_off();
        let next_leaf = leaf.next_leaf;
        let splitkey = records[0].key.clone();

        let newleaf = self.new_leaf(records);
        log::debug!(
            "BTree::split_leaf_node on {} into {} at key {:?}",
            n,
            newleaf,
            splitkey
        );

        let new = self.leaf_mut(newleaf);
        new.prev_leaf = Some(n);
        new.next_leaf = next_leaf;

        match next_leaf {
            Some(next) => self.leaf_mut(next).prev_leaf = Some(newleaf),
            None => {
                debug_assert_eq!(n, self.tail_leaf_);
                self.tail_leaf_ = newleaf;
            }
        }
        self.leaf_mut(n).next_leaf = Some(newleaf);

        (splitkey, newleaf)
    }

    /// Split up an overflowing inner node around its middle key. The middle
    /// key leaves both halves and is returned for the parent.
    fn split_inner_node(&mut self, n: NodeId) -> (K, NodeId) {
        let slotmax = self.config.inner_slotmax();
        let inner = self.inner_mut(n);
        debug_assert!(inner.is_overflow(slotmax));

        let level = inner.level;
        let (upkey, slotkey, childid) = inner.split_off();
        log::debug!(
            "BTree::split_inner_node on {} into nodes of {} and {} keys, up key {:?}",
            n,
            inner.slotuse(),
            slotkey.len(),
            upkey
        );

        let newinner = self.new_inner(level, slotkey, childid);
        (upkey, newinner)
    }
}

/// Erase
impl<K: Ord + Clone + Debug, V> BTree<K, V> {
    /// Removes the record stored under `key` and returns it. Deleting an
    /// absent key reports `NotFound` and leaves the tree untouched.
    pub fn delete(&mut self, key: &K) -> BTreeResult<Record<K, V>> {
        log::debug!("BTree::delete({:?}) on btree size {}", key, self.size());

        let mut result = self.erase_descend(self.root_, key);
        let record = match result.record.take() {
            Some(record) => record,
            None => return Err(BTreeError::NotFound),
        };
        self.stats_.size -= 1;

        // the root has no fill minimum, but an inner root without keys has a
        // single child that takes over
        let root = self.node(self.root_);
        if !root.is_leafnode() && root.slotuse() == 0 {
            let oldroot = self.root_;
            self.root_ = self.inner(oldroot).get_child(0);
            self.free_node(oldroot);
            log::debug!(
                "BTree::delete lowered the root to {}, height {}",
                self.root_,
                self.height()
            );
        }
        self.self_verify();

        Ok(record)
    }

    /// Erase one key from the subtree under `n`. Underfull children are
    /// fixed by borrowing from or merging with a sibling before returning;
    /// `n` itself reports `Underflow` to its own parent.
    fn erase_descend(&mut self, n: NodeId, key: &K) -> DeletionResult<K, V> {
        if self.node(n).is_leafnode() {
            let slotmin = self.config.leaf_slotmin();
            let slot = self.find_lower(self.leaf(n), key);
            let leaf = self.leaf_mut(n);

            if slot >= leaf.slotuse() || leaf.key(slot) != key {
                log::debug!("Could not find key {:?} to erase.", key);
                return DeletionResult::not_found();
            }
            log::trace!("Found key in leaf {} at slot {}", n, slot);

            let mut result = DeletionResult::removed(leaf.records.remove(slot));
            if slot == 0 {
                if let Some(first) = leaf.first_key() {
                    result.update_first_key(first.clone());
                }
            }
            if leaf.is_underflow(slotmin) {
                result.set(DeletionResultFlags::Underflow);
            }

            return result;
        }

        let slotmin = self.config.inner_slotmin();
        let inner = self.inner(n);
        let slot = self.find_upper(inner, key);
        let child = inner.get_child(slot);

        let mut result = self.erase_descend(child, key);
        if result.has(DeletionResultFlags::NotFound) {
            return result;
        }

        // a changed first key only concerns the separator in front of the
        // child; the first child's key belongs to an ancestor
        if slot > 0 {
            if let Some(first) = result.take_first_key() {
                self.inner_mut(n).slotkey[slot - 1] = first;
            }
        }

        if result.has(DeletionResultFlags::Underflow) {
            result.clear(DeletionResultFlags::Underflow);

            let child_node = self.node(child);
            let emptied = child_node.is_leafnode() && child_node.as_leaf().is_empty();

            self.rebalance_child(n, slot);

            if slot == 0 && emptied {
                let first = self.leaf(self.inner(n).get_child(0)).first_key().cloned();
                if let Some(first) = first {
                    result.update_first_key(first);
                }
            }
        }

        if self.inner(n).is_underflow(slotmin) {
            result.set(DeletionResultFlags::Underflow);
        }

        result
    }

    fn has_surplus(&self, n: NodeId) -> bool {
        match self.node(n) {
            Node::Leaf(leaf) => !leaf.is_few(self.config.leaf_slotmin()),
            Node::Inner(inner) => !inner.is_few(self.config.inner_slotmin()),
        }
    }

    /// Refill the underfull child at `slot` of `parent`: borrow one entry
    /// from a sibling with surplus, otherwise merge with a sibling. The left
    /// sibling is preferred in both cases.
    fn rebalance_child(&mut self, parent: NodeId, slot: usize) {
        let inner = self.inner(parent);
        let child = inner.get_child(slot);
        let left = (slot > 0).then(|| inner.get_child(slot - 1));
        let right = (slot < inner.slotuse()).then(|| inner.get_child(slot + 1));
        let is_leaf = self.node(child).is_leafnode();

        if let Some(left) = left.filter(|&left| self.has_surplus(left)) {
            if is_leaf {
                self.shift_right_leaf(left, child, parent, slot - 1);
            } else {
                self.shift_right_inner(left, child, parent, slot - 1);
            }
        } else if let Some(right) = right.filter(|&right| self.has_surplus(right)) {
            if is_leaf {
                self.shift_left_leaf(child, right, parent, slot);
            } else {
                self.shift_left_inner(child, right, parent, slot);
            }
        } else if let Some(left) = left {
            if is_leaf {
                self.merge_leaves(left, child, parent, slot - 1);
            } else {
                self.merge_inner(left, child, parent, slot - 1);
            }
        } else {
            debug_assert!(right.is_some(), "inner node {} has a single child", parent);
            if let Some(right) = right {
                if is_leaf {
                    self.merge_leaves(child, right, parent, slot);
                } else {
                    self.merge_inner(child, right, parent, slot);
                }
            }
        }
    }

    /// Merge two leaf nodes. All records of `right` move to the end of
    /// `left`, `right` leaves the chain and the parent drops the separator.
    fn merge_leaves(&mut self, left: NodeId, right: NodeId, parent: NodeId, parentslot: usize) {
        log::debug!(
            "Merge leaf nodes {} and {} with common parent {}",
            left,
            right,
            parent
        );

        let p = self.inner_mut(parent);
        debug_assert_eq!(p.get_child(parentslot), left);
        p.slotkey.remove(parentslot);
        p.childid.remove(parentslot + 1);

        let mut rightleaf = self.free_node(right).into_leaf();
        let next_leaf = rightleaf.next_leaf;

        let leftleaf = self.leaf_mut(left);
        debug_assert_eq!(leftleaf.next_leaf, Some(right));
        leftleaf.records.append(&mut rightleaf.records);
        leftleaf.next_leaf = next_leaf;

        match next_leaf {
            Some(next) => self.leaf_mut(next).prev_leaf = Some(left),
            None => {
                debug_assert_eq!(right, self.tail_leaf_);
                self.tail_leaf_ = left;
            }
        }

        debug_assert!(!self.leaf(left).is_overflow(self.config.leaf_slotmax()));
    }

    /// Merge two inner nodes, pulling the parent's separator down between
    /// the keys of `left` and `right`.
    fn merge_inner(&mut self, left: NodeId, right: NodeId, parent: NodeId, parentslot: usize) {
        log::debug!(
            "Merge inner nodes {} and {} with common parent {}.",
            left,
            right,
            parent
        );

        let p = self.inner_mut(parent);
        debug_assert_eq!(p.get_child(parentslot), left);
        let separator = p.slotkey.remove(parentslot);
        p.childid.remove(parentslot + 1);

        let mut rightinner = self.free_node(right).into_inner();

        let leftinner = self.inner_mut(left);
        debug_assert_eq!(leftinner.level, rightinner.level);
        leftinner.slotkey.push(separator);
        leftinner.slotkey.append(&mut rightinner.slotkey);
        leftinner.childid.append(&mut rightinner.childid);

        debug_assert!(!self.inner(left).is_overflow(self.config.inner_slotmax()));
    }

    /// Move the first record of `right` to the end of `left`.
    fn shift_left_leaf(&mut self, left: NodeId, right: NodeId, parent: NodeId, parentslot: usize) {
        let rightleaf = self.leaf_mut(right);
        let record = rightleaf.records.remove(0);
        let rightkey = rightleaf.records[0].key.clone();

        log::debug!(
            "Shifting(leaf) key {:?} to left {} from right {} with common parent {}.",
            record.key,
            left,
            right,
            parent,
        );

        let leftleaf = self.leaf_mut(left);
        leftleaf.records.push(record);
        let leftkey = leftleaf.records[0].key.clone();

        let p = self.inner_mut(parent);
        p.slotkey[parentslot] = rightkey;
        // `left` may have been emptied, which moves its own first key
        if parentslot > 0 {
            p.slotkey[parentslot - 1] = leftkey;
        }
    }

    /// Move the last record of `left` to the front of `right`.
    fn shift_right_leaf(&mut self, left: NodeId, right: NodeId, parent: NodeId, parentslot: usize) {
        let leftleaf = self.leaf_mut(left);
        let last = leftleaf.records.len() - 1;
        let record = leftleaf.records.remove(last);
        let rightkey = record.key.clone();

        log::debug!(
            "Shifting(leaf) key {:?} to right {} from left {} with common parent {}.",
            rightkey,
            right,
            left,
            parent,
        );

        self.leaf_mut(right).records.insert(0, record);
        self.inner_mut(parent).slotkey[parentslot] = rightkey;
    }

    /// Rotate the first child of `right` over to `left` through the parent's
    /// separator.
    fn shift_left_inner(&mut self, left: NodeId, right: NodeId, parent: NodeId, parentslot: usize) {
        log::debug!(
            "Shifting(inner) one entry to left {} from right {} with common parent {}.",
            left,
            right,
            parent,
        );

        let rightinner = self.inner_mut(right);
        let key = rightinner.slotkey.remove(0);
        let child = rightinner.childid.remove(0);

        let separator = mem::replace(&mut self.inner_mut(parent).slotkey[parentslot], key);

        let leftinner = self.inner_mut(left);
        leftinner.slotkey.push(separator);
        leftinner.childid.push(child);
    }

    /// Rotate the last child of `left` over to `right` through the parent's
    /// separator.
    fn shift_right_inner(&mut self, left: NodeId, right: NodeId, parent: NodeId, parentslot: usize) {
        log::debug!(
            "Shifting(inner) one entry to right {} from left {} with common parent {}.",
            right,
            left,
            parent,
        );

        let leftinner = self.inner_mut(left);
        let last = leftinner.slotkey.len() - 1;
        let key = leftinner.slotkey.remove(last);
        let child = leftinner.childid.remove(last + 1);

        let separator = mem::replace(&mut self.inner_mut(parent).slotkey[parentslot], key);

        let rightinner = self.inner_mut(right);
        rightinner.slotkey.insert(0, separator);
        rightinner.childid.insert(0, child);
    }
}

/// Verification
impl<K: Ord + Clone + Debug, V> BTree<K, V> {
    /// Checks key order and separator ranges, node fill, uniform height, the
    /// leaf chain in both directions and the node and record counters.
    pub fn verify(&self) -> BTreeResult<()> {
        let mut stats = TreeStats::new(self.config.leaf_slotmax());
        let mut leaves = Vec::new();

        self.verify_node(self.root_, None, None, &mut stats, &mut leaves)?;

        if stats != self.stats_ {
            return Err(BTreeError::InvariantViolation(format!(
                "counters {:?} disagree with the tree {:?}",
                self.stats_, stats
            )));
        }

        self.verify_leaflinks(&leaves)
    }

    fn verify_node(
        &self,
        n: NodeId,
        lower: Option<&K>,
        upper: Option<&K>,
        stats: &mut TreeStats,
        leaves: &mut Vec<NodeId>,
    ) -> BTreeResult<()> {
        let violation = |msg: String| Err(BTreeError::InvariantViolation(msg));

        let node = match self.try_node(n) {
            Some(node) => node,
            None => return violation(format!("node {} is not allocated", n)),
        };
        let is_root = n == self.root_;
        let keys = node.keys();

        if keys.windows(2).any(|w| w[0] >= w[1]) {
            return violation(format!("keys of node {} are not strictly increasing", n));
        }
        if let (Some(lower), Some(&first)) = (lower, keys.first()) {
            if first < lower {
                return violation(format!("node {} holds {:?} below {:?}", n, first, lower));
            }
        }
        if let (Some(upper), Some(&last)) = (upper, keys.last()) {
            if last >= upper {
                return violation(format!("node {} holds {:?} not below {:?}", n, last, upper));
            }
        }

        match node {
            Node::Leaf(leaf) => {
                let (slotmin, slotmax) = (self.config.leaf_slotmin(), self.config.leaf_slotmax());
                let slotuse = leaf.slotuse();
                if slotuse > slotmax || (!is_root && slotuse < slotmin) {
                    return violation(format!(
                        "leaf {} holds {} records, outside {}..={}",
                        n, slotuse, slotmin, slotmax
                    ));
                }

                stats.leaves += 1;
                stats.size += slotuse;
                leaves.push(n);
            }
            Node::Inner(inner) => {
                let slotmin = if is_root {
                    1
                } else {
                    self.config.inner_slotmin()
                };
                let slotmax = self.config.inner_slotmax();
                let slotuse = inner.slotuse();
                if slotuse > slotmax || slotuse < slotmin {
                    return violation(format!(
                        "inner node {} holds {} keys, outside {}..={}",
                        n, slotuse, slotmin, slotmax
                    ));
                }
                if inner.childid.len() != slotuse + 1 {
                    return violation(format!(
                        "inner node {} has {} keys but {} children",
                        n,
                        slotuse,
                        inner.childid.len()
                    ));
                }

                stats.inner_nodes += 1;

                for (slot, &child) in inner.childid.iter().enumerate() {
                    match self.try_node(child) {
                        Some(c) if c.level() + 1 == inner.level => {}
                        Some(_) => {
                            return violation(format!(
                                "child {} of node {} breaks the uniform height",
                                child, n
                            ))
                        }
                        None => {
                            return violation(format!(
                                "node {} points at unallocated child {}",
                                n, child
                            ))
                        }
                    }

                    let child_lower = if slot == 0 {
                        lower
                    } else {
                        Some(&inner.slotkey[slot - 1])
                    };
                    let child_upper = if slot == slotuse {
                        upper
                    } else {
                        Some(&inner.slotkey[slot])
                    };
                    self.verify_node(child, child_lower, child_upper, stats, leaves)?;
                }
            }
        }

        Ok(())
    }

    /// The chain must visit exactly the leaves found by walking the tree, in
    /// the same order, with matching back links.
    fn verify_leaflinks(&self, leaves: &[NodeId]) -> BTreeResult<()> {
        let violation = |msg: String| Err(BTreeError::InvariantViolation(msg));

        if leaves.first() != Some(&self.head_leaf_) || leaves.last() != Some(&self.tail_leaf_) {
            return violation(format!(
                "head {} or tail {} is not an end of the leaf layer",
                self.head_leaf_, self.tail_leaf_
            ));
        }

        let mut prev = None;
        let mut curr = Some(self.head_leaf_);
        let mut count = 0;

        while let Some(n) = curr {
            if leaves.get(count) != Some(&n) {
                return violation(format!(
                    "leaf chain reaches {} at position {} out of tree order",
                    n, count
                ));
            }
            let leaf = self.leaf(n);
            if leaf.prev_leaf != prev {
                return violation(format!(
                    "leaf {} links back to {:?} instead of {:?}",
                    n, leaf.prev_leaf, prev
                ));
            }
            prev = Some(n);
            curr = leaf.next_leaf;
            count += 1;
        }

        if count != leaves.len() {
            return violation(format!(
                "leaf chain ends after {} of {} leaves",
                count,
                leaves.len()
            ));
        }

        Ok(())
    }

    fn self_verify(&self) {
        if self.config.self_verify() {
            let verified = self.verify();
            debug_assert!(verified.is_ok(), "{:?}", verified);
        }
    }
}

/// Debug
impl<K: Debug, V> BTree<K, V> {
    /// Keys of every node, breadth first: one entry per layer, one key
    /// vector per node, root layer first.
    pub fn levels(&self) -> Vec<Vec<Vec<K>>>
    where
        K: Clone,
    {
        let mut levels: Vec<Vec<Vec<K>>> = Vec::new();
        let mut queue = VecDeque::from([(self.root_, 0)]);

        while let Some((n, depth)) = queue.pop_front() {
            if levels.len() <= depth {
                levels.push(Vec::new());
            }
            let node = self.node(n);
            levels[depth].push(node.keys().into_iter().cloned().collect());

            if let Node::Inner(inner) = node {
                queue.extend(inner.childid.iter().map(|&child| (child, depth + 1)));
            }
        }

        levels
    }

    fn print_leaves(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "leaves:")?;
        let mut n = Some(self.head_leaf_);

        while let Some(leaf) = n {
            write!(f, " {}", leaf)?;
            n = self.leaf(leaf).next_leaf;
        }

        Ok(())
    }

    fn print_node(&self, f: &mut fmt::Formatter<'_>, n: NodeId, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        let node = self.node(n);
        writeln!(
            f,
            "{}node {} level {} slotuse {}",
            indent,
            n,
            node.level(),
            node.slotuse()
        )?;

        match node {
            Node::Leaf(leaf) => {
                writeln!(
                    f,
                    "{}  leaf prev {:?} next {:?}",
                    indent, leaf.prev_leaf, leaf.next_leaf
                )?;
                write!(f, "{}", indent)?;
                for record in &leaf.records {
                    write!(f, " {:?}", record.key)?;
                }
                writeln!(f)?;
            }
            Node::Inner(inner) => {
                write!(f, "{}", indent)?;
                for (child, key) in inner.childid.iter().zip(&inner.slotkey) {
                    write!(f, "({}) {:?} ", child, key)?;
                }
                writeln!(f, "({})", inner.childid[inner.slotuse()])?;

                for &child in &inner.childid {
                    self.print_node(f, child, depth + 1)?;
                }
            }
        }

        Ok(())
    }
}

impl<K: Debug, V> Debug for BTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print_node(f, self.root_, 0)?;
        writeln!(f)?;
        self.print_leaves(f)
    }
}

/// Display
impl<K: Debug + Clone, V> Display for BTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (level, nodes) in self.levels().iter().enumerate() {
            for keys in nodes {
                write!(f, "Level: {}, Node:", level)?;
                for key in keys {
                    write!(f, " {:?}", key)?;
                }
                writeln!(f, " |")?;
            }
        }

        Ok(())
    }
}
