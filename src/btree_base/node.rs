use super::record::Record;

/// Handle of a node in the tree's arena.
pub type NodeId = usize;

pub trait NodeImpl<K> {
    fn slotuse(&self) -> usize;
    fn key(&self, slot: usize) -> &K;
}

#[derive(Clone, Debug)]
pub enum Node<K, V> {
    Inner(InnerNode<K>),
    Leaf(LeafNode<K, V>),
}

/// Routes lookups through separator keys. `childid[i]` holds keys below
/// `slotkey[i]`, `childid[i + 1]` keys from `slotkey[i]` upwards.
#[derive(Clone, Debug)]
pub struct InnerNode<K> {
    pub level: u16,
    pub slotkey: Vec<K>,
    pub childid: Vec<NodeId>,
}

/// Holds records in key order. The sibling links never own anything.
#[derive(Clone, Debug)]
pub struct LeafNode<K, V> {
    pub records: Vec<Record<K, V>>,
    pub prev_leaf: Option<NodeId>,
    pub next_leaf: Option<NodeId>,
}

impl<K, V> Node<K, V> {
    pub fn new_inner(level: u16, slotkey: Vec<K>, childid: Vec<NodeId>) -> Self {
        debug_assert!(level > 0);
        debug_assert_eq!(slotkey.len() + 1, childid.len());
        Node::Inner(InnerNode {
            level,
            slotkey,
            childid,
        })
    }

    pub fn new_leaf(records: Vec<Record<K, V>>) -> Self {
        Node::Leaf(LeafNode {
            records,
            prev_leaf: None,
            next_leaf: None,
        })
    }

    #[inline]
    pub fn is_leafnode(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    #[inline]
    pub fn level(&self) -> u16 {
        match self {
            Node::Inner(inner) => inner.level,
            Node::Leaf(_) => 0,
        }
    }

    #[inline]
    pub fn slotuse(&self) -> usize {
        match self {
            Node::Inner(inner) => inner.slotuse(),
            Node::Leaf(leaf) => leaf.slotuse(),
        }
    }

    #[inline]
    pub fn as_leaf(&self) -> &LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Inner(_) => unreachable!("expected a leaf node, found an inner node"),
        }
    }

    #[inline]
    pub fn as_inner(&self) -> &InnerNode<K> {
        match self {
            Node::Inner(inner) => inner,
            Node::Leaf(_) => unreachable!("expected an inner node, found a leaf node"),
        }
    }

    #[inline]
    pub fn as_leaf_mut(&mut self) -> &mut LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Inner(_) => unreachable!("expected a leaf node, found an inner node"),
        }
    }

    #[inline]
    pub fn as_inner_mut(&mut self) -> &mut InnerNode<K> {
        match self {
            Node::Inner(inner) => inner,
            Node::Leaf(_) => unreachable!("expected an inner node, found a leaf node"),
        }
    }

    pub fn into_leaf(self) -> LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Inner(_) => unreachable!("expected a leaf node, found an inner node"),
        }
    }

    pub fn into_inner(self) -> InnerNode<K> {
        match self {
            Node::Inner(inner) => inner,
            Node::Leaf(_) => unreachable!("expected an inner node, found a leaf node"),
        }
    }

    /// Keys held by this node, in order.
    pub fn keys(&self) -> Vec<&K> {
        match self {
            Node::Inner(inner) => inner.slotkey.iter().collect(),
            Node::Leaf(leaf) => leaf.records.iter().map(Record::key).collect(),
        }
    }
}

impl<K> InnerNode<K> {
    #[inline]
    pub fn is_overflow(&self, slotmax: usize) -> bool {
        self.slotkey.len() > slotmax
    }

    #[inline]
    pub fn is_few(&self, slotmin: usize) -> bool {
        self.slotkey.len() <= slotmin
    }

    #[inline]
    pub fn is_underflow(&self, slotmin: usize) -> bool {
        self.slotkey.len() < slotmin
    }

    #[inline]
    pub fn get_child(&self, slot: usize) -> NodeId {
        self.childid[slot]
    }

    /// Splits off everything right of the middle key and returns that key
    /// together with the right half's keys and children.
    pub fn split_off(&mut self) -> (K, Vec<K>, Vec<NodeId>) {
        let mid = self.slotkey.len() / 2;
        let right_keys = self.slotkey.split_off(mid + 1);
        let right_children = self.childid.split_off(mid + 1);
        let upkey = self.slotkey.remove(mid);
        (upkey, right_keys, right_children)
    }
}

impl<K, V> LeafNode<K, V> {
    #[inline]
    pub fn is_overflow(&self, slotmax: usize) -> bool {
        self.records.len() > slotmax
    }

    #[inline]
    pub fn is_few(&self, slotmin: usize) -> bool {
        self.records.len() <= slotmin
    }

    #[inline]
    pub fn is_underflow(&self, slotmin: usize) -> bool {
        self.records.len() < slotmin
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_key(&self) -> Option<&K> {
        self.records.first().map(Record::key)
    }

    /// Moves the upper half of the records into a new vector.
    pub fn split_off(&mut self) -> Vec<Record<K, V>> {
        let mid = self.records.len() / 2;
        self.records.split_off(mid)
    }
}

impl<K> NodeImpl<K> for InnerNode<K> {
    #[inline]
    fn slotuse(&self) -> usize {
        self.slotkey.len()
    }

    #[inline]
    fn key(&self, slot: usize) -> &K {
        &self.slotkey[slot]
    }
}

impl<K, V> NodeImpl<K> for LeafNode<K, V> {
    #[inline]
    fn slotuse(&self) -> usize {
        self.records.len()
    }

    #[inline]
    fn key(&self, slot: usize) -> &K {
        &self.records[slot].key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_of(keys: &[i32]) -> LeafNode<i32, i32> {
        Node::new_leaf(keys.iter().map(|&k| Record::new(k, k * 10)).collect()).into_leaf()
    }

    #[test]
    fn leaf_split_keeps_smaller_half() {
        let mut leaf = leaf_of(&[1, 2, 3, 4, 5]);
        let right = leaf.split_off();
        assert_eq!(leaf.records.len(), 2);
        assert_eq!(right.iter().map(|r| r.key).collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(leaf.first_key(), Some(&1));
    }

    #[test]
    fn inner_split_promotes_middle_key() {
        let mut inner = InnerNode {
            level: 1,
            slotkey: vec![10, 20, 30, 40],
            childid: vec![0, 1, 2, 3, 4],
        };
        let (upkey, keys, children) = inner.split_off();
        assert_eq!(upkey, 30);
        assert_eq!(inner.slotkey, vec![10, 20]);
        assert_eq!(inner.childid, vec![0, 1, 2]);
        assert_eq!(keys, vec![40]);
        assert_eq!(children, vec![3, 4]);
    }

    #[test]
    fn fill_checks() {
        let leaf = leaf_of(&[1, 2, 3]);
        assert!(leaf.is_overflow(2));
        assert!(!leaf.is_overflow(3));
        assert!(leaf.is_few(3));
        assert!(!leaf.is_underflow(3));
        assert!(leaf.is_underflow(4));
        assert_eq!(leaf.slotuse(), 3);
        assert_eq!(leaf.key(1), &2);
    }
}
