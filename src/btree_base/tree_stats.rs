#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub size: usize,
    pub leaves: usize,
    pub inner_nodes: usize,
    leaf_slotmax: usize,
}

impl TreeStats {
    pub fn new(leaf_slotmax: usize) -> Self {
        Self {
            size: 0,
            leaves: 0,
            inner_nodes: 0,
            leaf_slotmax,
        }
    }

    pub fn nodes(&self) -> usize {
        self.inner_nodes + self.leaves
    }

    pub fn avgfill_leaves(&self) -> f64 {
        if self.leaves == 0 {
            return 0.0;
        }
        self.size as f64 / (self.leaves * self.leaf_slotmax) as f64
    }
}
