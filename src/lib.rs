//! An in-memory B+ tree index with a doubly linked leaf layer.

pub mod btree_base;
pub mod btree_map;
pub mod error;

pub use btree_base::{
    btree::BTree,
    config::BTreeConfig,
    iter::{Iter, Range, RevIter},
    record::Record,
    tree_stats::TreeStats,
};
pub use error::{BTreeError, BTreeResult};
