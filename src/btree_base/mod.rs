pub mod btree;
pub mod config;
mod deletion;
pub mod iter;
mod node;
pub mod record;
pub mod tree_stats;
