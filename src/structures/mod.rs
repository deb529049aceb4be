//! Recursive data structures folded on the trampoline.
//!
//! - [`List`]: persistent singly linked list with left and right folds
//! - [`Tree`]: leaves, unary branches and binary branches with a left fold
//!
//! Both release their cells iteratively on drop, so arbitrarily long lists
//! and arbitrarily deep trees can be built, folded and dropped.

mod list;
mod tree;

pub use list::{Iter, List};
pub use tree::{Tree, TreeView};
