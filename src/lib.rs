//! Binary trees whose nodes keep their subtree metrics up to date.
//!
//! Every [`TreeNode`] caches two numbers about the subtree rooted at it:
//!
//! 1. `height`: 0 for a leaf, otherwise one more than the tallest child.
//! 2. `size`: the node itself plus all of its descendants.
//!
//! Nodes are created detached and wired together with
//! [`TreeNode::set_left_child`], [`TreeNode::set_right_child`] and
//! [`TreeNode::cut_off_parent`]. Each of these walks from the touched node up
//! to the root, so both metrics are correct everywhere once the call returns.
//! Reading them is `O(1)`.
//!
//! A [`Tree`] wraps an optional root and adds whole-tree queries, search by
//! value and the three depth-first traversals. Nothing here rebalances: the
//! shape is whatever the caller builds.
//!
//! ```
//! use tree_metrics::{Tree, TreeNode};
//!
//! let root = TreeNode::new(5);
//! let three = TreeNode::new(3);
//! root.set_left_child(Some(three.clone()));
//! root.set_right_child(Some(TreeNode::new(8)));
//! three.set_left_child(Some(TreeNode::new(1)));
//! assert_eq!((root.height(), root.size()), (2, 4));
//!
//! let tree = Tree::new(Some(root));
//! let values: Vec<i32> = tree.in_order().map(|node| node.get()).collect();
//! assert_eq!(values, [1, 3, 5, 8]);
//!
//! three.cut_off_parent();
//! assert_eq!((tree.height(), tree.size()), (1, 2));
//! assert_eq!((three.height(), three.size()), (1, 2));
//! ```

pub mod error;
pub mod node;
pub mod traversal;
pub mod tree;

pub use error::LinkError;
pub use node::TreeNode;
pub use traversal::{InOrder, PostOrder, PreOrder};
pub use tree::Tree;
