use crate::node::TreeNode;
use crate::traversal::{InOrder, PostOrder, PreOrder};
use std::cmp::Ordering;
use std::fmt;
use tracing::trace;

/// A binary tree held through its root node.
///
/// Size and height are read from the root's cached metrics, an empty tree
/// reports 0 for both.
pub struct Tree<T> {
    root: Option<TreeNode<T>>,
}

impl<T> Tree<T> {
    /// Wraps `root` without checking that it is parentless.
    pub fn new(root: Option<TreeNode<T>>) -> Self {
        Tree { root }
    }

    pub fn empty() -> Self {
        Tree { root: None }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<&TreeNode<T>> {
        self.root.as_ref()
    }

    /// Replaces the root and returns the previous one.
    pub fn set_root(&mut self, root: Option<TreeNode<T>>) -> Option<TreeNode<T>> {
        std::mem::replace(&mut self.root, root)
    }

    pub fn take_root(&mut self) -> Option<TreeNode<T>> {
        self.root.take()
    }

    pub fn size(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::size)
    }

    pub fn height(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::height)
    }

    pub fn pre_order(&self) -> PreOrder<T> {
        PreOrder::new(self.root.clone())
    }

    pub fn in_order(&self) -> InOrder<T> {
        InOrder::new(self.root.clone())
    }

    pub fn post_order(&self) -> PostOrder<T> {
        PostOrder::new(self.root.clone())
    }
}

impl<T: PartialEq> Tree<T> {
    /// First node in pre-order whose value equals `value`.
    pub fn find(&self, value: &T) -> Option<TreeNode<T>> {
        self.pre_order().find(|node| *node.value() == *value)
    }
}

impl<T: Ord> Tree<T> {
    /// Places `value` by binary-search order: smaller to the left, greater
    /// to the right. Returns false if an equal value is already there.
    pub fn insert(&mut self, value: T) -> bool {
        let Some(closest) = self.find_closest(&value) else {
            self.root = Some(TreeNode::new(value));
            return true;
        };

        let ordering = value.cmp(&closest.value());
        match ordering {
            Ordering::Equal => false,
            Ordering::Less => {
                closest.set_left_child(Some(TreeNode::new(value)));
                true
            }
            Ordering::Greater => {
                closest.set_right_child(Some(TreeNode::new(value)));
                true
            }
        }
    }

    /// Searches by ordering; only meaningful for trees built by `insert`.
    pub fn contains(&self, value: &T) -> bool {
        self.find_closest(value)
            .is_some_and(|node| *node.value() == *value)
    }

    fn find_closest(&self, value: &T) -> Option<TreeNode<T>> {
        let mut prev = None;
        let mut cur = self.root.clone();
        let mut depth = 0;
        while let Some(node) = cur {
            let ordering = value.cmp(&node.value());
            cur = match ordering {
                Ordering::Less => node.left_child(),
                Ordering::Greater => node.right_child(),
                Ordering::Equal => return Some(node),
            };
            prev = Some(node);
            depth += 1;
        }
        trace!(depth, "binary search reached a leaf");
        prev
    }
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Tree::empty()
    }
}

impl<T: Ord> FromIterator<T> for Tree<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = Tree::empty();
        for value in iter {
            tree.insert(value);
        }
        tree
    }
}

impl<T: fmt::Debug> fmt::Debug for Tree<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Tree")
            .field("size", &self.size())
            .field("height", &self.height())
            .field("root", &self.root)
            .finish()
    }
}
