//! Depth-first traversals yielding node handles.
//!
//! The iterators are lazy and keep an explicit stack, so skewed trees do not
//! grow the call stack. They hold handles rather than borrows: mutating the
//! tree mid-iteration is allowed but leaves the remaining order unspecified.

use crate::node::TreeNode;
use std::iter::FusedIterator;

/// Node, then left subtree, then right subtree.
pub struct PreOrder<T> {
    stack: Vec<TreeNode<T>>,
}

/// Left subtree, then node, then right subtree.
pub struct InOrder<T> {
    stack: Vec<TreeNode<T>>,
    next: Option<TreeNode<T>>,
}

/// Left subtree, then right subtree, then node.
pub struct PostOrder<T> {
    // second field: children already pushed
    stack: Vec<(TreeNode<T>, bool)>,
}

impl<T> PreOrder<T> {
    pub(crate) fn new(root: Option<TreeNode<T>>) -> Self {
        PreOrder {
            stack: root.into_iter().collect(),
        }
    }
}

impl<T> InOrder<T> {
    pub(crate) fn new(root: Option<TreeNode<T>>) -> Self {
        InOrder {
            stack: Vec::new(),
            next: root,
        }
    }
}

impl<T> PostOrder<T> {
    pub(crate) fn new(root: Option<TreeNode<T>>) -> Self {
        PostOrder {
            stack: root.into_iter().map(|node| (node, false)).collect(),
        }
    }
}

impl<T> Iterator for PreOrder<T> {
    type Item = TreeNode<T>;
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.right_child());
        self.stack.extend(node.left_child());
        Some(node)
    }
}

impl<T> Iterator for InOrder<T> {
    type Item = TreeNode<T>;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.next.take() {
            self.next = node.left_child();
            self.stack.push(node);
        }
        let node = self.stack.pop()?;
        self.next = node.right_child();
        Some(node)
    }
}

impl<T> Iterator for PostOrder<T> {
    type Item = TreeNode<T>;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, expanded)) = self.stack.pop() {
            if expanded {
                return Some(node);
            }
            let left = node.left_child();
            let right = node.right_child();
            self.stack.push((node, true));
            self.stack.extend(right.map(|node| (node, false)));
            self.stack.extend(left.map(|node| (node, false)));
        }
        None
    }
}

impl<T> FusedIterator for PreOrder<T> {}

impl<T> FusedIterator for InOrder<T> {}

impl<T> FusedIterator for PostOrder<T> {}
