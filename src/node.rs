use crate::error::LinkError;
use crate::traversal::{InOrder, PostOrder, PreOrder};
use std::cell::{Ref, RefCell};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

type NodePtr<T> = Rc<RefCell<Node<T>>>;

type Link<T> = Option<NodePtr<T>>;

struct Node<T> {
    value: T,
    height: usize,
    size: usize,
    parent: Weak<RefCell<Node<T>>>,
    left: Link<T>,
    right: Link<T>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Shared handle to a node of a binary tree.
///
/// Every node caches the height and size of the subtree rooted at it. The
/// mutation operations (`set_left_child`, `set_right_child`,
/// `cut_off_parent`) keep those caches correct for the node and all of its
/// ancestors before they return.
///
/// A node owns its children; the link back to the parent is weak. Cloning a
/// handle does not copy the node, compare handles with [`TreeNode::ptr_eq`].
pub struct TreeNode<T> {
    ptr: NodePtr<T>,
}

impl<T> TreeNode<T> {
    /// Creates a detached leaf: no parent, no children, height 0, size 1.
    pub fn new(value: T) -> Self {
        TreeNode {
            ptr: Rc::new(RefCell::new(Node {
                value,
                height: 0,
                size: 1,
                parent: Weak::new(),
                left: None,
                right: None,
            })),
        }
    }

    /// Borrows the payload.
    ///
    /// The borrow must be released before mutating the node.
    pub fn value(&self) -> Ref<'_, T> {
        Ref::map(self.ptr.borrow(), |node| &node.value)
    }

    /// Replaces the payload and returns the old one. Metrics are untouched.
    pub fn set_value(&self, value: T) -> T {
        mem::replace(&mut self.ptr.borrow_mut().value, value)
    }

    pub fn has_parent(&self) -> bool {
        self.parent().is_some()
    }

    pub fn parent(&self) -> Option<TreeNode<T>> {
        self.ptr.borrow().parent.upgrade().map(|ptr| TreeNode { ptr })
    }

    pub fn has_left_child(&self) -> bool {
        self.ptr.borrow().left.is_some()
    }

    pub fn has_right_child(&self) -> bool {
        self.ptr.borrow().right.is_some()
    }

    pub fn left_child(&self) -> Option<TreeNode<T>> {
        self.child(Side::Left)
    }

    pub fn right_child(&self) -> Option<TreeNode<T>> {
        self.child(Side::Right)
    }

    /// Installs `child` in the left slot and returns the node that was there.
    ///
    /// The previous left child is detached first. If `child` already has a
    /// parent (possibly this very node) it is cut off from it before being
    /// installed, so a node can be moved anywhere in one call. Passing `None`
    /// just clears the slot.
    ///
    /// # Panics
    ///
    /// Panics if `child` is this node or one of its ancestors. Use
    /// [`TreeNode::try_set_left_child`] to get an error instead.
    pub fn set_left_child(&self, child: Option<TreeNode<T>>) -> Option<TreeNode<T>> {
        match self.set_child(Side::Left, child) {
            Ok(previous) => previous,
            Err(err) => panic!("cannot set left child: {err}"),
        }
    }

    /// Same as [`TreeNode::set_left_child`] for the right slot.
    ///
    /// # Panics
    ///
    /// Panics if `child` is this node or one of its ancestors.
    pub fn set_right_child(&self, child: Option<TreeNode<T>>) -> Option<TreeNode<T>> {
        match self.set_child(Side::Right, child) {
            Ok(previous) => previous,
            Err(err) => panic!("cannot set right child: {err}"),
        }
    }

    /// Fallible [`TreeNode::set_left_child`]. On error nothing is modified.
    pub fn try_set_left_child(
        &self,
        child: Option<TreeNode<T>>,
    ) -> Result<Option<TreeNode<T>>, LinkError> {
        self.set_child(Side::Left, child)
    }

    /// Fallible [`TreeNode::set_right_child`]. On error nothing is modified.
    pub fn try_set_right_child(
        &self,
        child: Option<TreeNode<T>>,
    ) -> Result<Option<TreeNode<T>>, LinkError> {
        self.set_child(Side::Right, child)
    }

    /// Severs this node from its parent.
    ///
    /// The former parent and its ancestors get their metrics recomputed. The
    /// subtree rooted here keeps its own metrics. No-op without a parent.
    pub fn cut_off_parent(&self) {
        let parent = self.ptr.borrow().parent.upgrade();
        let Some(parent) = parent else {
            return;
        };

        self.ptr.borrow_mut().parent = Weak::new();
        {
            let mut parent_node = parent.borrow_mut();
            if eq_link_and_ptr(&parent_node.left, &self.ptr) {
                parent_node.left = None;
            } else if eq_link_and_ptr(&parent_node.right, &self.ptr) {
                parent_node.right = None;
            } else {
                debug_assert!(false, "parent does not hold the node as a child");
            }
        }
        debug!(size = self.size(), "cut subtree off its parent");
        update_ancestor_metrics(parent);
    }

    pub fn is_leaf(&self) -> bool {
        let node = self.ptr.borrow();
        node.left.is_none() && node.right.is_none()
    }

    /// True when the node has no parent.
    pub fn is_root(&self) -> bool {
        !self.has_parent()
    }

    pub fn is_left_child(&self) -> bool {
        self.side() == Some(Side::Left)
    }

    pub fn is_right_child(&self) -> bool {
        self.side() == Some(Side::Right)
    }

    /// Height of the subtree rooted here: 0 for a leaf.
    pub fn height(&self) -> usize {
        self.ptr.borrow().height
    }

    /// Number of nodes in the subtree rooted here, this node included.
    pub fn size(&self) -> usize {
        self.ptr.borrow().size
    }

    /// Number of edges between this node and its topmost ancestor.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cur = self.ptr.borrow().parent.upgrade();
        while let Some(ptr) = cur {
            depth += 1;
            cur = ptr.borrow().parent.upgrade();
        }
        depth
    }

    /// Topmost ancestor, or this node if it has no parent.
    pub fn root(&self) -> TreeNode<T> {
        let mut root = Rc::clone(&self.ptr);
        loop {
            let parent = root.borrow().parent.upgrade();
            match parent {
                Some(parent) => root = parent,
                None => return TreeNode { ptr: root },
            }
        }
    }

    /// True if both handles refer to the same node.
    pub fn ptr_eq(&self, other: &TreeNode<T>) -> bool {
        Rc::ptr_eq(&self.ptr, &other.ptr)
    }

    pub fn pre_order(&self) -> PreOrder<T> {
        PreOrder::new(Some(self.clone()))
    }

    pub fn in_order(&self) -> InOrder<T> {
        InOrder::new(Some(self.clone()))
    }

    pub fn post_order(&self) -> PostOrder<T> {
        PostOrder::new(Some(self.clone()))
    }

    fn child(&self, side: Side) -> Option<TreeNode<T>> {
        let node = self.ptr.borrow();
        node.slot(side).as_ref().map(|ptr| TreeNode {
            ptr: Rc::clone(ptr),
        })
    }

    fn side(&self) -> Option<Side> {
        let parent = self.ptr.borrow().parent.upgrade()?;
        let parent_node = parent.borrow();
        if eq_link_and_ptr(&parent_node.left, &self.ptr) {
            Some(Side::Left)
        } else if eq_link_and_ptr(&parent_node.right, &self.ptr) {
            Some(Side::Right)
        } else {
            None
        }
    }

    fn is_self_or_ancestor(&self, candidate: &TreeNode<T>) -> bool {
        let mut cur = Some(Rc::clone(&self.ptr));
        while let Some(ptr) = cur {
            if Rc::ptr_eq(&ptr, &candidate.ptr) {
                return true;
            }
            cur = ptr.borrow().parent.upgrade();
        }
        false
    }

    fn set_child(
        &self,
        side: Side,
        child: Option<TreeNode<T>>,
    ) -> Result<Option<TreeNode<T>>, LinkError> {
        if let Some(child) = &child {
            if self.is_self_or_ancestor(child) {
                return Err(LinkError::WouldCycle);
            }
        }

        let previous = self.ptr.borrow_mut().slot_mut(side).take();
        if let Some(previous_ptr) = &previous {
            previous_ptr.borrow_mut().parent = Weak::new();
            debug!(?side, "detached previous child");
            update_ancestor_metrics(Rc::clone(&self.ptr));
        }

        if let Some(child) = child {
            // moving a node: leave its old parent consistent before attaching
            child.cut_off_parent();
            child.ptr.borrow_mut().parent = Rc::downgrade(&self.ptr);
            *self.ptr.borrow_mut().slot_mut(side) = Some(Rc::clone(&child.ptr));
            debug!(?side, size = child.size(), "attached child");
            update_ancestor_metrics(Rc::clone(&self.ptr));
        }

        Ok(previous.map(|ptr| TreeNode { ptr }))
    }
}

impl<T: Clone> TreeNode<T> {
    /// Returns a copy of the payload.
    pub fn get(&self) -> T {
        T::clone(&self.value())
    }
}

impl<T> Clone for TreeNode<T> {
    fn clone(&self) -> Self {
        TreeNode {
            ptr: Rc::clone(&self.ptr),
        }
    }
}

impl<T> Node<T> {
    fn slot(&self, side: Side) -> &Link<T> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn slot_mut(&mut self, side: Side) -> &mut Link<T> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// (height, size) recomputed from the cached metrics of the children.
    fn local_metrics(&self) -> (usize, usize) {
        let mut height = 0;
        let mut size = 1;
        for child in [&self.left, &self.right].into_iter().flatten() {
            let child = child.borrow();
            height = height.max(child.height + 1);
            size += child.size;
        }
        (height, size)
    }
}

/// Walks from `start` up to the root refreshing cached metrics.
///
/// Height stops being rewritten at the first node whose height does not
/// change: none of its ancestors can change either. Size is rewritten on
/// every node up to the root.
fn update_ancestor_metrics<T>(start: NodePtr<T>) {
    let mut cur = Some(start);
    let mut height_settled = false;
    while let Some(ptr) = cur {
        let mut node = ptr.borrow_mut();
        let (height, size) = node.local_metrics();
        if !height_settled {
            if node.height == height {
                height_settled = true;
            } else {
                node.height = height;
            }
        }
        node.size = size;
        trace!(height = node.height, size, "refreshed node metrics");
        cur = node.parent.upgrade();
    }
}

fn eq_link_and_ptr<T>(link: &Link<T>, ptr: &NodePtr<T>) -> bool {
    link.as_ref().is_some_and(|link_ptr| Rc::ptr_eq(link_ptr, ptr))
}

impl<T> Drop for Node<T> {
    fn drop(&mut self) {
        // unlink descendants iteratively so long chains do not recurse
        let mut stack: Vec<NodePtr<T>> = Vec::new();
        stack.extend(self.left.take());
        stack.extend(self.right.take());
        while let Some(ptr) = stack.pop() {
            // nodes still held elsewhere survive as parentless subtrees
            if let Ok(cell) = Rc::try_unwrap(ptr) {
                let mut node = cell.into_inner();
                stack.extend(node.left.take());
                stack.extend(node.right.take());
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TreeNode<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parent = self.parent();
        fmt.debug_struct("TreeNode")
            .field("value", &*self.value())
            .field("height", &self.height())
            .field("size", &self.size())
            .field("parent", &parent.as_ref().map(|ptr| ptr.value()))
            .field("left", &self.left_child())
            .field("right", &self.right_child())
            .finish()
    }
}

/// Recomputes every metric below `node` from scratch and checks it against
/// the caches, along with the parent back-references.
#[cfg(test)]
pub(crate) fn assert_consistent<T>(node: &TreeNode<T>) -> (usize, usize) {
    let mut height = 0;
    let mut size = 1;
    for child in [node.left_child(), node.right_child()]
        .into_iter()
        .flatten()
    {
        let parent = child.parent().expect("child should link back to its parent");
        assert!(parent.ptr_eq(node));
        let (child_height, child_size) = assert_consistent(&child);
        height = height.max(child_height + 1);
        size += child_size;
    }
    assert_eq!(node.height(), height);
    assert_eq!(node.size(), size);
    (height, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;

    fn values<T: Clone>(nodes: impl Iterator<Item = TreeNode<T>>) -> Vec<T> {
        nodes.map(|node| node.get()).collect()
    }

    /// 5 -> (3 -> (1, _), 8)
    fn sample() -> (TreeNode<i32>, TreeNode<i32>, TreeNode<i32>, TreeNode<i32>) {
        let five = TreeNode::new(5);
        let three = TreeNode::new(3);
        let eight = TreeNode::new(8);
        let one = TreeNode::new(1);
        five.set_left_child(Some(three.clone()));
        five.set_right_child(Some(eight.clone()));
        three.set_left_child(Some(one.clone()));
        (five, three, eight, one)
    }

    #[test]
    fn leaf_after_creation() {
        let node = TreeNode::new(7);
        assert_eq!(*node.value(), 7);
        assert_eq!(node.height(), 0);
        assert_eq!(node.size(), 1);
        assert!(node.is_leaf());
        assert!(node.is_root());
        assert!(!node.has_parent());
        assert!(!node.has_left_child());
        assert!(!node.has_right_child());
        assert!(!node.is_left_child());
        assert!(!node.is_right_child());
        assert!(node.parent().is_none());
    }

    #[test]
    fn set_value_keeps_metrics() {
        let (five, three, _, _) = sample();
        assert_eq!(three.set_value(4), 3);
        assert_eq!(three.get(), 4);
        assert_eq!(three.height(), 1);
        assert_eq!(three.size(), 2);
        assert_consistent(&five);
    }

    #[test]
    fn sample_metrics() {
        let (five, three, eight, one) = sample();
        assert_eq!((five.height(), five.size()), (2, 4));
        assert_eq!((three.height(), three.size()), (1, 2));
        assert_eq!((eight.height(), eight.size()), (0, 1));
        assert_eq!((one.height(), one.size()), (0, 1));
        assert!(three.is_left_child());
        assert!(eight.is_right_child());
        assert!(one.is_left_child());
        assert!(one.parent().unwrap().ptr_eq(&three));
        assert!(one.root().ptr_eq(&five));
        assert_eq!(one.depth(), 2);
        assert_eq!(five.depth(), 0);
        assert_eq!(values(five.in_order()), vec![1, 3, 5, 8]);
        assert_consistent(&five);
    }

    #[test]
    fn cut_off_parent_detaches_subtree() {
        let (five, three, eight, one) = sample();
        three.cut_off_parent();

        assert_eq!((five.height(), five.size()), (1, 2));
        assert!(!five.has_left_child());
        assert!(five.right_child().unwrap().ptr_eq(&eight));
        assert!(three.is_root());
        assert!(!three.is_left_child());
        assert_eq!((three.height(), three.size()), (1, 2));
        assert!(one.parent().unwrap().ptr_eq(&three));
        assert_consistent(&five);
        assert_consistent(&three);
    }

    #[test]
    fn cut_off_parent_without_parent_is_noop() {
        let (five, _, _, _) = sample();
        five.cut_off_parent();
        assert_eq!((five.height(), five.size()), (2, 4));
        assert_eq!(values(five.pre_order()), vec![5, 3, 1, 8]);
        assert_consistent(&five);
    }

    #[test]
    fn clearing_empty_slot_is_noop() {
        let (five, _, eight, _) = sample();
        assert!(eight.set_left_child(None).is_none());
        assert_eq!((five.height(), five.size()), (2, 4));
        assert_consistent(&five);
    }

    #[test]
    fn set_child_returns_detached_previous() {
        let (five, three, _, _) = sample();
        let nine = TreeNode::new(9);

        let previous = five.set_left_child(Some(nine.clone())).unwrap();
        assert!(previous.ptr_eq(&three));
        assert!(three.is_root());
        assert!(nine.is_left_child());
        assert_eq!((five.height(), five.size()), (1, 3));
        assert_eq!((three.height(), three.size()), (1, 2));
        assert_consistent(&five);

        let cleared = five.set_left_child(None).unwrap();
        assert!(cleared.ptr_eq(&nine));
        assert!(nine.is_root());
        assert_eq!((five.height(), five.size()), (1, 2));
        assert_consistent(&five);
    }

    #[test]
    fn reparent_moves_between_trees() {
        let (five, three, _, one) = sample();
        let root = TreeNode::new(20);
        let mid = TreeNode::new(15);
        root.set_left_child(Some(mid.clone()));

        // move 3 (with 1 under it) under 15 in the other tree
        mid.set_left_child(Some(three.clone()));

        assert!(three.parent().unwrap().ptr_eq(&mid));
        assert!(!five.has_left_child());
        assert_eq!((five.height(), five.size()), (1, 2));
        assert_eq!((mid.height(), mid.size()), (2, 3));
        assert_eq!((root.height(), root.size()), (3, 4));
        assert!(one.root().ptr_eq(&root));
        assert_consistent(&five);
        assert_consistent(&root);
    }

    #[test]
    fn move_between_slots_of_same_parent() {
        let (five, three, eight, _) = sample();
        let previous = five.set_right_child(Some(three.clone())).unwrap();

        assert!(previous.ptr_eq(&eight));
        assert!(eight.is_root());
        assert!(!five.has_left_child());
        assert!(three.is_right_child());
        assert_eq!((five.height(), five.size()), (2, 3));
        assert_consistent(&five);
    }

    #[test]
    fn self_move_keeps_invariants() {
        let (five, three, _, _) = sample();
        let previous = five.set_left_child(Some(three.clone())).unwrap();

        assert!(previous.ptr_eq(&three));
        assert!(three.is_left_child());
        assert!(five.left_child().unwrap().ptr_eq(&three));
        assert_eq!((five.height(), five.size()), (2, 4));
        assert_consistent(&five);
    }

    #[test]
    fn cycle_is_rejected() {
        let (five, three, _, one) = sample();
        assert_eq!(
            one.try_set_left_child(Some(five.clone())).unwrap_err(),
            LinkError::WouldCycle
        );
        assert_eq!(
            one.try_set_right_child(Some(three.clone())).unwrap_err(),
            LinkError::WouldCycle
        );
        assert_eq!(
            one.try_set_right_child(Some(one.clone())).unwrap_err(),
            LinkError::WouldCycle
        );

        assert!(three.is_left_child());
        assert!(one.is_leaf());
        assert_eq!((five.height(), five.size()), (2, 4));
        assert_consistent(&five);
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn set_child_panics_on_cycle() {
        let node = TreeNode::new(1);
        node.set_left_child(Some(node.clone()));
    }

    #[test]
    fn height_settles_but_size_propagates() {
        // 10 -> (5 -> (2 -> 1, _), 15); adding 7 under 5 leaves heights alone
        let root = TreeNode::new(10);
        let five = TreeNode::new(5);
        let two = TreeNode::new(2);
        root.set_left_child(Some(five.clone()));
        root.set_right_child(Some(TreeNode::new(15)));
        five.set_left_child(Some(two.clone()));
        two.set_left_child(Some(TreeNode::new(1)));
        assert_eq!((root.height(), root.size()), (3, 5));

        five.set_right_child(Some(TreeNode::new(7)));
        assert_eq!((five.height(), five.size()), (2, 4));
        assert_eq!((root.height(), root.size()), (3, 6));
        assert_consistent(&root);
    }

    #[test]
    fn dropping_parent_keeps_held_subtree() {
        let (five, three, _, one) = sample();
        drop(five);
        assert!(three.is_root());
        assert!(!three.is_left_child());
        assert_eq!((three.height(), three.size()), (1, 2));
        assert!(one.parent().unwrap().ptr_eq(&three));
        assert_consistent(&three);
    }

    #[test]
    fn drop_long_chain() {
        let mut top = TreeNode::new(0);
        for i in 1..200_000 {
            let node = TreeNode::new(i);
            node.set_left_child(Some(top));
            top = node;
        }
        assert_eq!(top.height(), 199_999);
        assert_eq!(top.size(), 200_000);
        drop(top);
    }

    #[test]
    fn random_mutations_keep_metrics() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let nodes: Vec<TreeNode<usize>> = (0..24).map(TreeNode::new).collect();

        for _ in 0..2000 {
            let a = &nodes[rng.random_range(0..nodes.len())];
            let b = &nodes[rng.random_range(0..nodes.len())];
            match rng.random_range(0..5) {
                0 => {
                    let _ = a.try_set_left_child(Some(b.clone()));
                }
                1 => {
                    let _ = a.try_set_right_child(Some(b.clone()));
                }
                2 => {
                    a.set_left_child(None);
                }
                3 => {
                    a.set_right_child(None);
                }
                _ => a.cut_off_parent(),
            }

            for node in nodes.iter().filter(|node| node.is_root()) {
                assert_consistent(node);
            }
            let total: usize = nodes
                .iter()
                .filter(|node| node.is_root())
                .map(|node| node.size())
                .sum();
            assert_eq!(total, nodes.len());
        }
    }
}
