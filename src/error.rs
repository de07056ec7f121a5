use thiserror::Error;

/// Errors returned by the fallible child setters on [`TreeNode`](crate::TreeNode).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The new child is the receiving node itself or one of its ancestors.
    #[error("attaching the node would create a cycle")]
    WouldCycle,
}
