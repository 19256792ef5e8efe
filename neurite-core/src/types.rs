/// Identifier for a node in a [`crate::tree::Tree`].
///
/// This is an index into the tree's node arena, and is only meaningful
/// within the lifetime of a given `Tree` instance.
pub type NodeId = usize;

/// Identifying key of a tree node, assigned from the tree's key counter.
///
/// Keys are never reused within one tree, even when a node is replaced.
pub type Key = u32;

/// The soma (root) of every tree lives in the first arena slot.
pub const ROOT: NodeId = 0;
