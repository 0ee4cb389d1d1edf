//! Lookup and path-copying insertion.
//!
//! Both walks are iterative. Insertion remembers the branches it passed in a
//! fixed-capacity path array and rebuilds exactly that spine afterwards;
//! every node off the spine is shared with the previous version.

pub(crate) mod nodes;

use arrayvec::ArrayVec;

use self::nodes::{BranchNode, NodeKind, NodeRef};
use crate::allocators::NodeAllocator;
use crate::bits::{self, Key, LeafBitmap};
use crate::errors::AllocError;

/// Branching-bit positions strictly decrease along any root-to-leaf path, so
/// the path can never hold more branches than the widest supported key has
/// bits.
const MAX_PATH: usize = 128;

/// True if `key` is a member of the tree under `root`.
pub(crate) fn lookup<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone>(
    root: Option<&NodeRef<K, B, A>>,
    key: K,
) -> bool {
    let Some(mut node) = root else {
        return false;
    };

    loop {
        match node.kind() {
            NodeKind::Branch(branch) => {
                if !branch.matches(key) {
                    return false;
                }
                node = branch.child_for(key);
            }
            NodeKind::Leaf(leaf) => return leaf.matches(key),
        }
    }
}

/// Path-copying insert.
///
/// Returns `Ok(None)` when `key` is already present: nothing is allocated
/// and the caller keeps its root handle, so repeated inserts of the same key
/// stay handle-identical. Otherwise returns the root of the new version,
/// which shares every subtree off the rewritten path with the old one.
///
/// Allocation failures propagate immediately; whatever partial spine was
/// built is released through the handle drops and the old version is intact.
pub(crate) fn insert<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone>(
    alloc: &A,
    root: Option<&NodeRef<K, B, A>>,
    key: K,
) -> Result<Option<NodeRef<K, B, A>>, AllocError> {
    let Some(root) = root else {
        return single_key_leaf(alloc, key).map(Some);
    };

    // Walk towards the key, remembering every branch the copy pass below has
    // to rebuild. The walk stops at the first node whose covered range does
    // not contain the key, or at a leaf.
    let mut path: ArrayVec<&BranchNode<K, B, A>, MAX_PATH> = ArrayVec::new();
    let mut node = root;

    loop {
        match node.kind() {
            NodeKind::Branch(branch) if branch.matches(key) => {
                path.push(branch);
                node = branch.child_for(key);
            }
            _ => break,
        }
    }

    // Replacement for the node the walk stopped on.
    let mut current = match node.as_leaf() {
        Some(leaf) if bits::prefix_of::<K, B>(key) == leaf.prefix => {
            if leaf.bitmap.contains_key(key) {
                return Ok(None);
            }
            NodeRef::new_leaf(alloc, leaf.prefix, leaf.bitmap.with_key(key))?
        }
        _ => {
            let single = single_key_leaf(alloc, key)?;
            join(
                alloc,
                node.prefix(),
                node.clone(),
                bits::prefix_of::<K, B>(key),
                single,
            )?
        }
    };

    // Copy the spine bottom-up, swapping in `current` for the child the walk
    // went through.
    let mut replaced = node.raw();
    for branch in path.iter().rev() {
        current = branch.replace_child(alloc, replaced, current)?;
        replaced = branch.raw();
    }

    Ok(Some(current))
}

fn single_key_leaf<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone>(
    alloc: &A,
    key: K,
) -> Result<NodeRef<K, B, A>, AllocError> {
    NodeRef::new_leaf(alloc, bits::prefix_of::<K, B>(key), B::of_key(key))
}

/// Smallest branch separating two subtrees whose prefixes differ; the
/// subtree with a zero at the branching bit goes left.
fn join<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone>(
    alloc: &A,
    p1: K,
    t1: NodeRef<K, B, A>,
    p2: K,
    t2: NodeRef<K, B, A>,
) -> Result<NodeRef<K, B, A>, AllocError> {
    let mask = bits::branch_mask(p1, p2);
    let prefix = bits::high_bits_of(p1, mask);

    if bits::branching_bit_is_zero(p1, mask) {
        NodeRef::new_branch(alloc, prefix, mask, t1, t2)
    } else {
        NodeRef::new_branch(alloc, prefix, mask, t2, t1)
    }
}
