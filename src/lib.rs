//! Persistent set of unsigned integers, stored as a big-endian Patricia tree
//! with bitmap-compressed leaves.
//!
//! Every mutation builds a new version of the tree and shares all untouched
//! subtrees with previous versions, so snapshotting a set is an O(1)
//! [`Clone`]. The element type `K` and the per-leaf bitmap `B` are chosen at
//! the type level ([`NoBitmap`] turns the leaves into single keys), and node
//! storage comes from a pluggable [`NodeAllocator`] so the two node shapes
//! can be served from dedicated pools.
//!
//! ```
//! use patricia_set::PatriciaSet;
//!
//! let mut set = PatriciaSet::<u32, u64>::new();
//! set.insert(7)?;
//!
//! let snapshot = set.clone();
//! set.insert(8)?;
//!
//! assert!(set.contains(8));
//! assert!(!snapshot.contains(8));
//! # Ok::<(), patricia_set::AllocError>(())
//! ```
//!
//! Handles are reference counted without atomics and the pool strategies use
//! interior mutability, so a set and all versions forked from it belong to
//! one thread.

#![cfg_attr(not(feature = "std"), no_std)]
#[cfg(not(feature = "std"))]
extern crate core as std;

extern crate alloc;

pub mod allocators;
pub mod errors;

mod bits;
mod tree;

use std::alloc::Layout;
use std::fmt;
use std::ptr;

use crate::allocators::{Heap, NodeAllocator};
use crate::tree::nodes::NodeRef;

pub use crate::bits::{Key, LeafBitmap, NoBitmap};
pub use crate::errors::AllocError;

/// Persistent set of unsigned integers.
///
/// `K` is the element type, `B` the bitmap folded into each leaf (a wider
/// bitmap packs more nearby keys per leaf; [`NoBitmap`] disables the
/// packing), and `A` the node allocation strategy. Stateful strategies are
/// used by reference, which also pins their lifetime around the set's:
///
/// ```
/// use patricia_set::{allocators::TwoPool, PatriciaSet};
///
/// type Set<'a> = PatriciaSet<u32, u64, &'a TwoPool>;
///
/// let pools = TwoPool::new(1 << 10, Set::LEAF_LAYOUT, Set::BRANCH_LAYOUT);
/// let mut set = Set::new_in(&pools);
/// set.insert(42)?;
/// assert!(set.contains(42));
/// # Ok::<(), patricia_set::AllocError>(())
/// ```
pub struct PatriciaSet<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone = Heap> {
    root: Option<NodeRef<K, B, A>>,
    alloc: A,
}

impl<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone + Default> PatriciaSet<K, B, A> {
    /// Empty set with a default-constructed allocator.
    pub fn new() -> Self {
        Self::new_in(A::default())
    }
}

impl<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone + Default> Default
    for PatriciaSet<K, B, A>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone> PatriciaSet<K, B, A> {
    /// Layout of a leaf node, for sizing pool chunks.
    pub const LEAF_LAYOUT: Layout = NodeRef::<K, B, A>::LEAF_LAYOUT;

    /// Layout of a branch node, for sizing pool chunks.
    pub const BRANCH_LAYOUT: Layout = NodeRef::<K, B, A>::BRANCH_LAYOUT;

    /// Empty set allocating its nodes from `alloc`.
    pub fn new_in(alloc: A) -> Self {
        PatriciaSet { root: None, alloc }
    }

    /// True if `key` is a member. Never allocates, never fails.
    pub fn contains(&self, key: K) -> bool {
        tree::lookup(self.root.as_ref(), key)
    }

    /// Adds `key`, moving this set to a new version. Versions forked earlier
    /// keep observing the previous contents.
    ///
    /// Returns `Ok(false)` when the key was already present; that case
    /// allocates nothing and keeps the current root handle, so it is
    /// observable through [`same_version`](Self::same_version). When the
    /// allocator fails the set is left unchanged.
    pub fn insert(&mut self, key: K) -> Result<bool, AllocError> {
        match tree::insert(&self.alloc, self.root.as_ref(), key)? {
            Some(root) => {
                self.root = Some(root);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Empties this version. Other versions are unaffected.
    pub fn clear(&mut self) {
        self.root = None;
    }

    /// True when the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// True if both sets are the very same version, i.e. they hold the
    /// identical root node or are both empty. Because inserting a present
    /// key keeps the root handle, this doubles as a cheap "did anything
    /// change" probe across operations.
    pub fn same_version(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => ptr::eq(a.raw(), b.raw()),
            _ => false,
        }
    }

    /// The allocator nodes of this set are built from.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }
}

impl<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone> Clone for PatriciaSet<K, B, A> {
    /// Forks the current version in O(1); the copy shares every node with
    /// `self` until one of them is mutated.
    fn clone(&self) -> Self {
        PatriciaSet {
            root: self.root.clone(),
            alloc: self.alloc.clone(),
        }
    }
}

impl<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone> fmt::Debug for PatriciaSet<K, B, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatriciaSet")
            .field("root", &self.root)
            .finish()
    }
}
