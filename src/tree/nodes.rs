//! The two node shapes and the shared handle used as the tree pointer type.
//!
//! Nodes are reference counted, allocated through the set's
//! [`NodeAllocator`], and never mutated, copied, or moved once constructed.
//! Versions of a set form a DAG over these nodes: a branch shares ownership
//! of its children, and children are fixed at construction and point strictly
//! downward, so plain reference counting reclaims everything.

use std::alloc::Layout;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use crate::allocators::NodeAllocator;
use crate::bits::{self, Key, LeafBitmap};
use crate::errors::AllocError;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
enum NodeTag {
    Leaf,
    Branch,
}

/// Lead-in common to both node shapes. Both start with their header, so any
/// node pointer doubles as a `Header` pointer and the tag can be read before
/// the shape is known.
#[repr(C)]
pub(crate) struct Header {
    rc: Cell<u32>,
    tag: NodeTag,
}

/// Keys sharing `prefix` above the suffix bits; which suffixes are present is
/// recorded in `bitmap`.
#[repr(C)]
pub(crate) struct LeafNode<K: Key, B: LeafBitmap<K>> {
    header: Header,
    pub(crate) prefix: K,
    pub(crate) bitmap: B,
}

/// Interior node. `mask` is the single branching bit and `prefix` holds the
/// key bits strictly above it; keys with a zero at `mask` sit under `left`.
#[repr(C)]
pub(crate) struct BranchNode<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone> {
    header: Header,
    pub(crate) prefix: K,
    pub(crate) mask: K,
    pub(crate) left: NodeRef<K, B, A>,
    pub(crate) right: NodeRef<K, B, A>,
}

/// Shared owning handle to an immutable node.
///
/// Cloning bumps a non-atomic reference count, so handles are neither `Send`
/// nor `Sync`. Dropping the last handle returns the node's storage to the
/// allocator the node was built with; the handle carries a clone of that
/// allocator for exactly this purpose.
pub(crate) struct NodeRef<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone> {
    ptr: NonNull<Header>,
    alloc: A,
    _marker: PhantomData<(K, B)>,
}

/// Borrowed view of a node, dispatched on the header tag.
pub(crate) enum NodeKind<'a, K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone> {
    Leaf(&'a LeafNode<K, B>),
    Branch(&'a BranchNode<K, B, A>),
}

impl<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone> NodeRef<K, B, A> {
    pub(crate) const LEAF_LAYOUT: Layout = Layout::new::<LeafNode<K, B>>();
    pub(crate) const BRANCH_LAYOUT: Layout = Layout::new::<BranchNode<K, B, A>>();

    /// Leaf holding the given prefix and bitmap.
    pub(crate) fn new_leaf(alloc: &A, prefix: K, bitmap: B) -> Result<Self, AllocError> {
        debug_assert_eq!(prefix & bits::suffix_mask::<K, B>(), K::zero());
        debug_assert!(bitmap.is_populated());

        let ptr = alloc.allocate(Self::LEAF_LAYOUT)?.cast::<LeafNode<K, B>>();
        unsafe {
            ptr.as_ptr().write(LeafNode {
                header: Header {
                    rc: Cell::new(1),
                    tag: NodeTag::Leaf,
                },
                prefix,
                bitmap,
            });
        }

        Ok(NodeRef {
            ptr: ptr.cast(),
            alloc: alloc.clone(),
            _marker: PhantomData,
        })
    }

    /// Branch over two existing subtrees. Keys under `left` have a zero at
    /// `mask`; the caller has already ordered the children.
    pub(crate) fn new_branch(
        alloc: &A,
        prefix: K,
        mask: K,
        left: Self,
        right: Self,
    ) -> Result<Self, AllocError> {
        debug_assert_eq!(mask.count_ones(), 1);
        debug_assert_eq!(bits::high_bits_of(prefix, mask), prefix);

        let ptr = alloc
            .allocate(Self::BRANCH_LAYOUT)?
            .cast::<BranchNode<K, B, A>>();
        unsafe {
            ptr.as_ptr().write(BranchNode {
                header: Header {
                    rc: Cell::new(1),
                    tag: NodeTag::Branch,
                },
                prefix,
                mask,
                left,
                right,
            });
        }

        Ok(NodeRef {
            ptr: ptr.cast(),
            alloc: alloc.clone(),
            _marker: PhantomData,
        })
    }

    #[inline(always)]
    fn header(&self) -> &Header {
        // The pointee is alive as long as any handle holds a count on it.
        unsafe { self.ptr.as_ref() }
    }

    #[inline(always)]
    pub(crate) fn kind(&self) -> NodeKind<'_, K, B, A> {
        match self.header().tag {
            NodeTag::Leaf => NodeKind::Leaf(unsafe { self.ptr.cast::<LeafNode<K, B>>().as_ref() }),
            NodeTag::Branch => {
                NodeKind::Branch(unsafe { self.ptr.cast::<BranchNode<K, B, A>>().as_ref() })
            }
        }
    }

    #[inline(always)]
    pub(crate) fn is_leaf(&self) -> bool {
        self.header().tag == NodeTag::Leaf
    }

    #[inline(always)]
    pub(crate) fn as_leaf(&self) -> Option<&LeafNode<K, B>> {
        match self.kind() {
            NodeKind::Leaf(leaf) => Some(leaf),
            NodeKind::Branch(_) => None,
        }
    }

    #[inline(always)]
    pub(crate) fn as_branch(&self) -> Option<&BranchNode<K, B, A>> {
        match self.kind() {
            NodeKind::Branch(branch) => Some(branch),
            NodeKind::Leaf(_) => None,
        }
    }

    /// Prefix of the node regardless of its shape.
    #[inline(always)]
    pub(crate) fn prefix(&self) -> K {
        match self.kind() {
            NodeKind::Leaf(leaf) => leaf.prefix,
            NodeKind::Branch(branch) => branch.prefix,
        }
    }

    /// Node address, the identity used by path copying and version probes.
    #[inline(always)]
    pub(crate) fn raw(&self) -> *const Header {
        self.ptr.as_ptr()
    }
}

impl<K: Key, B: LeafBitmap<K>> LeafNode<K, B> {
    #[inline(always)]
    pub(crate) fn matches(&self, key: K) -> bool {
        bits::match_leaf(key, self.prefix, &self.bitmap)
    }
}

impl<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone> BranchNode<K, B, A> {
    /// Header address of this node, comparable with [`NodeRef::raw`].
    #[inline(always)]
    pub(crate) fn raw(&self) -> *const Header {
        &self.header
    }

    #[inline(always)]
    pub(crate) fn matches(&self, key: K) -> bool {
        bits::match_branch(key, self.prefix, self.mask)
    }

    /// The child `key` descends into.
    #[inline(always)]
    pub(crate) fn child_for(&self, key: K) -> &NodeRef<K, B, A> {
        if bits::branching_bit_is_zero(key, self.mask) {
            &self.left
        } else {
            &self.right
        }
    }

    /// Fresh branch identical to this one except that the child whose node
    /// address equals `old` is swapped for `new`; the other child is shared.
    ///
    /// Identity is the node address, not the key range: path copying has to
    /// pinpoint the exact handle it just rewrote.
    pub(crate) fn replace_child(
        &self,
        alloc: &A,
        old: *const Header,
        new: NodeRef<K, B, A>,
    ) -> Result<NodeRef<K, B, A>, AllocError> {
        if ptr::eq(self.left.raw(), old) {
            NodeRef::new_branch(alloc, self.prefix, self.mask, new, self.right.clone())
        } else {
            debug_assert!(ptr::eq(self.right.raw(), old));
            NodeRef::new_branch(alloc, self.prefix, self.mask, self.left.clone(), new)
        }
    }
}

impl<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone> Clone for NodeRef<K, B, A> {
    #[inline]
    fn clone(&self) -> Self {
        let rc = self.header().rc.get();
        assert_ne!(rc, u32::MAX, "node reference count overflow");
        self.header().rc.set(rc + 1);

        NodeRef {
            ptr: self.ptr,
            alloc: self.alloc.clone(),
            _marker: PhantomData,
        }
    }
}

impl<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone> Drop for NodeRef<K, B, A> {
    fn drop(&mut self) {
        let rc = self.header().rc.get();
        if rc != 1 {
            self.header().rc.set(rc - 1);
            return;
        }

        // Last handle: tear the node down and hand its storage back with the
        // exact layout it was allocated with. Dropping a branch in place
        // releases its two child handles, recursing at most once per bit of
        // the key width.
        unsafe {
            match self.header().tag {
                NodeTag::Leaf => {
                    ptr::drop_in_place(self.ptr.cast::<LeafNode<K, B>>().as_ptr());
                    self.alloc.deallocate(self.ptr.cast(), Self::LEAF_LAYOUT);
                }
                NodeTag::Branch => {
                    ptr::drop_in_place(self.ptr.cast::<BranchNode<K, B, A>>().as_ptr());
                    self.alloc.deallocate(self.ptr.cast(), Self::BRANCH_LAYOUT);
                }
            }
        }
    }
}

impl<K: Key, B: LeafBitmap<K>, A: NodeAllocator + Clone> fmt::Debug for NodeRef<K, B, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NodeKind::Leaf(leaf) => f
                .debug_struct("Leaf")
                .field("prefix", &leaf.prefix)
                .field("bitmap", &leaf.bitmap)
                .finish(),
            NodeKind::Branch(branch) => f
                .debug_struct("Branch")
                .field("prefix", &branch.prefix)
                .field("mask", &branch.mask)
                .field("left", &branch.left)
                .field("right", &branch.right)
                .finish(),
        }
    }
}
