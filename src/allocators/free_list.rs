//! Recycling strategy backed by a growable arena.

use std::alloc::Layout;
use std::cell::RefCell;
use std::ptr::NonNull;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use bumpalo::Bump;
use log::trace;

use super::NodeAllocator;
use crate::errors::AllocError;

/// Per-size free lists backed by a chunked [`Bump`] arena.
///
/// Freed blocks are recycled for later requests of the same size and
/// alignment; fresh blocks come from the arena, which grows without bound
/// and releases everything at once when the allocator is dropped.
///
/// Uses interior mutability, so a free list cannot be shared across threads.
pub struct FreeList {
    arena: Bump,
    free: RefCell<BTreeMap<(usize, usize), Vec<NonNull<u8>>>>,
}

impl FreeList {
    pub fn new() -> Self {
        FreeList {
            arena: Bump::new(),
            free: RefCell::new(BTreeMap::new()),
        }
    }

    /// Arena that reserves `bytes` before growing chunk by chunk.
    pub fn with_capacity(bytes: usize) -> Self {
        FreeList {
            arena: Bump::with_capacity(bytes),
            free: RefCell::new(BTreeMap::new()),
        }
    }

    /// Bytes the arena currently holds, recycled blocks included.
    pub fn allocated_bytes(&self) -> usize {
        self.arena.allocated_bytes()
    }
}

impl Default for FreeList {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl NodeAllocator for FreeList {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if let Some(block) = self
            .free
            .borrow_mut()
            .get_mut(&(layout.size(), layout.align()))
            .and_then(Vec::pop)
        {
            return Ok(block);
        }

        self.arena.try_alloc_layout(layout).map_err(|_| {
            trace!("free-list arena cannot grow for {} bytes", layout.size());
            AllocError::Exhausted
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.free
            .borrow_mut()
            .entry((layout.size(), layout.align()))
            .or_default()
            .push(ptr);
    }
}
