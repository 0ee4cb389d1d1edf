//! Fixed-capacity pool strategies.

use std::alloc::Layout;
use std::cell::{Cell, RefCell};
use std::ptr::NonNull;

use alloc::alloc::{dealloc, handle_alloc_error};
use alloc::vec::Vec;
use log::debug;

use super::NodeAllocator;
use crate::errors::AllocError;

/// One contiguous region carved into equal chunks.
///
/// `allocate` first pops the stack of freed chunks and otherwise hands out
/// the next untouched one; both paths are O(1). A full pool reports
/// [`AllocError::Exhausted`]. Requests are accepted as long as they fit a
/// chunk, so a single pool sized for the larger node shape can also serve
/// the smaller one.
///
/// Uses interior mutability, so a pool cannot be shared across threads.
pub struct FixedPool {
    region: NonNull<u8>,
    region_layout: Layout,
    chunk: Layout,
    capacity: usize,
    high_water: Cell<usize>,
    free: RefCell<Vec<NonNull<u8>>>,
}

impl FixedPool {
    /// Reserves `capacity` chunks of `chunk` size and alignment up front.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or the region cannot be reserved.
    pub fn new(capacity: usize, chunk: Layout) -> Self {
        assert!(capacity > 0, "a pool needs at least one chunk");

        let chunk = chunk.pad_to_align();
        let region_size = chunk
            .size()
            .checked_mul(capacity)
            .expect("pool region size overflows usize");
        let region_layout = Layout::from_size_align(region_size, chunk.align())
            .expect("pool region layout is invalid");

        let region = NonNull::new(unsafe { alloc::alloc::alloc(region_layout) })
            .unwrap_or_else(|| handle_alloc_error(region_layout));

        FixedPool {
            region,
            region_layout,
            chunk,
            capacity,
            high_water: Cell::new(0),
            free: RefCell::new(Vec::new()),
        }
    }

    /// Size of each chunk after alignment padding.
    pub fn chunk_size(&self) -> usize {
        self.chunk.size()
    }

    /// Number of chunks the pool was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn accepts(&self, layout: Layout) -> bool {
        layout.size() <= self.chunk.size() && layout.align() <= self.chunk.align()
    }
}

unsafe impl NodeAllocator for FixedPool {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if !self.accepts(layout) {
            return Err(AllocError::UnsupportedSize(layout.size()));
        }

        if let Some(chunk) = self.free.borrow_mut().pop() {
            return Ok(chunk);
        }

        let used = self.high_water.get();
        if used == self.capacity {
            debug!(
                "fixed pool exhausted after {} chunks of {} bytes",
                self.capacity,
                self.chunk.size()
            );
            return Err(AllocError::Exhausted);
        }
        self.high_water.set(used + 1);

        // `used < capacity`, so the chunk is inside the region.
        Ok(unsafe { NonNull::new_unchecked(self.region.as_ptr().add(used * self.chunk.size())) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
        self.free.borrow_mut().push(ptr);
    }
}

impl Drop for FixedPool {
    fn drop(&mut self) {
        unsafe { dealloc(self.region.as_ptr(), self.region_layout) };
    }
}

/// Dispatches on the exact request size to one of two fixed pools, so each
/// node shape gets a pool of its own.
///
/// Size the two layouts with
/// [`PatriciaSet::LEAF_LAYOUT`](crate::PatriciaSet::LEAF_LAYOUT) and
/// [`PatriciaSet::BRANCH_LAYOUT`](crate::PatriciaSet::BRANCH_LAYOUT). A
/// request matching neither pool is a configuration bug and reports
/// [`AllocError::UnsupportedSize`].
pub struct TwoPool {
    first: FixedPool,
    second: FixedPool,
}

impl TwoPool {
    /// Two pools of `capacity` chunks each, one per layout.
    pub fn new(capacity: usize, first: Layout, second: Layout) -> Self {
        TwoPool {
            first: FixedPool::new(capacity, first),
            second: FixedPool::new(capacity, second),
        }
    }

    fn dispatch(&self, layout: Layout) -> Result<&FixedPool, AllocError> {
        if layout.size() == self.first.chunk_size() {
            Ok(&self.first)
        } else if layout.size() == self.second.chunk_size() {
            Ok(&self.second)
        } else {
            Err(AllocError::UnsupportedSize(layout.size()))
        }
    }
}

unsafe impl NodeAllocator for TwoPool {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.dispatch(layout)?.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        match self.dispatch(layout) {
            Ok(pool) => pool.deallocate(ptr, layout),
            Err(_) => unreachable!("deallocating a size that was never allocated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_are_reused_in_lifo_order() {
        let pool = FixedPool::new(2, Layout::new::<u64>());

        let a = pool.allocate(Layout::new::<u64>()).unwrap();
        let b = pool.allocate(Layout::new::<u64>()).unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.allocate(Layout::new::<u64>()), Err(AllocError::Exhausted));

        unsafe { pool.deallocate(b, Layout::new::<u64>()) };
        assert_eq!(pool.allocate(Layout::new::<u64>()), Ok(b));

        unsafe {
            pool.deallocate(a, Layout::new::<u64>());
            pool.deallocate(b, Layout::new::<u64>());
        }
    }

    #[test]
    fn undersized_requests_fit_a_chunk() {
        let pool = FixedPool::new(1, Layout::new::<[u64; 4]>());
        assert!(pool.allocate(Layout::new::<u64>()).is_ok());
    }

    #[test]
    fn oversized_requests_are_rejected() {
        let pool = FixedPool::new(1, Layout::new::<u64>());
        assert_eq!(
            pool.allocate(Layout::new::<[u64; 2]>()),
            Err(AllocError::UnsupportedSize(16))
        );
    }

    #[test]
    fn two_pool_dispatches_on_exact_size() {
        let small = Layout::from_size_align(16, 8).unwrap();
        let large = Layout::from_size_align(48, 8).unwrap();
        let pools = TwoPool::new(4, small, large);

        let a = pools.allocate(small).unwrap();
        let b = pools.allocate(large).unwrap();
        assert_eq!(
            pools.allocate(Layout::from_size_align(32, 8).unwrap()),
            Err(AllocError::UnsupportedSize(32))
        );

        unsafe {
            pools.deallocate(a, small);
            pools.deallocate(b, large);
        }
    }
}
