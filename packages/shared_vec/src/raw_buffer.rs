use std::alloc::{Layout, alloc, dealloc};
use std::num::NonZero;
use std::ptr::NonNull;

/// An allocation of `capacity` uninitialized element slots.
///
/// This is the bridge to the host allocator and nothing more: it acquires the
/// block in [`new()`](Self::new) and returns it in
/// [`deallocate()`](Self::deallocate). It never constructs or drops elements;
/// the element lifecycle is managed by the owning handle, which knows how many
/// slots are live.
///
/// The buffer does not implement `Drop` because multiple handles may hold a
/// descriptor of the same region; the release protocol in `storage` decides
/// which descriptor returns the memory, exactly once.
#[derive(Debug)]
pub(crate) struct RawBuffer<T> {
    /// First element slot of the allocation.
    data: NonNull<T>,

    /// Number of element slots in the allocation. Zero-slot buffers do not
    /// exist; the empty state of the handle is represented without a buffer.
    capacity: NonZero<usize>,
}

impl<T> RawBuffer<T> {
    /// Allocates a buffer of exactly `capacity` element slots, all of them
    /// uninitialized.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or if the allocation cannot be satisfied.
    #[must_use]
    pub(crate) fn new(capacity: NonZero<usize>) -> Self {
        assert!(
            size_of::<T>() > 0,
            "RawBuffer must have non-zero element size"
        );

        let layout = Layout::array::<T>(capacity.get())
            .expect("layout calculation cannot overflow for reasonable capacity values");

        // SAFETY: The layout is non-zero-sized - the element size is verified
        // above and the capacity is NonZero.
        let data = NonNull::new(unsafe { alloc(layout) })
            .expect("we do not intend to handle allocation failure as a real possibility - OOM results in panic")
            .cast::<T>();

        Self { data, capacity }
    }

    /// First element slot of the allocation.
    #[must_use]
    pub(crate) fn data(&self) -> NonNull<T> {
        self.data
    }

    /// Number of element slots in the allocation.
    #[must_use]
    pub(crate) fn capacity(&self) -> NonZero<usize> {
        self.capacity
    }

    /// Creates a second descriptor of the same allocation.
    ///
    /// No memory is allocated or copied. The caller is responsible for
    /// ensuring that only one descriptor ever deallocates the region.
    #[must_use]
    pub(crate) fn alias(&self) -> Self {
        Self {
            data: self.data,
            capacity: self.capacity,
        }
    }

    /// Returns the allocation to the host allocator.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// 1. No live elements remain in the buffer (they have been dropped or
    ///    moved out).
    /// 2. This is the last descriptor of the region that will ever be used;
    ///    no aliasing descriptor accesses the region afterwards.
    pub(crate) unsafe fn deallocate(self) {
        let layout = Layout::array::<T>(self.capacity.get())
            .expect("layout was valid at allocation time and has not changed");

        // SAFETY: The region was allocated in new() with this same layout and
        // the caller guarantees this is the last use of it.
        unsafe {
            dealloc(self.data.as_ptr().cast(), layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use new_zealand::nz;

    use super::*;

    #[test]
    fn allocates_requested_capacity() {
        let buffer = RawBuffer::<u64>::new(nz!(8));

        assert_eq!(buffer.capacity().get(), 8);

        // SAFETY: No elements were constructed, and this is the only descriptor.
        unsafe { buffer.deallocate() };
    }

    #[test]
    fn alias_describes_same_region() {
        let buffer = RawBuffer::<u32>::new(nz!(4));
        let alias = buffer.alias();

        assert_eq!(buffer.data(), alias.data());
        assert_eq!(buffer.capacity(), alias.capacity());

        // SAFETY: No elements were constructed; only one descriptor deallocates.
        unsafe { buffer.deallocate() };
    }

    #[test]
    #[should_panic]
    fn zero_sized_elements_panic() {
        drop(RawBuffer::<()>::new(nz!(1)));
    }
}
