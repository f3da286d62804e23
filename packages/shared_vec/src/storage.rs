use std::num::NonZero;
use std::ptr::NonNull;

use crate::raw_buffer::RawBuffer;
use crate::ref_count::RefCount;
use crate::slots;

/// The backing memory of a handle.
///
/// The three states are statically distinguishable, so "owned with a counter"
/// and "view with no counter" can never be confused: a counter exists if and
/// only if the storage is [`Owned`](Self::Owned).
#[derive(Debug)]
pub(crate) enum Storage<T> {
    /// No backing memory at all. The state of a default-constructed or
    /// cleared handle.
    Empty,

    /// A heap buffer under shared, manually counted ownership.
    Owned(SharedBuffer<T>),

    /// A caller-supplied memory region. Never freed by the container, never
    /// has elements dropped by the container, and carries no counter. The
    /// caller owns the region's lifetime.
    Borrowed {
        /// First element of the region.
        data: NonNull<T>,

        /// Number of elements the region was constructed over. Borrowed
        /// storage has no spare slots, so this doubles as the capacity.
        capacity: usize,
    },
}

impl<T> Storage<T> {
    /// Number of element slots the storage can hold without growth.
    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Owned(buffer) => buffer.capacity().get(),
            Self::Borrowed { capacity, .. } => *capacity,
        }
    }

    /// First element slot, if the storage has any backing memory.
    #[must_use]
    pub(crate) fn data_ptr(&self) -> Option<NonNull<T>> {
        match self {
            Self::Empty => None,
            Self::Owned(buffer) => Some(buffer.data()),
            Self::Borrowed { data, .. } => Some(*data),
        }
    }

    /// Number of handles aliasing the buffer; zero when there is no counter.
    #[must_use]
    pub(crate) fn ref_count(&self) -> usize {
        match self {
            Self::Owned(buffer) => buffer.count(),
            Self::Empty | Self::Borrowed { .. } => 0,
        }
    }

    /// Creates an aliasing copy of this storage, incrementing the counter if
    /// one exists. No elements are copied.
    #[must_use]
    pub(crate) fn alias(&self) -> Self {
        match self {
            Self::Empty => Self::Empty,
            Self::Owned(buffer) => Self::Owned(buffer.alias()),
            Self::Borrowed { data, capacity } => Self::Borrowed {
                data: *data,
                capacity: *capacity,
            },
        }
    }

    /// Releases this handle's claim on the storage.
    ///
    /// For owned storage this decrements the counter; at zero, the `len` live
    /// elements are dropped in index order and the buffer and counter cell
    /// are freed together. For empty or borrowed storage this is a no-op.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the first `len` slots hold live elements
    /// and that it does not access the storage afterwards.
    pub(crate) unsafe fn release(self, len: usize) {
        match self {
            Self::Empty | Self::Borrowed { .. } => {}
            Self::Owned(buffer) => {
                // SAFETY: Forwarding the caller's guarantee.
                unsafe { buffer.release(len) };
            }
        }
    }
}

/// An owned buffer and its reference counter, born and freed together.
#[derive(Debug)]
pub(crate) struct SharedBuffer<T> {
    buffer: RawBuffer<T>,
    ref_count: NonNull<RefCount>,
}

impl<T> SharedBuffer<T> {
    /// Allocates a buffer of `capacity` uninitialized slots and a counter
    /// cell, then takes the constructing handle's claim on the pair.
    ///
    /// The counter is born at zero and leaves this function at one.
    #[must_use]
    pub(crate) fn new(capacity: NonZero<usize>) -> Self {
        let this = Self {
            buffer: RawBuffer::new(capacity),
            ref_count: RefCount::allocate(),
        };

        this.counter().increment();
        this
    }

    /// First element slot of the buffer.
    #[must_use]
    pub(crate) fn data(&self) -> NonNull<T> {
        self.buffer.data()
    }

    /// Number of element slots in the buffer.
    #[must_use]
    pub(crate) fn capacity(&self) -> NonZero<usize> {
        self.buffer.capacity()
    }

    /// Current number of handles aliasing this buffer.
    #[must_use]
    pub(crate) fn count(&self) -> usize {
        self.counter().get()
    }

    /// Creates another claim on the same buffer and counter.
    #[must_use]
    pub(crate) fn alias(&self) -> Self {
        self.counter().increment();

        Self {
            buffer: self.buffer.alias(),
            ref_count: self.ref_count,
        }
    }

    /// Gives up this claim. The last claim to be released drops the `len`
    /// live elements and frees the buffer and the counter cell.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the first `len` slots hold live elements.
    pub(crate) unsafe fn release(self, len: usize) {
        if self.counter().decrement() > 0 {
            return;
        }

        debug_assert!(len <= self.buffer.capacity().get());

        // SAFETY: The count reached zero, so this was the last claim: nobody
        // else will touch the elements, the buffer, or the counter cell. The
        // first `len` slots hold live elements per the caller's guarantee.
        unsafe {
            slots::drop_slots(self.buffer.data(), len);
        }

        // SAFETY: Elements were dropped above and no aliasing descriptor
        // remains in use.
        unsafe {
            self.buffer.deallocate();
        }

        // SAFETY: The cell was allocated in new() and the last claim is gone;
        // it is not accessed after this point.
        unsafe {
            RefCount::deallocate(self.ref_count);
        }
    }

    fn counter(&self) -> &RefCount {
        // SAFETY: The cell lives until the last claim releases it, and we
        // hold a claim.
        unsafe { self.ref_count.as_ref() }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use new_zealand::nz;

    use super::*;

    /// Test element that records its drop through a shared register.
    #[derive(Clone, Debug)]
    struct DropCounter {
        drops: Rc<Cell<usize>>,
    }

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[test]
    fn fresh_buffer_has_one_claim() {
        let buffer = SharedBuffer::<u32>::new(nz!(4));

        assert_eq!(buffer.count(), 1);
        assert_eq!(buffer.capacity().get(), 4);

        // SAFETY: No elements were constructed.
        unsafe { buffer.release(0) };
    }

    #[test]
    fn alias_shares_the_counter() {
        let buffer = SharedBuffer::<u32>::new(nz!(4));
        let alias = buffer.alias();

        assert_eq!(buffer.count(), 2);
        assert_eq!(alias.count(), 2);
        assert_eq!(buffer.data(), alias.data());

        // SAFETY: No elements were constructed.
        unsafe { alias.release(0) };

        assert_eq!(buffer.count(), 1);

        // SAFETY: No elements were constructed.
        unsafe { buffer.release(0) };
    }

    #[test]
    fn last_release_drops_live_elements_exactly_once() {
        let drops = Rc::new(Cell::new(0));

        let buffer = SharedBuffer::<DropCounter>::new(nz!(4));
        let alias = buffer.alias();

        for index in 0..3 {
            // SAFETY: Slots 0..3 are within capacity and uninitialized.
            unsafe {
                slots::write_slot(
                    buffer.data(),
                    index,
                    DropCounter {
                        drops: Rc::clone(&drops),
                    },
                );
            }
        }

        // SAFETY: The first 3 slots hold live elements.
        unsafe { buffer.release(3) };

        // Not the last claim - nothing was dropped.
        assert_eq!(drops.get(), 0);

        // SAFETY: The first 3 slots still hold live elements.
        unsafe { alias.release(3) };

        assert_eq!(drops.get(), 3);
    }

    #[test]
    fn empty_and_borrowed_storage_have_no_counter() {
        let empty = Storage::<u32>::Empty;
        assert_eq!(empty.ref_count(), 0);
        assert_eq!(empty.capacity(), 0);
        assert!(empty.data_ptr().is_none());

        let mut region = [1_u32, 2, 3];
        let borrowed = Storage::Borrowed {
            data: NonNull::from(&mut region).cast::<u32>(),
            capacity: 3,
        };

        assert_eq!(borrowed.ref_count(), 0);
        assert_eq!(borrowed.capacity(), 3);

        // Releasing borrowed storage never touches the region.
        // SAFETY: Trivially upheld - the release is a no-op.
        unsafe { borrowed.release(3) };

        assert_eq!(region, [1, 2, 3]);
    }
}
