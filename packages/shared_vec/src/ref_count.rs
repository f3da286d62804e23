use std::cell::Cell;
use std::ptr::NonNull;

/// A heap cell counting how many handles alias one buffer.
///
/// The count is a plain non-atomic integer. This is a correctness
/// precondition, not an optimization: the execution environment guarantees
/// that one handle graph is only ever manipulated by a single logical thread
/// of control. The containing types are neither [`Send`] nor [`Sync`], which
/// upholds that guarantee on the host as well.
///
/// The cell is created at zero; the handle that adopts the buffer takes the
/// first claim by incrementing. The cell is freed together with the buffer by
/// whichever handle decrements the count back to zero.
#[derive(Debug)]
pub(crate) struct RefCount {
    count: Cell<usize>,
}

impl RefCount {
    /// Allocates a fresh counter cell with a count of zero.
    #[must_use]
    pub(crate) fn allocate() -> NonNull<Self> {
        let cell = Box::new(Self {
            count: Cell::new(0),
        });

        // SAFETY: Box::into_raw never returns null.
        unsafe { NonNull::new_unchecked(Box::into_raw(cell)) }
    }

    /// Returns the counter cell to the allocator.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `cell` came from [`allocate()`](Self::allocate),
    /// has not been deallocated before, and is never accessed afterwards.
    pub(crate) unsafe fn deallocate(cell: NonNull<Self>) {
        // SAFETY: The pointer originates from Box::into_raw in allocate() and
        // the caller guarantees this is its last use.
        drop(unsafe { Box::from_raw(cell.as_ptr()) });
    }

    /// Current number of aliasing handles.
    #[must_use]
    pub(crate) fn get(&self) -> usize {
        self.count.get()
    }

    /// Records one more aliasing handle.
    pub(crate) fn increment(&self) {
        // Cannot overflow - that would require more live handles than there
        // are addressable bytes.
        self.count.set(self.count.get().wrapping_add(1));
    }

    /// Records one less aliasing handle and returns the remaining count.
    ///
    /// # Panics
    ///
    /// Panics if the count is already zero, which would indicate a release
    /// protocol violation.
    pub(crate) fn decrement(&self) -> usize {
        let current = self.count.get();

        assert!(
            current > 0,
            "release protocol violation: decremented a reference count that was already zero"
        );

        // Cannot underflow, guarded above.
        let remaining = current.wrapping_sub(1);
        self.count.set(remaining);
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let cell = RefCount::allocate();

        // SAFETY: The cell is valid until deallocated below.
        let count = unsafe { cell.as_ref() };
        assert_eq!(count.get(), 0);

        // SAFETY: Freshly allocated above, not used afterwards.
        unsafe { RefCount::deallocate(cell) };
    }

    #[test]
    fn counts_up_and_down() {
        let cell = RefCount::allocate();

        // SAFETY: The cell is valid until deallocated below.
        let count = unsafe { cell.as_ref() };

        count.increment();
        count.increment();
        assert_eq!(count.get(), 2);

        assert_eq!(count.decrement(), 1);
        assert_eq!(count.decrement(), 0);

        // SAFETY: Freshly allocated above, not used afterwards.
        unsafe { RefCount::deallocate(cell) };
    }

    #[test]
    #[should_panic]
    fn decrement_below_zero_panics() {
        let cell = RefCount::allocate();

        // SAFETY: The cell is valid; the panic below leaks it, which is
        // acceptable in a should_panic test.
        let count = unsafe { cell.as_ref() };

        _ = count.decrement();
    }
}
