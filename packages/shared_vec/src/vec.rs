use std::fmt;
use std::mem;
use std::num::NonZero;
use std::ops::{Index, IndexMut};
use std::ptr::{self, NonNull};
use std::slice;

use new_zealand::nz;

use crate::slots;
use crate::storage::{SharedBuffer, Storage};

/// Capacity adopted by the first growth of a handle that has no capacity yet.
///
/// A handle that grows from zero capacity jumps straight here instead of
/// doubling, so the first few pushes trigger exactly one allocation.
pub(crate) const INITIAL_CAPACITY: NonZero<usize> = nz!(10);

/// A reference-counted dynamic array with copy-on-write growth and zero-copy
/// views over caller-supplied memory.
///
/// `SharedVec<T>` is built for single-threaded sandboxed execution
/// environments where heap behavior must be explicit, deterministic, and
/// cheap. It has two ownership modes:
///
/// - **Owned**: the handle holds a heap buffer under shared, manually counted
///   ownership. Cloning a handle aliases the same buffer and increments the
///   counter; no elements are copied. The buffer and its counter are freed
///   together, exactly once, when the last aliasing handle releases them.
/// - **Borrowed**: the handle wraps an externally supplied memory region (for
///   example, incoming call payload data) with zero copying and no ownership
///   tracking. See [`from_raw_parts()`](Self::from_raw_parts).
///
/// # Growth is always a clone
///
/// Growing never reuses the existing buffer, even when the growing handle is
/// its sole owner: a new buffer and a fresh counter are allocated, the live
/// elements are cloned across in order, and the old buffer is released
/// through the normal protocol. Consumers can therefore rely on the exact
/// post-growth reference counts: the grower ends up alone on a new buffer,
/// and any siblings keep their claims on the old one.
///
/// A borrowed handle has no spare capacity, so its first push triggers
/// growth, which transparently promotes it to owned.
///
/// # Aliasing
///
/// The container never retains references to its elements. All handles
/// aliasing one buffer may mutate elements in place, and such writes are
/// immediately visible through every aliasing handle - only growth clones,
/// in-place writes never do. Exclusive references obtained from two aliasing
/// handles must not be alive at the same time; under the single-threaded
/// execution model this is the natural usage. [`as_ptr()`](Self::as_ptr) is
/// the escape hatch for advanced out-of-band access.
///
/// # Fault model
///
/// Out-of-range indexing and allocator exhaustion are fatal: they panic at
/// the access site, which the target runtime turns into an abort of the
/// current execution. There are no recoverable error paths and no retries;
/// every operation is a deterministic single attempt.
///
/// # Examples
///
/// Basic usage:
///
/// ```rust
/// use shared_vec::SharedVec;
///
/// let mut values = SharedVec::new();
/// values.push(1_u64);
/// values.push(2_u64);
///
/// assert_eq!(values.len(), 2);
/// assert_eq!(values[0], 1);
/// assert_eq!(values[1], 2);
/// ```
///
/// Cloning aliases the buffer instead of copying elements:
///
/// ```rust
/// use shared_vec::SharedVec;
///
/// let mut original = SharedVec::with_capacity(4);
/// original.push("payload".to_string());
///
/// let alias = original.clone();
///
/// assert_eq!(original.ref_count(), 2);
/// assert_eq!(alias.ref_count(), 2);
/// assert_eq!(original.as_ptr(), alias.as_ptr());
/// ```
///
/// # Thread safety
///
/// `SharedVec<T>` is neither [`Send`] nor [`Sync`]: the reference counter is
/// a plain non-atomic integer, which is a correctness precondition of the
/// single-threaded execution context this container targets, not an
/// optimization. Porting it into a multi-threaded host requires atomic
/// counters or an exclusive-ownership redesign.
pub struct SharedVec<T> {
    /// Number of live elements. Slots at `[0, len)` hold constructed values;
    /// slots at `[len, capacity)` are uninitialized storage.
    len: usize,

    /// The backing memory, if any, and its ownership mode.
    storage: Storage<T>,
}

impl<T> SharedVec<T> {
    /// Creates an empty handle with no backing memory.
    ///
    /// No allocation is performed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shared_vec::SharedVec;
    ///
    /// let values = SharedVec::<u64>::new();
    ///
    /// assert_eq!(values.len(), 0);
    /// assert_eq!(values.capacity(), 0);
    /// assert_eq!(values.ref_count(), 0);
    /// assert!(values.as_ptr().is_null());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            len: 0,
            storage: Storage::Empty,
        }
    }

    /// Creates an owned handle with a buffer of exactly `capacity` slots and
    /// a fresh reference counter claimed by this handle.
    ///
    /// A capacity of zero performs no allocation and is equivalent to
    /// [`new()`](Self::new).
    ///
    /// # Example
    ///
    /// ```rust
    /// use shared_vec::SharedVec;
    ///
    /// let values = SharedVec::<u64>::with_capacity(10);
    ///
    /// assert_eq!(values.capacity(), 10);
    /// assert_eq!(values.len(), 0);
    /// assert_eq!(values.ref_count(), 1);
    /// ```
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        match NonZero::new(capacity) {
            None => Self::new(),
            Some(capacity) => Self {
                len: 0,
                storage: Storage::Owned(SharedBuffer::new(capacity)),
            },
        }
    }

    /// Creates a borrowed handle over a caller-supplied memory region of
    /// `len` already-populated elements.
    ///
    /// No elements are constructed, copied, or dropped, no allocation is
    /// performed, and no reference counter exists: the caller owns the
    /// region's lifetime. Capacity equals `len`, so the first push grows
    /// into an owned buffer and leaves the region untouched.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// 1. `data` points to at least `len` initialized elements of type `T`.
    /// 2. The region outlives this handle and every handle cloned from it,
    ///    or those handles are cleared or promoted to owned first.
    /// 3. The region is valid for writes if elements are mutated through the
    ///    handle; a region that is shared input data must be treated as
    ///    read-only.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::ptr::NonNull;
    ///
    /// use shared_vec::SharedVec;
    ///
    /// let mut payload = [1_u64, 2, 3];
    ///
    /// // SAFETY: The region holds 3 initialized elements and outlives the handle.
    /// let view = unsafe { SharedVec::from_raw_parts(NonNull::from(&mut payload).cast::<u64>(), 3) };
    ///
    /// assert_eq!(view.len(), 3);
    /// assert_eq!(view.capacity(), 3);
    /// assert_eq!(view.ref_count(), 0);
    /// assert_eq!(view[2], 3);
    /// ```
    #[must_use]
    pub unsafe fn from_raw_parts(data: NonNull<T>, len: usize) -> Self {
        Self {
            len,
            storage: Storage::Borrowed {
                data,
                capacity: len,
            },
        }
    }

    /// The number of live elements.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the handle holds no live elements.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of element slots the handle can hold without growing.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// The number of handles currently aliasing this handle's buffer.
    ///
    /// Zero for empty and borrowed handles, which have no counter.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.storage.ref_count()
    }

    /// The data pointer; null when the handle has no backing memory.
    ///
    /// The pointer stays valid for as long as a handle aliasing the same
    /// buffer exists and does not grow. This is the escape hatch for
    /// out-of-band access; the container itself retains no references to
    /// the elements.
    #[must_use]
    pub fn as_ptr(&self) -> *const T {
        self.storage
            .data_ptr()
            .map_or(ptr::null(), |data| data.as_ptr().cast_const())
    }

    /// The live elements as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        self.storage.data_ptr().map_or(&[], |data| {
            // SAFETY: The first `len` slots hold live elements and no
            // exclusive reference to them is alive while `&self` is held.
            unsafe { slice::from_raw_parts(data.as_ptr(), self.len) }
        })
    }

    /// The live elements as a mutable slice.
    ///
    /// Writes through the slice are immediately visible through every handle
    /// aliasing the same buffer; see the type-level aliasing notes.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.storage.data_ptr().map_or(&mut [], |data| {
            // SAFETY: The first `len` slots hold live elements; the caller
            // holds the only exclusive borrow of this handle, and aliasing
            // handles are not borrowed at the same time per the container's
            // usage contract.
            unsafe { slice::from_raw_parts_mut(data.as_ptr(), self.len) }
        })
    }

    /// Iterates over the live elements.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Iterates over the live elements with mutable access.
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Ensures the handle can hold at least `min_capacity` elements.
    ///
    /// A no-op if the current capacity is already sufficient. Otherwise the
    /// handle grows: a new buffer of exactly `min_capacity` slots and a
    /// fresh counter are allocated, the live elements are cloned across in
    /// order, and the old buffer is released through the normal protocol -
    /// even when this handle was its sole owner.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shared_vec::SharedVec;
    ///
    /// let mut values = SharedVec::<u64>::new();
    ///
    /// values.reserve(5);
    /// assert_eq!(values.capacity(), 5);
    /// assert_eq!(values.ref_count(), 1);
    ///
    /// // Already sufficient - nothing happens.
    /// values.reserve(2);
    /// assert_eq!(values.capacity(), 5);
    /// ```
    pub fn reserve(&mut self, min_capacity: usize)
    where
        T: Clone,
    {
        if self.capacity() >= min_capacity {
            return;
        }

        let new_capacity = NonZero::new(min_capacity)
            .expect("guarded above: min_capacity exceeds the current capacity, so it is nonzero");

        self.grow(new_capacity);
    }

    /// Appends an element.
    ///
    /// If the handle is full it grows first: to double its capacity, or to
    /// the fixed initial capacity of 10 when it has none yet. A full
    /// borrowed handle (always, by construction) is thereby promoted to an
    /// owned one.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shared_vec::SharedVec;
    ///
    /// let mut values = SharedVec::new();
    ///
    /// values.push(7_u64);
    ///
    /// assert_eq!(values.len(), 1);
    /// assert_eq!(values.capacity(), 10);
    /// assert_eq!(values.ref_count(), 1);
    /// ```
    pub fn push(&mut self, value: T)
    where
        T: Clone,
    {
        if self.capacity() <= self.len {
            let new_capacity = match NonZero::new(self.capacity()) {
                None => INITIAL_CAPACITY,
                Some(capacity) => capacity
                    .checked_mul(nz!(2))
                    .expect("capacity doubling cannot overflow before memory is exhausted"),
            };

            self.grow(new_capacity);
        }

        let data = self
            .storage
            .data_ptr()
            .expect("the growth above guarantees backing storage with a spare slot");

        // SAFETY: After the growth above, len < capacity, so the slot is
        // within the buffer and uninitialized.
        unsafe {
            slots::write_slot(data, self.len, value);
        }

        // Cannot overflow - the slot existed, so len was below capacity,
        // which is bounded by memory.
        self.len = self.len.wrapping_add(1);

        #[cfg(debug_assertions)]
        self.integrity_check();
    }

    /// Releases this handle's claim on its buffer and resets it to the
    /// default empty state, regardless of surviving aliases.
    ///
    /// If this was the last claim on an owned buffer, the live elements are
    /// dropped in index order and the buffer and counter are freed. Clearing
    /// a borrowed or already-empty handle touches nothing. Idempotent.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shared_vec::SharedVec;
    ///
    /// let mut values = SharedVec::with_capacity(4);
    /// values.push(1_u64);
    ///
    /// values.clear();
    ///
    /// assert_eq!(values.len(), 0);
    /// assert_eq!(values.capacity(), 0);
    /// assert_eq!(values.ref_count(), 0);
    /// assert!(values.as_ptr().is_null());
    /// ```
    pub fn clear(&mut self) {
        let storage = mem::replace(&mut self.storage, Storage::Empty);

        // SAFETY: The first `len` slots of the released storage hold live
        // elements, and this handle no longer refers to it.
        unsafe {
            storage.release(self.len);
        }

        self.len = 0;

        #[cfg(debug_assertions)]
        self.integrity_check();
    }

    /// Grows into a brand-new buffer of `new_capacity` slots.
    ///
    /// Deliberately never reuses the old buffer, even when this handle is
    /// its sole owner: the observable post-growth reference counts are part
    /// of the contract.
    fn grow(&mut self, new_capacity: NonZero<usize>)
    where
        T: Clone,
    {
        debug_assert!(new_capacity.get() >= self.len);

        let new_buffer = SharedBuffer::new(new_capacity);

        if let Some(src) = self.storage.data_ptr() {
            // SAFETY: The first `len` slots of the old storage hold live
            // elements; the new buffer has at least `len` uninitialized
            // slots and the two allocations cannot overlap.
            unsafe {
                slots::clone_into_slots(src, new_buffer.data(), self.len);
            }
        }

        let old = mem::replace(&mut self.storage, Storage::Owned(new_buffer));

        // SAFETY: The first `len` slots of the old storage hold live
        // elements, and this handle no longer refers to it.
        unsafe {
            old.release(self.len);
        }

        #[cfg(debug_assertions)]
        self.integrity_check();
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    fn integrity_check(&self) {
        assert!(
            self.len <= self.storage.capacity(),
            "handle length {} exceeds its capacity {}",
            self.len,
            self.storage.capacity(),
        );

        if let Storage::Owned(_) = self.storage {
            assert!(
                self.storage.ref_count() > 0,
                "owned storage with a dead reference counter"
            );
        }
    }
}

impl<T> Default for SharedVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SharedVec<T> {
    /// Creates another handle aliasing the same buffer.
    ///
    /// Capacity, length, and data pointer are shared; if the buffer is
    /// owned, its counter is incremented. No elements are cloned - this is
    /// alias sharing, not a deep copy, which is why `T: Clone` is not
    /// required.
    fn clone(&self) -> Self {
        Self {
            len: self.len,
            storage: self.storage.alias(),
        }
    }

    /// Releases whatever this handle currently references, then aliases
    /// `source` exactly as [`clone()`](Self::clone) does.
    fn clone_from(&mut self, source: &Self) {
        let old = mem::replace(&mut self.storage, source.storage.alias());

        // SAFETY: The first `len` slots of the released storage hold live
        // elements, and this handle no longer refers to it.
        unsafe {
            old.release(self.len);
        }

        self.len = source.len;
    }
}

impl<T> Drop for SharedVec<T> {
    fn drop(&mut self) {
        let storage = mem::replace(&mut self.storage, Storage::Empty);

        // SAFETY: The first `len` slots of the released storage hold live
        // elements, and this handle is going away.
        unsafe {
            storage.release(self.len);
        }
    }
}

impl<T> Index<usize> for SharedVec<T> {
    type Output = T;

    /// Returns the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`. An out-of-range access is a fatal bounds
    /// violation with no recoverable error path; the target runtime turns
    /// the panic into an abort of the current execution.
    fn index(&self, index: usize) -> &T {
        assert!(
            index < self.len,
            "index {index} out of bounds in vector of length {}",
            self.len,
        );

        let data = self
            .storage
            .data_ptr()
            .expect("nonzero length guarantees backing storage");

        // SAFETY: index < len, so the slot holds a live element; the shared
        // borrow of this handle keeps the buffer alive.
        unsafe { data.add(index).as_ref() }
    }
}

impl<T> IndexMut<usize> for SharedVec<T> {
    /// Returns the element at `index` with exclusive access.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`, exactly as [`Index`] does.
    fn index_mut(&mut self, index: usize) -> &mut T {
        assert!(
            index < self.len,
            "index {index} out of bounds in vector of length {}",
            self.len,
        );

        let data = self
            .storage
            .data_ptr()
            .expect("nonzero length guarantees backing storage");

        // SAFETY: index < len, so the slot holds a live element; the
        // exclusive borrow of this handle prevents overlapping access
        // through it, and aliasing handles are not borrowed at the same
        // time per the container's usage contract.
        unsafe { data.add(index).as_mut() }
    }
}

impl<'a, T> IntoIterator for &'a SharedVec<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut SharedVec<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T: Clone> Extend<T> for SharedVec<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<T: PartialEq> PartialEq for SharedVec<T> {
    /// Compares the live elements, not buffer identity: two handles are
    /// equal when their contents are, whether or not they alias.
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for SharedVec<T> {}

impl<T: fmt::Debug> fmt::Debug for SharedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedVec")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("ref_count", &self.ref_count())
            .field("elements", &self.as_slice())
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::indexing_slicing,
    reason = "test code intentionally exercises the panicking index operators"
)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use static_assertions::assert_not_impl_any;

    use super::*;

    /// Shared registers counting element lifecycle events, so tests can pin
    /// exactly how many clones and drops an operation performs.
    #[derive(Debug, Default)]
    struct CallRegister {
        clones: Cell<usize>,
        drops: Cell<usize>,
    }

    impl CallRegister {
        fn reset(&self) {
            self.clones.set(0);
            self.drops.set(0);
        }

        fn all_zero(&self) -> bool {
            self.clones.get() == 0 && self.drops.get() == 0
        }
    }

    /// Test element wired to a [`CallRegister`].
    #[derive(Debug)]
    struct Tracked {
        a: u64,
        b: u64,
        register: Rc<CallRegister>,
    }

    impl Tracked {
        fn new(a: u64, b: u64, register: &Rc<CallRegister>) -> Self {
            Self {
                a,
                b,
                register: Rc::clone(register),
            }
        }
    }

    impl Clone for Tracked {
        fn clone(&self) -> Self {
            self.register.clones.set(self.register.clones.get() + 1);

            Self {
                a: self.a,
                b: self.b,
                register: Rc::clone(&self.register),
            }
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.register.drops.set(self.register.drops.get() + 1);
        }
    }

    #[test]
    fn default_handle_is_empty_without_allocation() {
        let values = SharedVec::<Tracked>::new();

        assert_eq!(values.capacity(), 0);
        assert_eq!(values.len(), 0);
        assert!(values.as_ptr().is_null());
        assert_eq!(values.ref_count(), 0);

        let defaulted = SharedVec::<Tracked>::default();
        assert_eq!(defaulted.capacity(), 0);
    }

    #[test]
    fn borrowed_view_wraps_region_without_touching_elements() {
        let register = Rc::new(CallRegister::default());
        let mut region = [
            Tracked::new(1, 2, &register),
            Tracked::new(2, 3, &register),
            Tracked::new(4, 5, &register),
        ];
        register.reset();

        // SAFETY: The region holds 3 initialized elements and outlives the
        // handle.
        let view =
            unsafe { SharedVec::from_raw_parts(NonNull::from(&mut region).cast::<Tracked>(), 3) };

        assert_eq!(view.capacity(), 3);
        assert_eq!(view.len(), 3);
        assert_eq!(view.as_ptr(), region.as_ptr());
        assert_eq!(view.ref_count(), 0);

        for (index, expected) in [(0_usize, (1, 2)), (1, (2, 3)), (2, (4, 5))] {
            assert_eq!(view[index].a, expected.0);
            assert_eq!(view[index].b, expected.1);
        }

        // Constructing and reading the view performed no element work.
        assert!(register.all_zero());

        drop(view);

        // Dropping a borrowed handle never drops the caller's elements.
        assert!(register.all_zero());
    }

    #[test]
    fn clear_resets_to_empty_state_and_is_idempotent() {
        let register = Rc::new(CallRegister::default());
        let mut region = [Tracked::new(1, 2, &register)];
        register.reset();

        // SAFETY: The region holds 1 initialized element and outlives the
        // handle.
        let mut view =
            unsafe { SharedVec::from_raw_parts(NonNull::from(&mut region).cast::<Tracked>(), 1) };

        view.clear();

        assert_eq!(view.capacity(), 0);
        assert_eq!(view.len(), 0);
        assert!(view.as_ptr().is_null());
        assert_eq!(view.ref_count(), 0);
        assert!(register.all_zero());

        // Clearing an already-empty handle is a no-op.
        view.clear();
        assert_eq!(view.capacity(), 0);
        assert!(register.all_zero());
    }

    #[test]
    fn with_capacity_allocates_and_takes_the_first_claim() {
        let values = SharedVec::<u64>::with_capacity(10);

        assert_eq!(values.capacity(), 10);
        assert_eq!(values.len(), 0);
        assert!(!values.as_ptr().is_null());
        assert_eq!(values.ref_count(), 1);
    }

    #[test]
    fn with_capacity_zero_is_the_empty_handle() {
        let values = SharedVec::<u64>::with_capacity(0);

        assert_eq!(values.capacity(), 0);
        assert!(values.as_ptr().is_null());
        assert_eq!(values.ref_count(), 0);
    }

    #[test]
    fn first_push_jumps_to_the_initial_capacity() {
        let register = Rc::new(CallRegister::default());
        let mut values = SharedVec::new();

        values.push(Tracked::new(0, 1, &register));
        assert_eq!(values.capacity(), 10);

        for pair in [(2, 3), (4, 5), (6, 7), (8, 9)] {
            values.push(Tracked::new(pair.0, pair.1, &register));
        }

        assert_eq!(values.capacity(), 10);
        assert_eq!(values.len(), 5);
        assert_eq!(values.ref_count(), 1);

        // Pushing moves the values in and nothing was live during the single
        // growth, so no element was ever cloned.
        assert_eq!(register.clones.get(), 0);
        assert_eq!(register.drops.get(), 0);
    }

    #[test]
    fn clone_aliases_the_buffer() {
        let mut original = SharedVec::with_capacity(10);
        for value in 0..5_u64 {
            original.push(value);
        }

        let alias = original.clone();

        assert_eq!(original.ref_count(), 2);
        assert_eq!(alias.ref_count(), 2);
        assert_eq!(original.as_ptr(), alias.as_ptr());
        assert_eq!(original.capacity(), alias.capacity());
        assert_eq!(original.len(), alias.len());
    }

    #[test]
    fn clone_from_releases_the_old_claim_first() {
        let register = Rc::new(CallRegister::default());

        let mut original = SharedVec::new();
        for pair in [(0, 1), (2, 3), (4, 5)] {
            original.push(Tracked::new(pair.0, pair.1, &register));
        }

        let mut assigned = SharedVec::new();
        assigned.clone_from(&original);

        assert_eq!(assigned.capacity(), 10);
        assert_eq!(assigned.len(), 3);
        assert_eq!(assigned.ref_count(), 2);
        assert_eq!(assigned.as_ptr(), original.as_ptr());

        // Reassigning away from the shared buffer releases one claim without
        // dropping any elements.
        register.reset();
        let replacement = SharedVec::new();
        assigned.clone_from(&replacement);

        assert_eq!(register.drops.get(), 0);
        assert_eq!(original.ref_count(), 1);
    }

    #[test]
    fn reserve_allocates_without_cloning_anything() {
        let register = Rc::new(CallRegister::default());
        let mut values = SharedVec::<Tracked>::new();

        values.reserve(5);

        assert_eq!(values.capacity(), 5);
        assert_eq!(values.len(), 0);
        assert!(!values.as_ptr().is_null());
        assert_eq!(values.ref_count(), 1);
        assert!(register.all_zero());

        // Already sufficient - a smaller reservation changes nothing.
        let data_before = values.as_ptr();
        values.reserve(2);

        assert_eq!(values.capacity(), 5);
        assert_eq!(values.as_ptr(), data_before);
        assert_eq!(values.ref_count(), 1);
    }

    #[test]
    fn filling_reserved_capacity_never_grows() {
        let register = Rc::new(CallRegister::default());
        let mut values = SharedVec::new();
        values.reserve(5);

        for pair in [(0, 1), (2, 3), (4, 5), (6, 7), (8, 9)] {
            values.push(Tracked::new(pair.0, pair.1, &register));
        }

        assert_eq!(values.capacity(), 5);
        assert_eq!(values.len(), 5);
        assert_eq!(values.ref_count(), 1);
        assert_eq!(register.clones.get(), 0);
    }

    #[test]
    fn growth_after_clone_separates_the_buffers() {
        let register = Rc::new(CallRegister::default());
        let mut original = SharedVec::new();
        original.reserve(5);

        for pair in [(0, 1), (2, 3), (4, 5), (6, 7), (8, 9)] {
            original.push(Tracked::new(pair.0, pair.1, &register));
        }

        let mut pusher = original.clone();
        assert_eq!(original.ref_count(), 2);
        assert_eq!(pusher.ref_count(), 2);

        register.reset();
        pusher.push(Tracked::new(10, 11, &register));

        // The full handle grew into a fresh buffer, cloning each of the 5
        // live elements exactly once; the pushed value itself was moved.
        assert_eq!(pusher.capacity(), 10);
        assert_eq!(pusher.len(), 6);
        assert_eq!(register.clones.get(), 5);

        // Each handle now holds the sole claim on its own buffer.
        assert_eq!(original.ref_count(), 1);
        assert_eq!(pusher.ref_count(), 1);
        assert_ne!(original.as_ptr(), pusher.as_ptr());
        assert_eq!(original.capacity(), 5);
        assert_eq!(original.len(), 5);
    }

    #[test]
    fn only_the_last_clear_drops_the_elements() {
        let register = Rc::new(CallRegister::default());
        let mut first = SharedVec::new();

        for pair in [(0, 1), (2, 3), (4, 5), (6, 7), (8, 9)] {
            first.push(Tracked::new(pair.0, pair.1, &register));
        }

        let mut second = first.clone();

        register.reset();
        first.clear();

        // Not the last owner - the counter dropped, the elements did not.
        assert_eq!(first.ref_count(), 0);
        assert_eq!(second.ref_count(), 1);
        assert_eq!(register.drops.get(), 0);

        register.reset();
        second.clear();

        // Last owner - every live element dropped exactly once.
        assert_eq!(second.ref_count(), 0);
        assert_eq!(register.drops.get(), 5);

        for handle in [&first, &second] {
            assert_eq!(handle.capacity(), 0);
            assert_eq!(handle.len(), 0);
            assert!(handle.as_ptr().is_null());
        }
    }

    #[test]
    fn dropping_the_last_handle_drops_the_elements() {
        let register = Rc::new(CallRegister::default());

        {
            let mut values = SharedVec::new();
            values.push(Tracked::new(1, 2, &register));
            values.push(Tracked::new(3, 4, &register));

            let _alias = values.clone();
            register.reset();
        }

        assert_eq!(register.drops.get(), 2);
    }

    #[test]
    fn indexing_reads_elements_without_side_effects() {
        let register = Rc::new(CallRegister::default());
        let mut values = SharedVec::new();

        for pair in [(0, 1), (2, 3), (4, 5)] {
            values.push(Tracked::new(pair.0, pair.1, &register));
        }

        register.reset();

        assert_eq!(values[0].a, 0);
        assert_eq!(values[1].a, 2);
        assert_eq!(values[2].b, 5);
        assert!(register.all_zero());
    }

    #[test]
    #[should_panic]
    fn indexing_at_len_panics() {
        let mut values = SharedVec::new();
        values.push(1_u64);
        values.push(2_u64);

        _ = values[2];
    }

    #[test]
    #[should_panic]
    fn indexing_an_empty_handle_panics() {
        let values = SharedVec::<u64>::new();

        _ = values[0];
    }

    #[test]
    #[should_panic]
    fn indexing_mutably_out_of_bounds_panics() {
        let mut values = SharedVec::new();
        values.push(1_u64);

        values[1] = 2;
    }

    #[test]
    fn writes_through_one_handle_are_visible_through_its_alias() {
        let mut writer = SharedVec::with_capacity(4);
        writer.push(1_u64);
        writer.push(2_u64);

        let reader = writer.clone();

        writer[1] = 42;

        assert_eq!(reader[1], 42);
        assert_eq!(writer.ref_count(), 2);
    }

    #[test]
    fn first_push_promotes_a_borrowed_view_to_owned() {
        let mut region = [10_u64, 20, 30];

        // SAFETY: The region holds 3 initialized elements and outlives the
        // handle.
        let mut view =
            unsafe { SharedVec::from_raw_parts(NonNull::from(&mut region).cast::<u64>(), 3) };

        view.push(40);

        // The view grew into its own buffer: doubled capacity, a counter of
        // its own, and the caller's region left untouched.
        assert_eq!(view.capacity(), 6);
        assert_eq!(view.len(), 4);
        assert_eq!(view.ref_count(), 1);
        assert_ne!(view.as_ptr(), region.as_ptr());
        assert_eq!(view.as_slice(), [10, 20, 30, 40]);
        assert_eq!(region, [10, 20, 30]);
    }

    #[test]
    fn extend_appends_in_order() {
        let mut values = SharedVec::new();
        values.extend([1_u64, 2, 3]);

        assert_eq!(values.as_slice(), [1, 2, 3]);
        assert_eq!(values.capacity(), 10);
    }

    #[test]
    fn equality_compares_contents_not_identity() {
        let mut left = SharedVec::new();
        left.extend([1_u64, 2, 3]);

        let mut right = SharedVec::with_capacity(3);
        right.extend([1_u64, 2, 3]);

        assert_ne!(left.as_ptr(), right.as_ptr());
        assert_eq!(left, right);

        right[2] = 4;
        assert_ne!(left, right);
    }

    #[test]
    fn iteration_covers_the_live_range() {
        let mut values = SharedVec::new();
        values.extend([1_u64, 2, 3]);

        let collected: Vec<u64> = values.iter().copied().collect();
        assert_eq!(collected, [1, 2, 3]);

        for value in &mut values {
            *value += 1;
        }

        assert_eq!(values.as_slice(), [2, 3, 4]);
    }

    #[test]
    fn thread_mobility_is_denied() {
        assert_not_impl_any!(SharedVec<u64>: Send, Sync);
    }
}
