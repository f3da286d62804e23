//! A reference-counted dynamic array with copy-on-write growth and zero-copy
//! views over caller-supplied memory.
//!
//! This crate provides [`SharedVec`], a dynamic-array container designed for
//! single-threaded sandboxed execution environments (such as smart-contract
//! runtimes) where heap behavior must be explicit, deterministic, and cheap.
//!
//! # Key features
//!
//! - **Aliasing handles**: cloning a handle shares the buffer under a manual
//!   reference count instead of copying elements
//! - **Copy-on-write growth**: growing always clones into a brand-new buffer,
//!   never reuses the old one, so post-growth reference counts are exact and
//!   deterministic
//! - **Zero-copy views**: a handle can wrap an externally supplied memory
//!   region (for example, incoming call payload data) without copying or
//!   taking ownership
//! - **Transparent promotion**: the first growth-triggering mutation turns a
//!   view into an independently owned buffer
//! - **Crash-only fault model**: out-of-range indexing and allocator
//!   exhaustion abort the current execution; there are no recoverable error
//!   paths and no retries
//!
//! # Examples
//!
//! Handles alias, growth separates:
//!
//! ```rust
//! use shared_vec::SharedVec;
//!
//! let mut original = SharedVec::with_capacity(2);
//! original.push(1_u64);
//! original.push(2_u64);
//!
//! // Cloning shares the buffer - both handles now count two claims.
//! let mut sibling = original.clone();
//! assert_eq!(original.ref_count(), 2);
//!
//! // The sibling is full, so this push grows it into its own buffer.
//! sibling.push(3);
//!
//! assert_eq!(original.ref_count(), 1);
//! assert_eq!(sibling.ref_count(), 1);
//! assert_eq!(original.len(), 2);
//! assert_eq!(sibling.len(), 3);
//! ```
//!
//! Zero-copy views over caller memory:
//!
//! ```rust
//! use std::ptr::NonNull;
//!
//! use shared_vec::SharedVec;
//!
//! let mut payload = [10_u64, 20, 30];
//!
//! // SAFETY: The region holds 3 initialized elements and outlives the view.
//! let view = unsafe { SharedVec::from_raw_parts(NonNull::from(&mut payload).cast::<u64>(), 3) };
//!
//! assert_eq!(view.as_slice(), [10, 20, 30]);
//! assert_eq!(view.ref_count(), 0); // No counter - the caller owns the region.
//! ```
//!
//! # Thread safety
//!
//! [`SharedVec`] is neither [`Send`] nor [`Sync`]. The reference counter is a
//! plain non-atomic integer, which is a correctness precondition of the
//! single-threaded execution context this container targets.

mod raw_buffer;
mod ref_count;
mod slots;
mod storage;
mod vec;

pub use vec::SharedVec;
