//! Demonstrates aliasing handles, copy-on-write growth, and zero-copy views.
//!
//! This example walks through the three behaviors that make `SharedVec`
//! different from an ordinary vector: cloning shares the buffer instead of
//! copying elements, growth always separates into a new buffer, and a handle
//! can wrap caller-supplied memory without owning it.

use std::ptr::NonNull;

use shared_vec::SharedVec;

fn main() {
    println!("=== SharedVec Aliasing Examples ===");
    println!();

    // Example 1: Cloning aliases the buffer.
    println!("Example 1: Cloning aliases the buffer");
    println!("-------------------------------------");

    let mut original = SharedVec::with_capacity(4);
    original.push(1_u64);
    original.push(2_u64);

    let alias = original.clone();

    println!("After cloning:");
    println!("  original ref_count: {}", original.ref_count());
    println!("  alias ref_count:    {}", alias.ref_count());
    println!(
        "  same buffer:        {}",
        original.as_ptr() == alias.as_ptr()
    );

    // Writes through one handle are visible through the other.
    original[0] = 42;
    println!("  alias sees write:   alias[0] = {}", alias[0]);

    println!();

    // Example 2: Growth always clones into a new buffer.
    println!("Example 2: Copy-on-write growth");
    println!("-------------------------------");

    let mut grower = SharedVec::with_capacity(2);
    grower.push(10_u64);
    grower.push(20_u64);

    let sibling = grower.clone();
    println!("Before growth: shared ref_count = {}", grower.ref_count());

    // The handle is full, so this push grows into a brand-new buffer.
    grower.push(30);

    println!("After growth:");
    println!("  grower ref_count:  {} (new buffer)", grower.ref_count());
    println!("  sibling ref_count: {} (old buffer)", sibling.ref_count());
    println!("  grower:  {:?}", grower.as_slice());
    println!("  sibling: {:?}", sibling.as_slice());

    println!();

    // Example 3: Zero-copy views over caller memory.
    println!("Example 3: Zero-copy views");
    println!("--------------------------");

    let mut payload = [100_u64, 200, 300];

    // SAFETY: The region holds 3 initialized elements and outlives the view.
    let mut view =
        unsafe { SharedVec::from_raw_parts(NonNull::from(&mut payload).cast::<u64>(), 3) };

    println!("View over caller memory:");
    println!("  contents:  {:?}", view.as_slice());
    println!("  ref_count: {} (no counter - borrowed)", view.ref_count());

    // The first push promotes the view to an owned buffer; the caller's
    // region is left untouched.
    view.push(400);

    println!("After the promoting push:");
    println!("  view:      {:?}", view.as_slice());
    println!("  ref_count: {} (owned now)", view.ref_count());

    drop(view);
    println!("  caller's region is untouched: {payload:?}");
}
