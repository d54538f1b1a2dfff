//! Static Storage Initialisation
//!
//! Copies initialised data from its load address and clears zero-initialised
//! storage, as described by the linker's copy and zero tables. Every store is
//! a volatile word write: this code runs before statics hold their values, so
//! the compiler must not turn the loops into `memcpy`/`memset` calls that
//! might themselves depend on initialised data.

use core::ptr::{read_volatile, write_volatile};

use lark_common::{CopyTableEntry, LinkerRange, ZeroTableEntry};

/// Copy one block, `wlen` words from `src` to `dest`.
///
/// # Safety
///
/// `src` must be readable and `dest` writable for `wlen` words. Nothing else
/// may access `dest` while it is written.
pub unsafe fn copy_block(entry: &CopyTableEntry) {
    for i in 0..entry.wlen as usize {
        // SAFETY: `i < wlen`, within the bounds the caller vouches for.
        unsafe {
            let word = read_volatile(entry.src.add(i));
            write_volatile(entry.dest.add(i), word);
        }
    }
}

/// Clear one block of `wlen` words at `dest`.
///
/// # Safety
///
/// `dest` must be writable for `wlen` words. Nothing else may access it while
/// it is written.
pub unsafe fn zero_block(entry: &ZeroTableEntry) {
    for i in 0..entry.wlen as usize {
        // SAFETY: `i < wlen`, within the bounds the caller vouches for.
        unsafe { write_volatile(entry.dest.add(i), 0) };
    }
}

/// Run every copy entry in order, then every zero entry in order.
///
/// # Safety
///
/// Each entry must satisfy [`copy_block`] or [`zero_block`]. Must run before
/// any code reads the statics being initialised.
pub unsafe fn run(copy_table: &[CopyTableEntry], zero_table: &[ZeroTableEntry]) {
    for entry in copy_table {
        // SAFETY: forwarded from the caller.
        unsafe { copy_block(entry) };
    }
    for entry in zero_table {
        // SAFETY: forwarded from the caller.
        unsafe { zero_block(entry) };
    }
    log::trace!(
        "static data initialised: {} copy, {} zero entries",
        copy_table.len(),
        zero_table.len()
    );
}

/// Copy `.data` for images linked without a copy table.
///
/// # Safety
///
/// As [`copy_block`], with `source` the load address of `dest`.
pub unsafe fn copy_range(source: usize, dest: LinkerRange) {
    // SAFETY: forwarded from the caller.
    unsafe { copy_block(&dest.as_copy_entry(source)) };
}

/// Clear `.bss` for images linked without a zero table.
///
/// # Safety
///
/// As [`zero_block`].
pub unsafe fn zero_range(range: LinkerRange) {
    // SAFETY: forwarded from the caller.
    unsafe { zero_block(&range.as_zero_entry()) };
}
