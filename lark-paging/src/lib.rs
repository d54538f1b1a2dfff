//! Paging - Short-descriptor translation tables
//!
//! This crate builds and decodes the two-level translation tables walked by
//! the ARMv5/ARMv6/ARMv7-A short-descriptor MMU.
//!
//! # Architecture
//!
//! - `descriptors`: bit layouts of every first- and second-level descriptor,
//!   typed attribute words and entry decoding
//! - `attributes`: `Attributes`, an encoder from access permission, memory
//!   type and flags to attribute words
//! - `tables`: aligned table storage and the `build_*` construction operations
//!
//! # Example
//!
//! ```ignore
//! use lark_paging::{Attributes, AccessPermission, MemoryType, tables};
//!
//! let ram = Attributes::new(AccessPermission::PrivilegedOnly, MemoryType::WriteBack);
//! tables::build_section(&mut l1, 0x8000_0000, 64, ram.section());
//! ```
//!
//! Region and table addresses are the caller's responsibility. Misalignment
//! trips a `debug_assert!` in debug builds; release builds mask the low bits
//! and carry on.
//!
//! Nothing here touches the TLB or the caches. After modifying a live table
//! the caller cleans the table lines and invalidates the affected TLB entries.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod attributes;
pub mod descriptors;
pub mod tables;

// Re-export commonly used types
pub use attributes::{AccessPermission, Attributes, MemoryType};
pub use descriptors::{
    CoarseTableAttributes, FineTableAttributes, FirstLevelEntry, FirstLevelKind,
    LargePageAttributes, SecondLevelEntry, SecondLevelFormat, SecondLevelKind,
    SectionAttributes, SmallPageAttributes, TinyPageAttributes,
};
pub use tables::{CoarseTable, FineTable, FirstLevelTable, SecondLevelTable};

/// Entries in the first-level table.
pub const FIRST_LEVEL_ENTRIES: usize = 4096;

/// Entries in a coarse second-level table.
pub const COARSE_ENTRIES: usize = 256;

/// Entries in a fine second-level table.
pub const FINE_ENTRIES: usize = 1024;

/// Section size (1MB).
pub const SECTION_SHIFT: u32 = 20;
pub const SECTION_SIZE: u32 = 1 << SECTION_SHIFT;

/// Large page size (64KB).
pub const LARGE_PAGE_SHIFT: u32 = 16;
pub const LARGE_PAGE_SIZE: u32 = 1 << LARGE_PAGE_SHIFT;

/// Small page size (4KB).
pub const SMALL_PAGE_SHIFT: u32 = 12;
pub const SMALL_PAGE_SIZE: u32 = 1 << SMALL_PAGE_SHIFT;

/// Tiny page size (1KB).
pub const TINY_PAGE_SHIFT: u32 = 10;
pub const TINY_PAGE_SIZE: u32 = 1 << TINY_PAGE_SHIFT;

/// Consecutive coarse-table slots a large page occupies.
pub const LARGE_PAGE_REPLICAS: usize = (LARGE_PAGE_SIZE / SMALL_PAGE_SIZE) as usize;

// Compile-time verification of table geometry
const _: () = assert!(
    FIRST_LEVEL_ENTRIES as u64 * SECTION_SIZE as u64 == 1 << 32,
    "first-level table must cover the 4GB address space"
);
const _: () = assert!(
    COARSE_ENTRIES as u32 * SMALL_PAGE_SIZE == SECTION_SIZE,
    "coarse table must cover one section"
);
const _: () = assert!(
    FINE_ENTRIES as u32 * TINY_PAGE_SIZE == SECTION_SIZE,
    "fine table must cover one section"
);
const _: () = assert!(LARGE_PAGE_REPLICAS == 16, "large page spans 16 small-page slots");
