//! Translation table storage and construction
//!
//! Provides aligned storage for each table kind and the operations that fill
//! runs of entries:
//! - [`build_section`]: 1MB sections straight from the first-level table
//! - [`build_page_1k`]: 1KB tiny pages through a fine table
//! - [`build_page_4k`]: 4KB small pages through a coarse table
//! - [`build_page_64k`]: 64KB large pages through a coarse table, each
//!   replicated into 16 consecutive slots
//!
//! Addresses must be aligned to the region size. The builders trust the
//! caller: debug builds assert alignment, release builds mask the low bits
//! off without complaint. Indexing past the end of a table panics in both.

use core::ops::{Deref, DerefMut};

use crate::descriptors::{
    CoarseTableAttributes, FineTableAttributes, FirstLevelEntry, LARGE_PAGE_BASE_MASK,
    LargePageAttributes, SECTION_BASE_MASK, SMALL_PAGE_BASE_MASK, SecondLevelEntry,
    SectionAttributes, SmallPageAttributes, TINY_PAGE_BASE_MASK, TableAttributes,
    TinyPageAttributes,
};
use crate::{
    COARSE_ENTRIES, FINE_ENTRIES, FIRST_LEVEL_ENTRIES, LARGE_PAGE_REPLICAS, LARGE_PAGE_SIZE,
    SECTION_SHIFT, SECTION_SIZE, SMALL_PAGE_SHIFT, SMALL_PAGE_SIZE, TINY_PAGE_SHIFT,
    TINY_PAGE_SIZE,
};

/// Mask for extracting a coarse table index from an address
const COARSE_INDEX_MASK: u32 = COARSE_ENTRIES as u32 - 1;

/// Mask for extracting a fine table index from an address
const FINE_INDEX_MASK: u32 = FINE_ENTRIES as u32 - 1;

macro_rules! table_storage {
    ($(#[$doc:meta])* $name:ident, $entry:ty, $len:expr, $align:literal) => {
        $(#[$doc])*
        #[repr(C, align($align))]
        #[derive(Clone)]
        pub struct $name([$entry; $len]);

        impl $name {
            /// A table of translation faults.
            #[must_use]
            pub const fn new() -> Self {
                Self([<$entry>::FAULT; $len])
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Deref for $name {
            type Target = [$entry];

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        const _: () = assert!(core::mem::size_of::<$name>() == $align);
    };
}

table_storage!(
    /// First-level table, 16KB aligned as TTBR0 requires.
    FirstLevelTable, FirstLevelEntry, FIRST_LEVEL_ENTRIES, 16384
);
table_storage!(
    /// Coarse second-level table.
    CoarseTable, SecondLevelEntry, COARSE_ENTRIES, 1024
);
table_storage!(
    /// Fine second-level table (ARMv5).
    FineTable, SecondLevelEntry, FINE_ENTRIES, 4096
);

/// A second-level table and the physical address the MMU sees it at.
///
/// The builders write through `entries` and store `base` in the first-level
/// pointer, so the two must describe the same memory once the MMU is on.
pub struct SecondLevelTable<'a> {
    /// Physical address of the table: 1KB aligned for coarse tables, 4KB for
    /// fine tables.
    pub base: u32,
    /// The table's entries, 256 (coarse) or 1024 (fine) of them.
    pub entries: &'a mut [SecondLevelEntry],
}

impl<'a> SecondLevelTable<'a> {
    /// Pair `entries` with the physical address `base` it lives at.
    ///
    /// With identity mapping, `base` is `entries.as_ptr() as u32`.
    #[must_use]
    pub fn new(base: u32, entries: &'a mut [SecondLevelEntry]) -> Self {
        Self { base, entries }
    }
}

/// Index of the first-level entry covering `addr`.
#[inline]
#[must_use]
pub const fn first_level_index(addr: u32) -> usize {
    (addr >> SECTION_SHIFT) as usize
}

/// Map `count` consecutive 1MB sections starting at `base`.
///
/// Entry `base >> 20 + i` maps `base + i * 1MB`.
pub fn build_section(table: &mut [FirstLevelEntry], base: u32, count: usize, attrs: SectionAttributes) {
    debug_assert!(base & (SECTION_SIZE - 1) == 0, "section base must be 1MB aligned");

    let first = first_level_index(base);
    let base = base & SECTION_BASE_MASK;
    for (i, entry) in table[first..first + count].iter_mut().enumerate() {
        let address = base.wrapping_add(i as u32 * SECTION_SIZE);
        *entry = FirstLevelEntry::from_raw(address | attrs.bits());
    }
}

/// Point the first-level entry covering `base` at `l2`.
fn point_to_table<A: TableAttributes>(
    table: &mut [FirstLevelEntry],
    base: u32,
    l2: &SecondLevelTable<'_>,
    attrs: A,
) {
    debug_assert!(l2.base & !A::BASE_MASK == 0, "second-level table is misaligned");
    debug_assert_eq!(l2.entries.len(), A::ENTRIES, "second-level table has the wrong length");

    table[first_level_index(base)] = FirstLevelEntry::from_raw((l2.base & A::BASE_MASK) | attrs.bits());
}

/// Map `count` consecutive 1KB tiny pages starting at `base` through a fine
/// table.
pub fn build_page_1k(
    table: &mut [FirstLevelEntry],
    base: u32,
    count: usize,
    l1_attrs: FineTableAttributes,
    l2: &mut SecondLevelTable<'_>,
    attrs: TinyPageAttributes,
) {
    debug_assert!(base & (TINY_PAGE_SIZE - 1) == 0, "tiny page base must be 1KB aligned");

    point_to_table(table, base, l2, l1_attrs);

    let first = ((base >> TINY_PAGE_SHIFT) & FINE_INDEX_MASK) as usize;
    let base = base & TINY_PAGE_BASE_MASK;
    for (i, entry) in l2.entries[first..first + count].iter_mut().enumerate() {
        let address = base.wrapping_add(i as u32 * TINY_PAGE_SIZE);
        *entry = SecondLevelEntry::from_raw(address | attrs.bits());
    }
}

/// Map `count` consecutive 4KB small pages starting at `base` through a
/// coarse table.
pub fn build_page_4k(
    table: &mut [FirstLevelEntry],
    base: u32,
    count: usize,
    l1_attrs: CoarseTableAttributes,
    l2: &mut SecondLevelTable<'_>,
    attrs: SmallPageAttributes,
) {
    debug_assert!(base & (SMALL_PAGE_SIZE - 1) == 0, "small page base must be 4KB aligned");

    point_to_table(table, base, l2, l1_attrs);

    let first = ((base >> SMALL_PAGE_SHIFT) & COARSE_INDEX_MASK) as usize;
    let base = base & SMALL_PAGE_BASE_MASK;
    for (i, entry) in l2.entries[first..first + count].iter_mut().enumerate() {
        let address = base.wrapping_add(i as u32 * SMALL_PAGE_SIZE);
        *entry = SecondLevelEntry::from_raw(address | attrs.bits());
    }
}

/// Map `count` consecutive 64KB large pages starting at `base` through a
/// coarse table.
///
/// The MMU reads a large page from any of its 16 slots, so every slot holds
/// the same entry.
pub fn build_page_64k(
    table: &mut [FirstLevelEntry],
    base: u32,
    count: usize,
    l1_attrs: CoarseTableAttributes,
    l2: &mut SecondLevelTable<'_>,
    attrs: LargePageAttributes,
) {
    debug_assert!(base & (LARGE_PAGE_SIZE - 1) == 0, "large page base must be 64KB aligned");

    point_to_table(table, base, l2, l1_attrs);

    let first = ((base >> SMALL_PAGE_SHIFT) & COARSE_INDEX_MASK) as usize;
    let base = base & LARGE_PAGE_BASE_MASK;
    let slots = &mut l2.entries[first..first + count * LARGE_PAGE_REPLICAS];
    for (i, replicas) in slots.chunks_exact_mut(LARGE_PAGE_REPLICAS).enumerate() {
        let address = base.wrapping_add(i as u32 * LARGE_PAGE_SIZE);
        replicas.fill(SecondLevelEntry::from_raw(address | attrs.bits()));
    }
}
