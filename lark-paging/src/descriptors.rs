//! Short-descriptor formats
//!
//! First-level entries (one per 1MB of virtual address space):
//! ```text
//! Fault        |                     ignored                       |0 0|
//! Coarse table | table base [31:10]           |   |IMP| DOMAIN |   |0 1|
//! Section      | base [31:20] |  |SS|nG|S|APX|TEX|AP|IMP|DOMAIN|XN|C|B|1 0|
//! Fine table   | table base [31:12]        |      |   | DOMAIN |   |1 1|
//! ```
//!
//! Second-level entries:
//! ```text
//! Large page   | base [31:16] |XN| TEX |nG|S|APX|   |AP|C|B|0 1|
//! Small page   | base [31:12]        |nG|S|APX|TEX|AP|C|B|1|XN|
//! Tiny page    | base [31:10]              |      |AP|C|B|1 1|
//! ```
//!
//! Small pages use the ARMv6 extended layout (SCTLR.XP set), where bit 0 is
//! execute-never. In an ARMv5 fine table the same `0b11` tag means a tiny
//! page, so second-level decoding needs to know which table it is reading.

use core::fmt;

use tock_registers::{LocalRegisterCopy, register_bitfields};

register_bitfields![u32,
    /// Type tag shared by every first-level entry
    pub FIRST_LEVEL [
        TYPE OFFSET(0) NUMBITS(2) [
            Fault = 0b00,
            Coarse = 0b01,
            Section = 0b10,
            Fine = 0b11
        ]
    ],

    /// 1MB section (and 16MB supersection) descriptor
    pub SECTION [
        TYPE OFFSET(0) NUMBITS(2) [],
        /// Bufferable
        B OFFSET(2) NUMBITS(1) [],
        /// Cacheable
        C OFFSET(3) NUMBITS(1) [],
        /// Execute never
        XN OFFSET(4) NUMBITS(1) [],
        DOMAIN OFFSET(5) NUMBITS(4) [],
        /// Implementation defined
        IMP OFFSET(9) NUMBITS(1) [],
        AP OFFSET(10) NUMBITS(2) [],
        TEX OFFSET(12) NUMBITS(3) [],
        /// Access permission extension
        APX OFFSET(15) NUMBITS(1) [],
        /// Shareable
        S OFFSET(16) NUMBITS(1) [],
        /// Not global
        NG OFFSET(17) NUMBITS(1) [],
        /// Entry maps a 16MB supersection
        SUPERSECTION OFFSET(18) NUMBITS(1) [],
        BASE OFFSET(20) NUMBITS(12) []
    ],

    /// Pointer to a coarse (256 entry) second-level table
    pub COARSE [
        TYPE OFFSET(0) NUMBITS(2) [],
        DOMAIN OFFSET(5) NUMBITS(4) [],
        IMP OFFSET(9) NUMBITS(1) [],
        BASE OFFSET(10) NUMBITS(22) []
    ],

    /// Pointer to a fine (1024 entry) second-level table
    pub FINE [
        TYPE OFFSET(0) NUMBITS(2) [],
        DOMAIN OFFSET(5) NUMBITS(4) [],
        BASE OFFSET(12) NUMBITS(20) []
    ],

    /// Type tag shared by every second-level entry
    pub SECOND_LEVEL [
        TYPE OFFSET(0) NUMBITS(2) [
            Fault = 0b00,
            Large = 0b01,
            Small = 0b10,
            Tiny = 0b11
        ]
    ],

    /// 64KB large page descriptor
    pub LARGE_PAGE [
        TYPE OFFSET(0) NUMBITS(2) [],
        B OFFSET(2) NUMBITS(1) [],
        C OFFSET(3) NUMBITS(1) [],
        AP OFFSET(4) NUMBITS(2) [],
        APX OFFSET(9) NUMBITS(1) [],
        S OFFSET(10) NUMBITS(1) [],
        NG OFFSET(11) NUMBITS(1) [],
        TEX OFFSET(12) NUMBITS(3) [],
        XN OFFSET(15) NUMBITS(1) [],
        BASE OFFSET(16) NUMBITS(16) []
    ],

    /// 4KB small page descriptor (extended layout)
    pub SMALL_PAGE [
        XN OFFSET(0) NUMBITS(1) [],
        TYPE OFFSET(1) NUMBITS(1) [],
        B OFFSET(2) NUMBITS(1) [],
        C OFFSET(3) NUMBITS(1) [],
        AP OFFSET(4) NUMBITS(2) [],
        TEX OFFSET(6) NUMBITS(3) [],
        APX OFFSET(9) NUMBITS(1) [],
        S OFFSET(10) NUMBITS(1) [],
        NG OFFSET(11) NUMBITS(1) [],
        BASE OFFSET(12) NUMBITS(20) []
    ],

    /// 64KB large page descriptor with subpage permissions (ARMv5, ARMv6 with XP clear)
    pub LARGE_PAGE_LEGACY [
        TYPE OFFSET(0) NUMBITS(2) [],
        B OFFSET(2) NUMBITS(1) [],
        C OFFSET(3) NUMBITS(1) [],
        AP0 OFFSET(4) NUMBITS(2) [],
        AP1 OFFSET(6) NUMBITS(2) [],
        AP2 OFFSET(8) NUMBITS(2) [],
        AP3 OFFSET(10) NUMBITS(2) [],
        TEX OFFSET(12) NUMBITS(3) [],
        BASE OFFSET(16) NUMBITS(16) []
    ],

    /// 4KB small page descriptor with subpage permissions (ARMv5, ARMv6 with XP clear)
    pub SMALL_PAGE_LEGACY [
        TYPE OFFSET(0) NUMBITS(2) [],
        B OFFSET(2) NUMBITS(1) [],
        C OFFSET(3) NUMBITS(1) [],
        AP0 OFFSET(4) NUMBITS(2) [],
        AP1 OFFSET(6) NUMBITS(2) [],
        AP2 OFFSET(8) NUMBITS(2) [],
        AP3 OFFSET(10) NUMBITS(2) [],
        BASE OFFSET(12) NUMBITS(20) []
    ],

    /// 1KB tiny page descriptor (fine tables only)
    pub TINY_PAGE [
        TYPE OFFSET(0) NUMBITS(2) [],
        B OFFSET(2) NUMBITS(1) [],
        C OFFSET(3) NUMBITS(1) [],
        AP OFFSET(4) NUMBITS(2) [],
        BASE OFFSET(10) NUMBITS(22) []
    ]
];

// Type tags carried by the attribute words
const SECTION_TAG: u32 = 0b10;
const COARSE_TAG: u32 = 0b01;
const FINE_TAG: u32 = 0b11;
const LARGE_PAGE_TAG: u32 = 0b01;
const SMALL_PAGE_TAG: u32 = 0b10;
const TINY_PAGE_TAG: u32 = 0b11;

// Output address masks
pub(crate) const SECTION_BASE_MASK: u32 = 0xFFF0_0000; // bits [31:20]
pub(crate) const SUPERSECTION_BASE_MASK: u32 = 0xFF00_0000; // bits [31:24]
pub(crate) const COARSE_BASE_MASK: u32 = 0xFFFF_FC00; // bits [31:10]
pub(crate) const FINE_BASE_MASK: u32 = 0xFFFF_F000; // bits [31:12]
pub(crate) const LARGE_PAGE_BASE_MASK: u32 = 0xFFFF_0000; // bits [31:16]
pub(crate) const SMALL_PAGE_BASE_MASK: u32 = 0xFFFF_F000; // bits [31:12]
pub(crate) const TINY_PAGE_BASE_MASK: u32 = 0xFFFF_FC00; // bits [31:10]

// -- Attribute words

macro_rules! attribute_word {
    ($(#[$doc:meta])* $name:ident, $tag:expr, $mask:expr) => {
        $(#[$doc])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(u32);

        impl $name {
            /// Type tag this word carries in bits [1:0].
            pub const TAG: u32 = $tag;

            /// Raw attribute bits, taken as given.
            ///
            /// The value is ORed into each entry unchanged, so it must include
            /// the type tag and must not have address bits set.
            #[inline]
            #[must_use]
            pub const fn from_bits(bits: u32) -> Self {
                debug_assert!(bits & $mask == 0, "attribute word overlaps the address field");
                Self(bits)
            }

            #[inline]
            #[must_use]
            pub const fn bits(self) -> u32 {
                self.0
            }
        }
    };
}

attribute_word!(
    /// Attribute bits of a section entry.
    SectionAttributes, SECTION_TAG, SECTION_BASE_MASK
);
attribute_word!(
    /// Attribute bits of a first-level pointer to a coarse table.
    CoarseTableAttributes, COARSE_TAG, COARSE_BASE_MASK
);
attribute_word!(
    /// Attribute bits of a first-level pointer to a fine table.
    FineTableAttributes, FINE_TAG, FINE_BASE_MASK
);
attribute_word!(
    /// Attribute bits of a large page entry.
    LargePageAttributes, LARGE_PAGE_TAG, LARGE_PAGE_BASE_MASK
);
attribute_word!(
    /// Attribute bits of a small page entry.
    SmallPageAttributes, SMALL_PAGE_TAG, SMALL_PAGE_BASE_MASK
);
attribute_word!(
    /// Attribute bits of a tiny page entry.
    TinyPageAttributes, TINY_PAGE_TAG, TINY_PAGE_BASE_MASK
);

/// Attribute words that point a first-level entry at a second-level table.
pub trait TableAttributes: Copy {
    /// Entries in the table this kind of pointer refers to.
    const ENTRIES: usize;
    /// Bits of the table address kept in the pointer.
    const BASE_MASK: u32;

    fn bits(self) -> u32;
}

impl TableAttributes for CoarseTableAttributes {
    const ENTRIES: usize = crate::COARSE_ENTRIES;
    const BASE_MASK: u32 = COARSE_BASE_MASK;

    #[inline]
    fn bits(self) -> u32 {
        self.0
    }
}

impl TableAttributes for FineTableAttributes {
    const ENTRIES: usize = crate::FINE_ENTRIES;
    const BASE_MASK: u32 = FINE_BASE_MASK;

    #[inline]
    fn bits(self) -> u32 {
        self.0
    }
}

// -- First-level entries

/// Classification of a first-level entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstLevelKind {
    Fault,
    CoarseTable,
    Section,
    Supersection,
    FineTable,
}

/// One first-level translation table entry.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct FirstLevelEntry(u32);

impl FirstLevelEntry {
    /// Translation fault.
    pub const FAULT: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn kind(self) -> FirstLevelKind {
        let reg: LocalRegisterCopy<u32, FIRST_LEVEL::Register> = LocalRegisterCopy::new(self.0);
        match reg.read_as_enum(FIRST_LEVEL::TYPE) {
            Some(FIRST_LEVEL::TYPE::Value::Coarse) => FirstLevelKind::CoarseTable,
            Some(FIRST_LEVEL::TYPE::Value::Fine) => FirstLevelKind::FineTable,
            Some(FIRST_LEVEL::TYPE::Value::Section) => {
                let section: LocalRegisterCopy<u32, SECTION::Register> = LocalRegisterCopy::new(self.0);
                if section.is_set(SECTION::SUPERSECTION) {
                    FirstLevelKind::Supersection
                } else {
                    FirstLevelKind::Section
                }
            }
            Some(FIRST_LEVEL::TYPE::Value::Fault) | None => FirstLevelKind::Fault,
        }
    }

    /// Physical base of the mapped section or supersection.
    #[must_use]
    pub fn output_address(self) -> Option<u32> {
        match self.kind() {
            FirstLevelKind::Section => Some(self.0 & SECTION_BASE_MASK),
            FirstLevelKind::Supersection => Some(self.0 & SUPERSECTION_BASE_MASK),
            _ => None,
        }
    }

    /// Physical base of the second-level table this entry points to.
    #[must_use]
    pub fn next_table(self) -> Option<u32> {
        match self.kind() {
            FirstLevelKind::CoarseTable => Some(self.0 & COARSE_BASE_MASK),
            FirstLevelKind::FineTable => Some(self.0 & FINE_BASE_MASK),
            _ => None,
        }
    }

    /// Domain the entry is checked against. Faults have none.
    #[must_use]
    pub fn domain(self) -> Option<u8> {
        match self.kind() {
            FirstLevelKind::Fault => None,
            _ => Some(LocalRegisterCopy::<u32, SECTION::Register>::new(self.0).read(SECTION::DOMAIN) as u8),
        }
    }
}

impl fmt::Debug for FirstLevelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            FirstLevelKind::Fault => write!(f, "L1::Fault"),
            FirstLevelKind::CoarseTable => write!(f, "L1::Coarse({:#x})", self.0 & COARSE_BASE_MASK),
            FirstLevelKind::FineTable => write!(f, "L1::Fine({:#x})", self.0 & FINE_BASE_MASK),
            FirstLevelKind::Section => write!(f, "L1::Section({:#x})", self.0 & SECTION_BASE_MASK),
            FirstLevelKind::Supersection => {
                write!(f, "L1::Supersection({:#x})", self.0 & SUPERSECTION_BASE_MASK)
            }
        }
    }
}

// -- Second-level entries

/// Which kind of second-level table an entry was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondLevelFormat {
    /// Coarse table, extended small page layout
    Coarse,
    /// Fine table, where tag `0b11` is a tiny page
    Fine,
}

/// Classification of a second-level entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondLevelKind {
    Fault,
    Large,
    Small,
    Tiny,
}

/// One second-level translation table entry.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct SecondLevelEntry(u32);

impl SecondLevelEntry {
    /// Translation fault.
    pub const FAULT: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn kind(self, format: SecondLevelFormat) -> SecondLevelKind {
        let reg: LocalRegisterCopy<u32, SECOND_LEVEL::Register> = LocalRegisterCopy::new(self.0);
        match (reg.read_as_enum(SECOND_LEVEL::TYPE), format) {
            (Some(SECOND_LEVEL::TYPE::Value::Large), _) => SecondLevelKind::Large,
            (Some(SECOND_LEVEL::TYPE::Value::Small), _) => SecondLevelKind::Small,
            (Some(SECOND_LEVEL::TYPE::Value::Tiny), SecondLevelFormat::Fine) => SecondLevelKind::Tiny,
            // Small page with XN set
            (Some(SECOND_LEVEL::TYPE::Value::Tiny), SecondLevelFormat::Coarse) => SecondLevelKind::Small,
            (Some(SECOND_LEVEL::TYPE::Value::Fault), _) | (None, _) => SecondLevelKind::Fault,
        }
    }

    /// Physical base of the mapped page.
    #[must_use]
    pub fn output_address(self, format: SecondLevelFormat) -> Option<u32> {
        match self.kind(format) {
            SecondLevelKind::Fault => None,
            SecondLevelKind::Large => Some(self.0 & LARGE_PAGE_BASE_MASK),
            SecondLevelKind::Small => Some(self.0 & SMALL_PAGE_BASE_MASK),
            SecondLevelKind::Tiny => Some(self.0 & TINY_PAGE_BASE_MASK),
        }
    }

    /// Whether the page is marked execute-never. Tiny pages have no XN bit.
    #[must_use]
    pub fn is_execute_never(self, format: SecondLevelFormat) -> bool {
        match self.kind(format) {
            SecondLevelKind::Large => LocalRegisterCopy::<u32, LARGE_PAGE::Register>::new(self.0).is_set(LARGE_PAGE::XN),
            SecondLevelKind::Small => LocalRegisterCopy::<u32, SMALL_PAGE::Register>::new(self.0).is_set(SMALL_PAGE::XN),
            SecondLevelKind::Tiny | SecondLevelKind::Fault => false,
        }
    }
}

// Read as a coarse-table entry; fine tables are ARMv5 only.
impl fmt::Debug for SecondLevelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind(SecondLevelFormat::Coarse) {
            SecondLevelKind::Fault => write!(f, "L2::Fault"),
            SecondLevelKind::Large => write!(f, "L2::Large({:#x})", self.0 & LARGE_PAGE_BASE_MASK),
            SecondLevelKind::Small => write!(f, "L2::Small({:#x})", self.0 & SMALL_PAGE_BASE_MASK),
            SecondLevelKind::Tiny => write!(f, "L2::Tiny({:#x})", self.0 & TINY_PAGE_BASE_MASK),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_level_kinds() {
        assert_eq!(FirstLevelEntry::FAULT.kind(), FirstLevelKind::Fault);
        assert_eq!(FirstLevelEntry::from_raw(0x8000_0C0E).kind(), FirstLevelKind::Section);
        assert_eq!(FirstLevelEntry::from_raw(0x8104_0002).kind(), FirstLevelKind::Supersection);
        assert_eq!(FirstLevelEntry::from_raw(0x8000_4001).kind(), FirstLevelKind::CoarseTable);
        assert_eq!(FirstLevelEntry::from_raw(0x8000_4003).kind(), FirstLevelKind::FineTable);
    }

    #[test]
    fn test_first_level_addresses() {
        let section = FirstLevelEntry::from_raw(0x8030_0C2E);
        assert_eq!(section.output_address(), Some(0x8030_0000));
        assert_eq!(section.next_table(), None);
        assert_eq!(section.domain(), Some(1));

        let supersection = FirstLevelEntry::from_raw(0x8104_0002);
        assert_eq!(supersection.output_address(), Some(0x8100_0000));

        let coarse = FirstLevelEntry::from_raw(0x8000_4C01);
        assert_eq!(coarse.next_table(), Some(0x8000_4C00));
        assert_eq!(coarse.output_address(), None);

        let fine = FirstLevelEntry::from_raw(0x8000_5003);
        assert_eq!(fine.next_table(), Some(0x8000_5000));
        assert_eq!(FirstLevelEntry::FAULT.domain(), None);
    }

    #[test]
    fn test_second_level_kinds_depend_on_table() {
        let xn_small = SecondLevelEntry::from_raw(0x8000_1033);
        assert_eq!(xn_small.kind(SecondLevelFormat::Coarse), SecondLevelKind::Small);
        assert!(xn_small.is_execute_never(SecondLevelFormat::Coarse));
        assert_eq!(xn_small.kind(SecondLevelFormat::Fine), SecondLevelKind::Tiny);
        assert!(!xn_small.is_execute_never(SecondLevelFormat::Fine));

        let large = SecondLevelEntry::from_raw(0x8001_8035);
        assert_eq!(large.kind(SecondLevelFormat::Coarse), SecondLevelKind::Large);
        assert_eq!(large.output_address(SecondLevelFormat::Coarse), Some(0x8001_0000));
        assert!(large.is_execute_never(SecondLevelFormat::Coarse));

        assert_eq!(SecondLevelEntry::FAULT.kind(SecondLevelFormat::Fine), SecondLevelKind::Fault);
        assert_eq!(SecondLevelEntry::FAULT.output_address(SecondLevelFormat::Coarse), None);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", FirstLevelEntry::from_raw(0x8000_0C0E)), "L1::Section(0x80000000)");
        assert_eq!(format!("{:?}", FirstLevelEntry::FAULT), "L1::Fault");
        assert_eq!(format!("{:?}", SecondLevelEntry::from_raw(0x8001_0035)), "L2::Large(0x80010000)");
    }

    #[test]
    fn test_attribute_tags() {
        assert_eq!(SectionAttributes::TAG, FIRST_LEVEL::TYPE::Section.value);
        assert_eq!(CoarseTableAttributes::TAG, FIRST_LEVEL::TYPE::Coarse.value);
        assert_eq!(FineTableAttributes::TAG, FIRST_LEVEL::TYPE::Fine.value);
        assert_eq!(LargePageAttributes::TAG, SECOND_LEVEL::TYPE::Large.value);
        assert_eq!(SmallPageAttributes::TAG, SECOND_LEVEL::TYPE::Small.value);
        assert_eq!(TinyPageAttributes::TAG, SECOND_LEVEL::TYPE::Tiny.value);
    }
}
