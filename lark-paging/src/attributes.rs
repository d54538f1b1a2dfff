//! Descriptor attribute encoding
//!
//! [`Attributes`] collects the properties of a mapping once and produces the
//! attribute word for whichever descriptor kind maps it. Every word already
//! carries its type tag, so the builder only has to OR in the address.
//!
//! ```ignore
//! let mmio = Attributes::new(AccessPermission::PrivilegedOnly, MemoryType::Device)
//!     .execute_never()
//!     .domain(1);
//! tables::build_section(&mut l1, 0x1000_0000, 16, mmio.section());
//! ```

use tock_registers::{
    interfaces::{ReadWriteable, Readable},
    registers::InMemoryRegister,
};

use crate::descriptors::{
    COARSE, CoarseTableAttributes, FINE, FineTableAttributes, LARGE_PAGE, LARGE_PAGE_LEGACY,
    LargePageAttributes, SECTION, SMALL_PAGE, SMALL_PAGE_LEGACY, SectionAttributes,
    SmallPageAttributes, TINY_PAGE, TinyPageAttributes,
};

/// Access permission of a mapping, as AP with the APX extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPermission {
    /// No access at any privilege level
    NoAccess,
    /// Read/write when privileged, no user access
    PrivilegedOnly,
    /// Read/write when privileged, read-only for user
    UserReadOnly,
    /// Read/write at every privilege level
    Full,
    /// Read-only when privileged, no user access (ARMv6+)
    PrivilegedReadOnly,
    /// Read-only at every privilege level (ARMv6+)
    ReadOnly,
}

impl AccessPermission {
    /// AP[1:0] encoding.
    #[inline]
    #[must_use]
    pub const fn ap(self) -> u32 {
        match self {
            AccessPermission::NoAccess => 0b00,
            AccessPermission::PrivilegedOnly | AccessPermission::PrivilegedReadOnly => 0b01,
            AccessPermission::UserReadOnly | AccessPermission::ReadOnly => 0b10,
            AccessPermission::Full => 0b11,
        }
    }

    /// Whether the APX bit is set.
    #[inline]
    #[must_use]
    pub const fn apx(self) -> bool {
        matches!(self, AccessPermission::PrivilegedReadOnly | AccessPermission::ReadOnly)
    }
}

/// Memory type and cache policy of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryType {
    /// Strongly ordered, never cached or buffered
    StronglyOrdered,
    /// Shared device memory
    Device,
    /// Normal memory, write-through, no write allocate
    WriteThrough,
    /// Normal memory, write-back, no write allocate
    #[default]
    WriteBack,
    /// Normal memory, uncached
    NonCacheable,
    /// Normal memory, write-back, write allocate (ARMv6+)
    WriteBackAllocate,
}

impl MemoryType {
    /// `(TEX, C, B)` encoding.
    #[must_use]
    pub const fn tex_cb(self) -> (u32, bool, bool) {
        match self {
            MemoryType::StronglyOrdered => (0b000, false, false),
            MemoryType::Device => (0b000, false, true),
            MemoryType::WriteThrough => (0b000, true, false),
            MemoryType::WriteBack => (0b000, true, true),
            MemoryType::NonCacheable => (0b001, false, false),
            MemoryType::WriteBackAllocate => (0b001, true, true),
        }
    }
}

/// Properties of one mapping, encodable as any descriptor's attribute word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    domain: u8,
    access: AccessPermission,
    memory: MemoryType,
    execute_never: bool,
    shareable: bool,
    not_global: bool,
}

impl Attributes {
    /// Domain 0, executable, non-shared, global.
    #[must_use]
    pub const fn new(access: AccessPermission, memory: MemoryType) -> Self {
        Self {
            domain: 0,
            access,
            memory,
            execute_never: false,
            shareable: false,
            not_global: false,
        }
    }

    /// Check accesses against `domain` (0-15).
    ///
    /// # Panics
    ///
    /// Panics if `domain` is 16 or larger.
    #[must_use]
    pub const fn domain(mut self, domain: u8) -> Self {
        assert!(domain < 16, "domain out of range");
        self.domain = domain;
        self
    }

    /// Forbid instruction fetches.
    #[must_use]
    pub const fn execute_never(mut self) -> Self {
        self.execute_never = true;
        self
    }

    /// Mark the memory shared between observers.
    #[must_use]
    pub const fn shareable(mut self) -> Self {
        self.shareable = true;
        self
    }

    /// Tag TLB entries with the current ASID.
    #[must_use]
    pub const fn not_global(mut self) -> Self {
        self.not_global = true;
        self
    }

    /// Section entry attributes.
    #[must_use]
    pub fn section(self) -> SectionAttributes {
        let (tex, c, b) = self.memory.tex_cb();
        let reg: InMemoryRegister<u32, SECTION::Register> = InMemoryRegister::new(SectionAttributes::TAG);
        reg.modify(
            SECTION::DOMAIN.val(self.domain as u32)
                + SECTION::AP.val(self.access.ap())
                + SECTION::APX.val(self.access.apx() as u32)
                + SECTION::TEX.val(tex)
                + SECTION::C.val(c as u32)
                + SECTION::B.val(b as u32)
                + SECTION::XN.val(self.execute_never as u32)
                + SECTION::S.val(self.shareable as u32)
                + SECTION::NG.val(self.not_global as u32),
        );
        SectionAttributes::from_bits(reg.get())
    }

    /// First-level pointer to a coarse table. Only the domain applies.
    #[must_use]
    pub fn coarse_table(self) -> CoarseTableAttributes {
        let reg: InMemoryRegister<u32, COARSE::Register> = InMemoryRegister::new(CoarseTableAttributes::TAG);
        reg.modify(COARSE::DOMAIN.val(self.domain as u32));
        CoarseTableAttributes::from_bits(reg.get())
    }

    /// First-level pointer to a fine table. Only the domain applies.
    #[must_use]
    pub fn fine_table(self) -> FineTableAttributes {
        let reg: InMemoryRegister<u32, FINE::Register> = InMemoryRegister::new(FineTableAttributes::TAG);
        reg.modify(FINE::DOMAIN.val(self.domain as u32));
        FineTableAttributes::from_bits(reg.get())
    }

    /// Large page entry attributes (extended layout).
    #[must_use]
    pub fn large_page(self) -> LargePageAttributes {
        let (tex, c, b) = self.memory.tex_cb();
        let reg: InMemoryRegister<u32, LARGE_PAGE::Register> = InMemoryRegister::new(LargePageAttributes::TAG);
        reg.modify(
            LARGE_PAGE::AP.val(self.access.ap())
                + LARGE_PAGE::APX.val(self.access.apx() as u32)
                + LARGE_PAGE::TEX.val(tex)
                + LARGE_PAGE::C.val(c as u32)
                + LARGE_PAGE::B.val(b as u32)
                + LARGE_PAGE::XN.val(self.execute_never as u32)
                + LARGE_PAGE::S.val(self.shareable as u32)
                + LARGE_PAGE::NG.val(self.not_global as u32),
        );
        LargePageAttributes::from_bits(reg.get())
    }

    /// Small page entry attributes (extended layout).
    #[must_use]
    pub fn small_page(self) -> SmallPageAttributes {
        let (tex, c, b) = self.memory.tex_cb();
        let reg: InMemoryRegister<u32, SMALL_PAGE::Register> = InMemoryRegister::new(SmallPageAttributes::TAG);
        reg.modify(
            SMALL_PAGE::AP.val(self.access.ap())
                + SMALL_PAGE::APX.val(self.access.apx() as u32)
                + SMALL_PAGE::TEX.val(tex)
                + SMALL_PAGE::C.val(c as u32)
                + SMALL_PAGE::B.val(b as u32)
                + SMALL_PAGE::XN.val(self.execute_never as u32)
                + SMALL_PAGE::S.val(self.shareable as u32)
                + SMALL_PAGE::NG.val(self.not_global as u32),
        );
        SmallPageAttributes::from_bits(reg.get())
    }

    /// Large page entry attributes with subpage permissions.
    ///
    /// The access permission is replicated into AP0..AP3 so the whole page
    /// shares it. APX, XN, S and nG do not exist in this layout and are dropped.
    #[must_use]
    pub fn large_page_legacy(self) -> LargePageAttributes {
        let (tex, c, b) = self.memory.tex_cb();
        let ap = self.access.ap();
        let reg: InMemoryRegister<u32, LARGE_PAGE_LEGACY::Register> =
            InMemoryRegister::new(LargePageAttributes::TAG);
        reg.modify(
            LARGE_PAGE_LEGACY::AP0.val(ap)
                + LARGE_PAGE_LEGACY::AP1.val(ap)
                + LARGE_PAGE_LEGACY::AP2.val(ap)
                + LARGE_PAGE_LEGACY::AP3.val(ap)
                + LARGE_PAGE_LEGACY::TEX.val(tex)
                + LARGE_PAGE_LEGACY::C.val(c as u32)
                + LARGE_PAGE_LEGACY::B.val(b as u32),
        );
        LargePageAttributes::from_bits(reg.get())
    }

    /// Small page entry attributes with subpage permissions.
    ///
    /// The access permission is replicated into AP0..AP3. The layout has no
    /// TEX, APX, XN, S or nG; those properties are dropped.
    #[must_use]
    pub fn small_page_legacy(self) -> SmallPageAttributes {
        let (_, c, b) = self.memory.tex_cb();
        let ap = self.access.ap();
        let reg: InMemoryRegister<u32, SMALL_PAGE_LEGACY::Register> =
            InMemoryRegister::new(SmallPageAttributes::TAG);
        reg.modify(
            SMALL_PAGE_LEGACY::AP0.val(ap)
                + SMALL_PAGE_LEGACY::AP1.val(ap)
                + SMALL_PAGE_LEGACY::AP2.val(ap)
                + SMALL_PAGE_LEGACY::AP3.val(ap)
                + SMALL_PAGE_LEGACY::C.val(c as u32)
                + SMALL_PAGE_LEGACY::B.val(b as u32),
        );
        SmallPageAttributes::from_bits(reg.get())
    }

    /// Tiny page entry attributes.
    ///
    /// Tiny pages exist only on ARMv5, which has no TEX, APX, XN, S or nG.
    /// Those properties are dropped.
    #[must_use]
    pub fn tiny_page(self) -> TinyPageAttributes {
        let (_, c, b) = self.memory.tex_cb();
        let reg: InMemoryRegister<u32, TINY_PAGE::Register> = InMemoryRegister::new(TinyPageAttributes::TAG);
        reg.modify(
            TINY_PAGE::AP.val(self.access.ap()) + TINY_PAGE::C.val(c as u32) + TINY_PAGE::B.val(b as u32),
        );
        TinyPageAttributes::from_bits(reg.get())
    }
}
