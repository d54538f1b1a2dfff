//! MMU (Memory Management Unit) Support
//!
//! Control of the short-descriptor MMU: translation table base, domain access
//! control, TLB invalidation and the SCTLR enable bit. Building the tables
//! themselves lives in `lark-paging`.
//!
//! # Enable sequence
//!
//! ```ignore
//! let mut mmu = Mmu::new(&mut cpu);
//! mmu.set_domain_access(DomainAccessControl::new().with(0, DomainAccess::Client));
//! mmu.set_ttbr0(ttb_phys);
//! mmu.invalidate_tlb_all();
//! mmu.enable();
//! ```

use tock_registers::interfaces::Readable;

use crate::cp15::{Cp15Op, Cp15Register};
use crate::cpu::Cpu;
use crate::registers::{SCTLR, modify_sctlr, read_sctlr};

/// Number of MMU domains.
pub const DOMAIN_COUNT: u8 = 16;

/// Access type granted to one domain in the DACR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DomainAccess {
    /// Any access faults
    NoAccess = 0b00,
    /// Accesses are checked against the descriptor's permission bits
    Client = 0b01,
    /// Accesses are never permission checked
    Manager = 0b11,
}

/// Domain Access Control Register value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DomainAccessControl(u32);

impl DomainAccessControl {
    /// Every domain set to no access.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Every domain set to `access`.
    #[must_use]
    pub const fn all(access: DomainAccess) -> Self {
        let mut dacr = Self::new();
        let mut domain = 0;
        while domain < DOMAIN_COUNT {
            dacr = dacr.with(domain, access);
            domain += 1;
        }
        dacr
    }

    /// Set the access type of `domain` (0-15).
    ///
    /// # Panics
    ///
    /// Panics if `domain` is 16 or larger.
    #[must_use]
    pub const fn with(self, domain: u8, access: DomainAccess) -> Self {
        assert!(domain < DOMAIN_COUNT, "domain out of range");
        let shift = domain as u32 * 2;
        Self((self.0 & !(0b11 << shift)) | ((access as u32) << shift))
    }

    /// Access type of `domain`. The reserved encoding `0b10` reads as no access.
    #[must_use]
    pub const fn get(self, domain: u8) -> DomainAccess {
        match (self.0 >> (domain as u32 % 16 * 2)) & 0b11 {
            0b01 => DomainAccess::Client,
            0b11 => DomainAccess::Manager,
            _ => DomainAccess::NoAccess,
        }
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

/// MMU control for one core.
pub struct Mmu<'a, C: Cpu + ?Sized> {
    cpu: &'a mut C,
}

impl<'a, C: Cpu + ?Sized> Mmu<'a, C> {
    pub fn new(cpu: &'a mut C) -> Self {
        Self { cpu }
    }

    /// Check if the MMU is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        read_sctlr(&*self.cpu).is_set(SCTLR::M)
    }

    /// Turn translation on.
    ///
    /// Alignment checking is turned off at the same time. The caller must have
    /// installed a table that maps the code executing this call.
    pub fn enable(&mut self) {
        modify_sctlr(&mut *self.cpu, SCTLR::A::CLEAR + SCTLR::M::SET);
        self.cpu.isb();
        log::debug!("mmu enabled");
    }

    /// Turn translation off.
    pub fn disable(&mut self) {
        modify_sctlr(&mut *self.cpu, SCTLR::M::CLEAR);
        self.cpu.isb();
        log::debug!("mmu disabled");
    }

    /// Invalidate all TLB entries.
    pub fn invalidate_tlb_all(&mut self) {
        self.cpu.op(Cp15Op::TlbInvalidateAll, 0);
        self.cpu.dsb();
        self.cpu.isb();
    }

    /// Invalidate the TLB entry for one virtual address.
    pub fn invalidate_tlb_vaddr(&mut self, vaddr: u32) {
        self.cpu.op(Cp15Op::TlbInvalidateLine, vaddr & !0xFFF);
        self.cpu.dsb();
        self.cpu.isb();
    }

    /// Invalidate all TLB entries tagged with `asid` (ARMv6+).
    pub fn invalidate_tlb_asid(&mut self, asid: u8) {
        self.cpu.op(Cp15Op::TlbInvalidateAsid, asid as u32);
        self.cpu.dsb();
        self.cpu.isb();
    }

    /// Set Translation Table Base Register 0.
    ///
    /// `ttbr0` is the 16KB-aligned table address ORed with the walk
    /// attribute bits.
    pub fn set_ttbr0(&mut self, ttbr0: u32) {
        debug_assert!(ttbr0 & 0x3F80 == 0, "TTBR0 table base must be 16KB aligned");
        self.cpu.write(Cp15Register::Ttbr0, ttbr0);
        self.cpu.isb();
    }

    /// Get Translation Table Base Register 0.
    #[must_use]
    pub fn ttbr0(&self) -> u32 {
        self.cpu.read(Cp15Register::Ttbr0)
    }

    /// Set the domain access control register.
    pub fn set_domain_access(&mut self, dacr: DomainAccessControl) {
        self.cpu.write(Cp15Register::Dacr, dacr.bits());
        self.cpu.isb();
    }

    /// Current domain access control.
    #[must_use]
    pub fn domain_access(&self) -> DomainAccessControl {
        DomainAccessControl::from_bits(self.cpu.read(Cp15Register::Dacr))
    }

    /// Set the current ASID in CONTEXTIDR, keeping the process ID bits.
    pub fn set_asid(&mut self, asid: u8) {
        let context = self.cpu.read(Cp15Register::ContextId);
        self.cpu.write(Cp15Register::ContextId, (context & !0xFF) | asid as u32);
        self.cpu.isb();
    }
}
