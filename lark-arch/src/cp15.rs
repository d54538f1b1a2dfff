//! System Control Coprocessor (CP15) Encodings
//!
//! Every CP15 access is `MCR/MRC p15, opc1, Rt, CRn, CRm, opc2`. Registers that
//! hold state are listed in [`Cp15Register`]; write-only maintenance
//! operations are listed in [`Cp15Op`]. Keeping the two apart means a
//! maintenance operation can never be "read back" by mistake.
//!
//! Encodings follow the ARMv5/ARMv6/ARMv7-A short-descriptor system. `opc1` is
//! zero except for the ARMv7 cache identification registers.

/// Encoding of a CP15 access as `(CRn, opc1, CRm, opc2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Encoding {
    pub crn: u8,
    pub opc1: u8,
    pub crm: u8,
    pub opc2: u8,
}

impl Encoding {
    #[inline]
    const fn new(crn: u8, crm: u8, opc2: u8) -> Self {
        Self { crn, opc1: 0, crm, opc2 }
    }

    #[inline]
    const fn with_opc1(crn: u8, opc1: u8, crm: u8, opc2: u8) -> Self {
        Self { crn, opc1, crm, opc2 }
    }
}

/// CP15 registers that can be read and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cp15Register {
    /// Main ID register (read-only)
    MainId,
    /// Cache Type register (read-only)
    CacheType,
    /// Cache Size ID register (ARMv7, read-only)
    Ccsidr,
    /// Cache Size Selection register (ARMv7)
    Csselr,
    /// System Control register
    Sctlr,
    /// Auxiliary Control register
    Actlr,
    /// Coprocessor Access Control register (ARMv6+)
    Cpacr,
    /// Translation Table Base register 0
    Ttbr0,
    /// Translation Table Base register 1 (ARMv6+)
    Ttbr1,
    /// Translation Table Base Control register (ARMv6+)
    Ttbcr,
    /// Domain Access Control register
    Dacr,
    /// Data Fault Status register
    Dfsr,
    /// Instruction Fault Status register
    Ifsr,
    /// Data Fault Address register
    Dfar,
    /// Instruction Fault Address register
    Ifar,
    /// Vector Base Address register (ARMv7 with Security Extensions)
    Vbar,
    /// FCSE Process ID register
    FcsePid,
    /// Context ID register
    ContextId,
}

impl Cp15Register {
    /// Encoding of this register.
    #[must_use]
    pub const fn encoding(self) -> Encoding {
        match self {
            Cp15Register::MainId => Encoding::new(0, 0, 0),
            Cp15Register::CacheType => Encoding::new(0, 0, 1),
            Cp15Register::Ccsidr => Encoding::with_opc1(0, 1, 0, 0),
            Cp15Register::Csselr => Encoding::with_opc1(0, 2, 0, 0),
            Cp15Register::Sctlr => Encoding::new(1, 0, 0),
            Cp15Register::Actlr => Encoding::new(1, 0, 1),
            Cp15Register::Cpacr => Encoding::new(1, 0, 2),
            Cp15Register::Ttbr0 => Encoding::new(2, 0, 0),
            Cp15Register::Ttbr1 => Encoding::new(2, 0, 1),
            Cp15Register::Ttbcr => Encoding::new(2, 0, 2),
            Cp15Register::Dacr => Encoding::new(3, 0, 0),
            Cp15Register::Dfsr => Encoding::new(5, 0, 0),
            Cp15Register::Ifsr => Encoding::new(5, 0, 1),
            Cp15Register::Dfar => Encoding::new(6, 0, 0),
            Cp15Register::Ifar => Encoding::new(6, 0, 2),
            Cp15Register::Vbar => Encoding::new(12, 0, 0),
            Cp15Register::FcsePid => Encoding::new(13, 0, 0),
            Cp15Register::ContextId => Encoding::new(13, 0, 1),
        }
    }
}

/// Write-only CP15 maintenance operations.
///
/// Operations ending in `Line` take a modified virtual address, those ending
/// in `SetWay` take a set/way selector, all others ignore their operand
/// (write zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cp15Op {
    /// ICIALLU: invalidate entire instruction cache
    IcacheInvalidateAll,
    /// ICIMVAU: invalidate instruction cache line by MVA
    IcacheInvalidateLine,
    /// BPIALL: invalidate entire branch predictor array
    BranchPredictorInvalidateAll,
    /// Invalidate entire data cache (ARMv5/ARMv6)
    DcacheInvalidateAll,
    /// DCIMVAC: invalidate data cache line by MVA
    DcacheInvalidateLine,
    /// DCISW: invalidate data cache line by set/way
    DcacheInvalidateSetWay,
    /// Invalidate both caches (ARMv5/ARMv6 unified operation)
    CacheInvalidateAll,
    /// DCCMVAC: clean data cache line by MVA
    DcacheCleanLine,
    /// DCCSW: clean data cache line by set/way
    DcacheCleanSetWay,
    /// DCCIMVAC: clean and invalidate data cache line by MVA
    DcacheCleanInvalidateLine,
    /// DCCISW: clean and invalidate data cache line by set/way
    DcacheCleanInvalidateSetWay,
    /// TLBIALL: invalidate entire unified TLB
    TlbInvalidateAll,
    /// TLBIMVA: invalidate unified TLB entry by MVA
    TlbInvalidateLine,
    /// TLBIASID: invalidate unified TLB entries by ASID
    TlbInvalidateAsid,
    /// Drain write buffer / CP15DSB
    DataSynchronizationBarrier,
    /// CP15DMB (ARMv6)
    DataMemoryBarrier,
    /// Flush prefetch buffer / CP15ISB
    InstructionSynchronizationBarrier,
    /// Wait for interrupt (ARMv5/ARMv6)
    WaitForInterrupt,
}

impl Cp15Op {
    /// Encoding of this operation.
    #[must_use]
    pub const fn encoding(self) -> Encoding {
        match self {
            Cp15Op::WaitForInterrupt => Encoding::new(7, 0, 4),
            Cp15Op::IcacheInvalidateAll => Encoding::new(7, 5, 0),
            Cp15Op::IcacheInvalidateLine => Encoding::new(7, 5, 1),
            Cp15Op::InstructionSynchronizationBarrier => Encoding::new(7, 5, 4),
            Cp15Op::BranchPredictorInvalidateAll => Encoding::new(7, 5, 6),
            Cp15Op::DcacheInvalidateAll => Encoding::new(7, 6, 0),
            Cp15Op::DcacheInvalidateLine => Encoding::new(7, 6, 1),
            Cp15Op::DcacheInvalidateSetWay => Encoding::new(7, 6, 2),
            Cp15Op::CacheInvalidateAll => Encoding::new(7, 7, 0),
            Cp15Op::DcacheCleanLine => Encoding::new(7, 10, 1),
            Cp15Op::DcacheCleanSetWay => Encoding::new(7, 10, 2),
            Cp15Op::DataSynchronizationBarrier => Encoding::new(7, 10, 4),
            Cp15Op::DataMemoryBarrier => Encoding::new(7, 10, 5),
            Cp15Op::DcacheCleanInvalidateLine => Encoding::new(7, 14, 1),
            Cp15Op::DcacheCleanInvalidateSetWay => Encoding::new(7, 14, 2),
            Cp15Op::TlbInvalidateAll => Encoding::new(8, 7, 0),
            Cp15Op::TlbInvalidateLine => Encoding::new(8, 7, 1),
            Cp15Op::TlbInvalidateAsid => Encoding::new(8, 7, 2),
        }
    }

    /// Whether the operand is a set/way selector.
    #[inline]
    #[must_use]
    pub const fn is_set_way(self) -> bool {
        matches!(
            self,
            Cp15Op::DcacheInvalidateSetWay
                | Cp15Op::DcacheCleanSetWay
                | Cp15Op::DcacheCleanInvalidateSetWay
        )
    }
}
