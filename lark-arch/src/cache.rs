//! AArch32 Cache Maintenance Operations
//!
//! Cache geometry is decoded on every call. ARMv5/ARMv6 cores describe their
//! caches in the Cache Type Register; ARMv7 cores select a cache through CSSELR
//! and describe it in CCSIDR. Reading each time means the result always
//! reflects the hardware actually being maintained.
//!
//! # Coherency Model
//! - **Clean**: Write dirty cache lines to memory
//! - **Invalidate**: Discard cache lines without writing
//! - **Clean + Invalidate**: Both, in one operation
//!
//! # Barriers
//!
//! | Operation                                   | Completion              |
//! |---------------------------------------------|-------------------------|
//! | D-cache line or range (any mode)            | DMB                     |
//! | D-cache set/way sweep                       | one DMB after the sweep |
//! | D-cache invalidate all                      | DMB                     |
//! | I-cache line, I-cache all, I+D all, BP all  | DSB then ISB            |
//! | SCTLR cache/branch-prediction enable bits   | ISB                     |
//! | CSSELR cache selection (ARMv7)              | ISB before CCSIDR read  |
//!
//! # Set/Way Selector
//!
//! ```text
//! 31        32-A            L          0
//! +----------+------//------+-----------+
//! |   way    |     set      |  (zero)   |
//! +----------+------//------+-----------+
//! A = ceil(log2(ways)), L = log2(line length in bytes)
//! ```
//!
//! Level bits [3:1] of the ARMv7 selector stay zero: only L1 is maintained.

use tock_registers::{interfaces::Readable, registers::InMemoryRegister};

use crate::cp15::{Cp15Op, Cp15Register};
use crate::cpu::{ArchVersion, Cpu};
use crate::registers::{CACHE_SIZE, CCSIDR, CSSELR, CTR, CTR_V7, SCTLR, modify_sctlr};

/// Which half of a Harvard cache to describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSide {
    Data,
    Instruction,
}

impl CacheSide {
    /// CSSELR value selecting this side of the L1 cache.
    #[inline]
    #[must_use]
    pub fn csselr(self) -> u32 {
        let ind = match self {
            CacheSide::Data => CSSELR::IND::CLEAR,
            CacheSide::Instruction => CSSELR::IND::SET,
        };
        (ind + CSSELR::LEVEL.val(0)).value
    }
}

/// Geometry of one cache level and side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeometry {
    ways: u32,
    sets: u32,
    line_bits: u32,
    absent: bool,
}

impl CacheGeometry {
    /// Decode one 12-bit ARMv5/ARMv6 size field (DSIZE or ISIZE).
    #[must_use]
    pub fn from_size_field(field: u32) -> Self {
        let field: InMemoryRegister<u32, CACHE_SIZE::Register> = InMemoryRegister::new(field & 0xFFF);
        let multiplier = field.is_set(CACHE_SIZE::M);
        let assoc = field.read(CACHE_SIZE::ASSOC);
        let len = field.read(CACHE_SIZE::LEN);
        let size = field.read(CACHE_SIZE::SIZE);

        let ways = 1u32 << assoc;
        Self {
            ways: if multiplier { ways + (ways >> 1) } else { ways },
            sets: 1u32 << (size + 6).saturating_sub(assoc + len),
            line_bits: len + 3,
            absent: multiplier && assoc == 0,
        }
    }

    /// Decode the geometry of one side from a full ARMv5/ARMv6 Cache Type
    /// Register value.
    #[must_use]
    pub fn decode(ctr: u32, side: CacheSide) -> Self {
        let ctr: InMemoryRegister<u32, CTR::Register> = InMemoryRegister::new(ctr);
        match side {
            CacheSide::Data => Self::from_size_field(ctr.read(CTR::DSIZE)),
            CacheSide::Instruction => Self::from_size_field(ctr.read(CTR::ISIZE)),
        }
    }

    /// Decode an ARMv7 Cache Size ID Register value.
    #[must_use]
    pub fn from_ccsidr(ccsidr: u32) -> Self {
        let ccsidr: InMemoryRegister<u32, CCSIDR::Register> = InMemoryRegister::new(ccsidr);
        Self {
            ways: ccsidr.read(CCSIDR::ASSOCIATIVITY) + 1,
            sets: ccsidr.read(CCSIDR::NUM_SETS) + 1,
            // words = 4 << LINE_SIZE, four bytes each
            line_bits: ccsidr.read(CCSIDR::LINE_SIZE) + 4,
            absent: false,
        }
    }

    /// Whether the descriptor reports that no cache is present.
    #[inline]
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        self.absent
    }

    /// log2 of the line length in bytes; also the set field shift.
    #[inline]
    #[must_use]
    pub const fn line_bits(&self) -> u32 {
        self.line_bits
    }

    /// Line length in bytes.
    #[inline]
    #[must_use]
    pub const fn line_len(&self) -> u32 {
        1 << self.line_bits
    }

    /// Number of ways.
    #[inline]
    #[must_use]
    pub const fn ways(&self) -> u32 {
        self.ways
    }

    /// Number of sets.
    #[inline]
    #[must_use]
    pub const fn sets(&self) -> u32 {
        self.sets
    }

    /// Width of the way index in a set/way selector, `ceil(log2(ways))`.
    #[inline]
    #[must_use]
    pub const fn associativity_bits(&self) -> u32 {
        if self.ways <= 1 { 0 } else { 32 - (self.ways - 1).leading_zeros() }
    }

    /// Shift applied to the way index in a set/way selector.
    #[inline]
    #[must_use]
    pub const fn way_shift(&self) -> u32 {
        32 - self.associativity_bits()
    }

    /// Total cache size in bytes.
    #[inline]
    #[must_use]
    pub const fn size_bytes(&self) -> u32 {
        self.ways.saturating_mul(self.sets).saturating_mul(self.line_len())
    }

    /// Encode a (way, set) pair into a set/way selector.
    ///
    /// A direct-mapped cache has a way shift of 32; its only way encodes as 0.
    #[inline]
    #[must_use]
    pub const fn set_way(&self, way: u32, set: u32) -> u32 {
        let way_bits = match way.checked_shl(self.way_shift()) {
            Some(bits) => bits,
            None => 0,
        };
        way_bits | (set << self.line_bits)
    }

    /// Every set/way selector of this cache, highest way and set first.
    #[must_use]
    pub fn set_way_selectors(&self) -> SetWaySelectors {
        SetWaySelectors {
            geometry: *self,
            way: self.ways - 1,
            set: self.sets - 1,
            done: false,
        }
    }
}

/// Iterator over the set/way selectors of a cache.
///
/// Ways descend in the outer loop and sets in the inner loop. Any order that
/// visits each pair once is equally valid; this one matches the order the
/// architecture manuals use in their example sequences.
#[derive(Debug, Clone)]
pub struct SetWaySelectors {
    geometry: CacheGeometry,
    way: u32,
    set: u32,
    done: bool,
}

impl Iterator for SetWaySelectors {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.done {
            return None;
        }

        let selector = self.geometry.set_way(self.way, self.set);

        if self.set > 0 {
            self.set -= 1;
        } else if self.way > 0 {
            self.way -= 1;
            self.set = self.geometry.sets() - 1;
        } else {
            self.done = true;
        }

        Some(selector)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.done {
            0
        } else {
            self.way as usize * self.geometry.sets() as usize + self.set as usize + 1
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SetWaySelectors {}

/// Kind of data cache maintenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maintenance {
    Invalidate,
    Clean,
    CleanInvalidate,
}

impl Maintenance {
    /// CP15 operation taking a set/way selector.
    #[inline]
    #[must_use]
    pub const fn set_way_op(self) -> Cp15Op {
        match self {
            Maintenance::Invalidate => Cp15Op::DcacheInvalidateSetWay,
            Maintenance::Clean => Cp15Op::DcacheCleanSetWay,
            Maintenance::CleanInvalidate => Cp15Op::DcacheCleanInvalidateSetWay,
        }
    }

    /// CP15 operation taking a modified virtual address.
    #[inline]
    #[must_use]
    pub const fn line_op(self) -> Cp15Op {
        match self {
            Maintenance::Invalidate => Cp15Op::DcacheInvalidateLine,
            Maintenance::Clean => Cp15Op::DcacheCleanLine,
            Maintenance::CleanInvalidate => Cp15Op::DcacheCleanInvalidateLine,
        }
    }
}

/// Read and decode the L1 geometry of one side.
///
/// On ARMv7 this writes CSSELR to select the cache, then reads CCSIDR.
#[must_use]
pub fn read_geometry<C: Cpu + ?Sized>(cpu: &mut C, side: CacheSide) -> CacheGeometry {
    if cpu.arch() >= ArchVersion::V7 {
        cpu.write(Cp15Register::Csselr, side.csselr());
        cpu.isb();
        CacheGeometry::from_ccsidr(cpu.read(Cp15Register::Ccsidr))
    } else {
        CacheGeometry::decode(cpu.read(Cp15Register::CacheType), side)
    }
}

/// Read and decode the L1 data cache geometry.
#[inline]
#[must_use]
pub fn decode_geometry<C: Cpu + ?Sized>(cpu: &mut C) -> CacheGeometry {
    read_geometry(cpu, CacheSide::Data)
}

/// Read and decode the L1 instruction cache geometry.
#[inline]
#[must_use]
pub fn decode_icache_geometry<C: Cpu + ?Sized>(cpu: &mut C) -> CacheGeometry {
    read_geometry(cpu, CacheSide::Instruction)
}

/// Smallest data cache line in bytes, the stride for maintenance by address.
#[must_use]
pub fn dcache_line_len<C: Cpu + ?Sized>(cpu: &C) -> u32 {
    let ctr = cpu.read(Cp15Register::CacheType);
    if cpu.arch() >= ArchVersion::V7 {
        let ctr: InMemoryRegister<u32, CTR_V7::Register> = InMemoryRegister::new(ctr);
        4 << ctr.read(CTR_V7::DMINLINE)
    } else {
        CacheGeometry::decode(ctr, CacheSide::Data).line_len()
    }
}

// -- Single line

/// Invalidate the data cache line holding `addr`.
#[inline]
pub fn invalidate_dcache_line<C: Cpu + ?Sized>(cpu: &mut C, addr: u32) {
    cpu.op(Cp15Op::DcacheInvalidateLine, addr);
    cpu.dmb();
}

/// Clean the data cache line holding `addr`.
#[inline]
pub fn clean_dcache_line<C: Cpu + ?Sized>(cpu: &mut C, addr: u32) {
    cpu.op(Cp15Op::DcacheCleanLine, addr);
    cpu.dmb();
}

/// Clean and invalidate the data cache line holding `addr`.
#[inline]
pub fn clean_invalidate_dcache_line<C: Cpu + ?Sized>(cpu: &mut C, addr: u32) {
    cpu.op(Cp15Op::DcacheCleanInvalidateLine, addr);
    cpu.dmb();
}

/// Invalidate the instruction cache line holding `addr`.
#[inline]
pub fn invalidate_icache_line<C: Cpu + ?Sized>(cpu: &mut C, addr: u32) {
    cpu.op(Cp15Op::IcacheInvalidateLine, addr);
    cpu.dsb();
    cpu.isb();
}

// -- Address range

/// Apply `mode` to every data cache line overlapping `addr..addr + len`.
///
/// Issues one DMB after the last line. A zero length does nothing.
pub fn maintain_dcache_range<C: Cpu + ?Sized>(cpu: &mut C, mode: Maintenance, addr: u32, len: u32) {
    if len == 0 {
        return;
    }

    let line = dcache_line_len(cpu);
    let start = addr & !(line - 1);
    let end = addr.saturating_add(len);
    let op = mode.line_op();

    let mut line_addr = start;
    while line_addr < end {
        cpu.op(op, line_addr);
        line_addr = match line_addr.checked_add(line) {
            Some(next) => next,
            None => break,
        };
    }

    cpu.dmb();
}

/// Clean the data cache over an address range.
#[inline]
pub fn clean_dcache_range<C: Cpu + ?Sized>(cpu: &mut C, addr: u32, len: u32) {
    maintain_dcache_range(cpu, Maintenance::Clean, addr, len);
}

/// Invalidate the data cache over an address range.
///
/// Lines only partly covered by the range are invalidated too; dirty data
/// sharing those lines is lost.
#[inline]
pub fn invalidate_dcache_range<C: Cpu + ?Sized>(cpu: &mut C, addr: u32, len: u32) {
    maintain_dcache_range(cpu, Maintenance::Invalidate, addr, len);
}

/// Clean and invalidate the data cache over an address range.
#[inline]
pub fn clean_invalidate_dcache_range<C: Cpu + ?Sized>(cpu: &mut C, addr: u32, len: u32) {
    maintain_dcache_range(cpu, Maintenance::CleanInvalidate, addr, len);
}

// -- Whole cache

/// Apply `mode` to the whole data cache by set/way.
///
/// Visits every (way, set) pair of the decoded geometry exactly once and
/// issues a single DMB after the sweep.
pub fn maintain_dcache_set_way<C: Cpu + ?Sized>(cpu: &mut C, mode: Maintenance) {
    let geometry = decode_geometry(cpu);
    let op = mode.set_way_op();

    for selector in geometry.set_way_selectors() {
        cpu.op(op, selector);
    }

    cpu.dmb();

    log::trace!(
        "dcache {:?}: {} ways x {} sets, {} byte lines",
        mode,
        geometry.ways(),
        geometry.sets(),
        geometry.line_len()
    );
}

/// Invalidate the whole data cache by set/way.
#[inline]
pub fn invalidate_dcache<C: Cpu + ?Sized>(cpu: &mut C) {
    maintain_dcache_set_way(cpu, Maintenance::Invalidate);
}

/// Clean the whole data cache by set/way.
#[inline]
pub fn clean_dcache<C: Cpu + ?Sized>(cpu: &mut C) {
    maintain_dcache_set_way(cpu, Maintenance::Clean);
}

/// Clean and invalidate the whole data cache by set/way.
#[inline]
pub fn clean_invalidate_dcache<C: Cpu + ?Sized>(cpu: &mut C) {
    maintain_dcache_set_way(cpu, Maintenance::CleanInvalidate);
}

/// Invalidate the whole data cache with the single-operation form.
///
/// Only defined on ARMv5/ARMv6; ARMv7 cores must use [`invalidate_dcache`].
#[inline]
pub fn invalidate_dcache_all<C: Cpu + ?Sized>(cpu: &mut C) {
    cpu.op(Cp15Op::DcacheInvalidateAll, 0);
    cpu.dmb();
}

/// Invalidate the whole instruction cache.
#[inline]
pub fn invalidate_icache_all<C: Cpu + ?Sized>(cpu: &mut C) {
    cpu.op(Cp15Op::IcacheInvalidateAll, 0);
    cpu.dsb();
    cpu.isb();
}

/// Invalidate both caches with the unified single operation (ARMv5/ARMv6).
#[inline]
pub fn invalidate_all<C: Cpu + ?Sized>(cpu: &mut C) {
    cpu.op(Cp15Op::CacheInvalidateAll, 0);
    cpu.dsb();
    cpu.isb();
}

/// Invalidate the branch predictor array.
#[inline]
pub fn invalidate_branch_predictor<C: Cpu + ?Sized>(cpu: &mut C) {
    cpu.op(Cp15Op::BranchPredictorInvalidateAll, 0);
    cpu.dsb();
    cpu.isb();
}

// -- Enable / disable

/// Enable the instruction and data caches.
pub fn enable_caches<C: Cpu + ?Sized>(cpu: &mut C) {
    modify_sctlr(cpu, SCTLR::I::SET + SCTLR::C::SET);
    cpu.isb();
}

/// Disable the instruction and data caches.
///
/// Dirty lines are not written back; clean the data cache first if it
/// holds data that must survive.
pub fn disable_caches<C: Cpu + ?Sized>(cpu: &mut C) {
    modify_sctlr(cpu, SCTLR::I::CLEAR + SCTLR::C::CLEAR);
    cpu.isb();
}

/// Enable only the instruction cache.
pub fn enable_icache<C: Cpu + ?Sized>(cpu: &mut C) {
    modify_sctlr(cpu, SCTLR::I::SET);
    cpu.isb();
}

/// Enable only the data cache.
pub fn enable_dcache<C: Cpu + ?Sized>(cpu: &mut C) {
    modify_sctlr(cpu, SCTLR::C::SET);
    cpu.isb();
}

/// Enable branch prediction.
pub fn enable_branch_prediction<C: Cpu + ?Sized>(cpu: &mut C) {
    modify_sctlr(cpu, SCTLR::Z::SET);
    cpu.isb();
}

/// Disable branch prediction.
pub fn disable_branch_prediction<C: Cpu + ?Sized>(cpu: &mut C) {
    modify_sctlr(cpu, SCTLR::Z::CLEAR);
    cpu.isb();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::ArchVersion;
    use crate::mock::{Event, MockCpu};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    /// Build a 12-bit size field from its codes.
    fn size_field(len: u32, multiplier: bool, assoc: u32, size: u32) -> u32 {
        len | (multiplier as u32) << 2 | assoc << 3 | size << 6
    }

    /// ARM926EJ-S with 32KB I-cache and 16KB D-cache, both 4-way, 32-byte lines.
    const ARM926_CTR: u32 = 0x1D15_2192;

    fn cpu_with_ctr(ctr: u32) -> MockCpu {
        MockCpu::new(ArchVersion::V5).with_register(Cp15Register::CacheType, ctr)
    }

    /// Cortex-A8: 32KB L1 D-cache, 4-way, 64-byte lines.
    const CORTEX_A8_CTR: u32 = 0x8204_8004;
    const CORTEX_A8_L1D_CCSIDR: u32 = 0xE00F_E01A;

    /// Cortex-A9: 32KB L1 D-cache, 4-way, 32-byte lines.
    const CORTEX_A9_CTR: u32 = 0x8333_8003;
    const CORTEX_A9_L1D_CCSIDR: u32 = 0xE01F_E019;

    fn cpu_v7(ctr: u32, ccsidr: u32) -> MockCpu {
        MockCpu::new(ArchVersion::V7)
            .with_register(Cp15Register::CacheType, ctr)
            .with_register(Cp15Register::Ccsidr, ccsidr)
    }

    fn set_way_ops(cpu: &MockCpu) -> Vec<(Cp15Op, u32)> {
        cpu.events()
            .iter()
            .filter_map(|event| match *event {
                Event::Op(op, operand) if op.is_set_way() => Some((op, operand)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_decode_arm926_geometry() {
        let dcache = CacheGeometry::decode(ARM926_CTR, CacheSide::Data);
        assert_eq!(dcache.line_len(), 32);
        assert_eq!(dcache.ways(), 4);
        assert_eq!(dcache.sets(), 128);
        assert_eq!(dcache.size_bytes(), 16 * 1024);
        assert_eq!(dcache.way_shift(), 30);
        assert_eq!(dcache.line_bits(), 5);

        let icache = CacheGeometry::decode(ARM926_CTR, CacheSide::Instruction);
        assert_eq!(icache.ways(), 4);
        assert_eq!(icache.sets(), 256);
        assert_eq!(icache.size_bytes(), 32 * 1024);
    }

    #[test]
    fn test_decode_geometry_reads_cache_type() {
        let mut cpu = cpu_with_ctr(ARM926_CTR);
        assert_eq!(decode_geometry(&mut cpu), CacheGeometry::decode(ARM926_CTR, CacheSide::Data));
        assert_eq!(decode_icache_geometry(&mut cpu).sets(), 256);
        assert!(cpu.events().is_empty());
    }

    #[test]
    fn test_decode_cortex_a8_ccsidr() {
        let dcache = CacheGeometry::from_ccsidr(CORTEX_A8_L1D_CCSIDR);
        assert_eq!(dcache.ways(), 4);
        assert_eq!(dcache.sets(), 128);
        assert_eq!(dcache.line_len(), 64);
        assert_eq!(dcache.size_bytes(), 32 * 1024);
        assert_eq!(dcache.way_shift(), 30);
        assert_eq!(dcache.set_way(3, 127), 0xC000_1FC0);
        assert!(!dcache.is_absent());
    }

    #[test]
    fn test_ccsidr_odd_associativity_rounds_way_field_up() {
        // 3 ways, 64 sets, 32-byte lines
        let geometry = CacheGeometry::from_ccsidr((63 << 13) | (2 << 3) | 1);
        assert_eq!(geometry.ways(), 3);
        assert_eq!(geometry.associativity_bits(), 2);
        assert_eq!(geometry.way_shift(), 30);
        assert_eq!(geometry.set_way(2, 63), 0x8000_07E0);
    }

    #[test]
    fn test_v7_geometry_selects_l1_through_csselr() {
        let mut cpu = cpu_v7(CORTEX_A8_CTR, CORTEX_A8_L1D_CCSIDR);
        assert_eq!(decode_geometry(&mut cpu), CacheGeometry::from_ccsidr(CORTEX_A8_L1D_CCSIDR));
        assert_eq!(cpu.events(), &[Event::Write(Cp15Register::Csselr, 0), Event::Isb]);

        cpu.clear_events();
        let _ = decode_icache_geometry(&mut cpu);
        assert_eq!(cpu.events(), &[Event::Write(Cp15Register::Csselr, 1), Event::Isb]);
    }

    #[test]
    fn test_v7_sweep_covers_every_line() {
        let mut cpu = cpu_v7(CORTEX_A8_CTR, CORTEX_A8_L1D_CCSIDR);
        invalidate_dcache(&mut cpu);

        let ops = set_way_ops(&cpu);
        assert_eq!(ops.len(), 4 * 128);
        let distinct: BTreeSet<u32> = ops.iter().map(|(_, sw)| *sw).collect();
        assert_eq!(distinct.len(), 4 * 128);
        for way in 0..4 {
            for set in 0..128 {
                assert!(distinct.contains(&((way << 30) | (set << 6))));
            }
        }

        let select = cpu.position(&Event::Write(Cp15Register::Csselr, 0)).unwrap();
        let first_op = cpu.position_where(|e| matches!(e, Event::Op(..))).unwrap();
        assert!(select < first_op);
        assert_eq!(cpu.events().last(), Some(&Event::Dmb));
    }

    #[test]
    fn test_v7_sweep_cortex_a9() {
        let mut cpu = cpu_v7(CORTEX_A9_CTR, CORTEX_A9_L1D_CCSIDR);
        clean_invalidate_dcache(&mut cpu);
        assert_eq!(set_way_ops(&cpu).len(), 4 * 256);
    }

    #[test]
    fn test_v7_range_uses_minimum_line() {
        let mut cpu = cpu_v7(CORTEX_A8_CTR, CORTEX_A8_L1D_CCSIDR);
        assert_eq!(dcache_line_len(&cpu), 64);
        clean_dcache_range(&mut cpu, 0x1020, 0x40);
        assert_eq!(
            cpu.events(),
            &[
                Event::Op(Cp15Op::DcacheCleanLine, 0x1000),
                Event::Op(Cp15Op::DcacheCleanLine, 0x1040),
                Event::Dmb,
            ]
        );
    }

    #[test]
    fn test_multiplier_scales_ways() {
        // 24KB, 6-way (4 × 1.5), 32-byte lines
        let geometry = CacheGeometry::from_size_field(size_field(2, true, 2, 5));
        assert_eq!(geometry.ways(), 6);
        assert_eq!(geometry.sets(), 128);
        assert_eq!(geometry.associativity_bits(), 3);
        assert_eq!(geometry.way_shift(), 29);
        assert_eq!(geometry.size_bytes(), 24 * 1024);
    }

    #[test]
    fn test_absent_cache() {
        let geometry = CacheGeometry::from_size_field(size_field(0, true, 0, 0));
        assert!(geometry.is_absent());
        assert!(!CacheGeometry::decode(ARM926_CTR, CacheSide::Data).is_absent());
    }

    #[test]
    fn test_direct_mapped_way_encodes_as_zero() {
        let geometry = CacheGeometry::from_size_field(size_field(1, false, 0, 3));
        assert_eq!(geometry.ways(), 1);
        assert_eq!(geometry.way_shift(), 32);
        assert_eq!(geometry.set_way(0, 5), 5 << 4);
    }

    #[test]
    fn test_set_way_encoding() {
        let geometry = CacheGeometry::decode(ARM926_CTR, CacheSide::Data);
        assert_eq!(geometry.set_way(3, 127), 0xC000_0FE0);
        assert_eq!(geometry.set_way(1, 1), 0x4000_0020);
        assert_eq!(geometry.set_way(0, 0), 0);
    }

    #[test]
    fn test_selectors_descend() {
        let geometry = CacheGeometry::from_size_field(size_field(0, false, 1, 0));
        // 2 ways, 2^(0+6-1-0) = 32 sets
        let selectors: Vec<u32> = geometry.set_way_selectors().collect();
        assert_eq!(selectors.len(), 64);
        assert_eq!(selectors[0], geometry.set_way(1, 31));
        assert_eq!(selectors[1], geometry.set_way(1, 30));
        assert_eq!(selectors[32], geometry.set_way(0, 31));
        assert_eq!(selectors[63], geometry.set_way(0, 0));
    }

    #[test]
    fn test_selectors_exact_size() {
        let geometry = CacheGeometry::decode(ARM926_CTR, CacheSide::Data);
        let mut selectors = geometry.set_way_selectors();
        assert_eq!(selectors.len(), 512);
        selectors.next();
        assert_eq!(selectors.len(), 511);
        assert_eq!(selectors.count(), 511);
    }

    #[test]
    fn test_whole_cache_sweep_covers_every_pair_once() {
        let mut cpu = cpu_with_ctr(ARM926_CTR);
        clean_invalidate_dcache(&mut cpu);

        let ops = set_way_ops(&cpu);
        assert_eq!(ops.len(), 4 * 128);
        assert!(ops.iter().all(|(op, _)| *op == Cp15Op::DcacheCleanInvalidateSetWay));

        let distinct: BTreeSet<u32> = ops.iter().map(|(_, sw)| *sw).collect();
        assert_eq!(distinct.len(), 4 * 128);
        for way in 0..4 {
            for set in 0..128 {
                assert!(distinct.contains(&((way << 30) | (set << 5))));
            }
        }
    }

    #[test]
    fn test_sweep_issues_one_trailing_barrier() {
        let mut cpu = cpu_with_ctr(ARM926_CTR);
        invalidate_dcache(&mut cpu);

        let events = cpu.events();
        assert_eq!(cpu.count(&Event::Dmb), 1);
        assert_eq!(events.last(), Some(&Event::Dmb));
        assert_eq!(cpu.count(&Event::Dsb), 0);
    }

    #[test]
    fn test_sweep_mode_selects_operation() {
        let mut cpu = cpu_with_ctr(ARM926_CTR);
        clean_dcache(&mut cpu);
        assert!(set_way_ops(&cpu).iter().all(|(op, _)| *op == Cp15Op::DcacheCleanSetWay));

        let mut cpu = cpu_with_ctr(ARM926_CTR);
        invalidate_dcache(&mut cpu);
        assert!(set_way_ops(&cpu).iter().all(|(op, _)| *op == Cp15Op::DcacheInvalidateSetWay));
    }

    #[test]
    fn test_invalidate_twice_matches_once() {
        let mut once = cpu_with_ctr(ARM926_CTR);
        invalidate_dcache(&mut once);

        let mut twice = cpu_with_ctr(ARM926_CTR);
        invalidate_dcache(&mut twice);
        let first_pass = twice.events().to_vec();
        twice.clear_events();
        invalidate_dcache(&mut twice);

        assert_eq!(first_pass, once.events());
        assert_eq!(twice.events(), once.events());
        assert_eq!(twice.registers(), once.registers());
    }

    #[test]
    fn test_line_barriers() {
        let mut cpu = MockCpu::new(ArchVersion::V6);
        clean_dcache_line(&mut cpu, 0x8000_0040);
        assert_eq!(cpu.events(), &[Event::Op(Cp15Op::DcacheCleanLine, 0x8000_0040), Event::Dmb]);

        cpu.clear_events();
        invalidate_dcache_line(&mut cpu, 0x100);
        clean_invalidate_dcache_line(&mut cpu, 0x120);
        assert_eq!(
            cpu.events(),
            &[
                Event::Op(Cp15Op::DcacheInvalidateLine, 0x100),
                Event::Dmb,
                Event::Op(Cp15Op::DcacheCleanInvalidateLine, 0x120),
                Event::Dmb,
            ]
        );

        cpu.clear_events();
        invalidate_icache_line(&mut cpu, 0x200);
        assert_eq!(
            cpu.events(),
            &[Event::Op(Cp15Op::IcacheInvalidateLine, 0x200), Event::Dsb, Event::Isb]
        );
    }

    #[test]
    fn test_whole_cache_single_operations() {
        let mut cpu = MockCpu::new(ArchVersion::V5);
        invalidate_icache_all(&mut cpu);
        invalidate_all(&mut cpu);
        invalidate_dcache_all(&mut cpu);
        invalidate_branch_predictor(&mut cpu);
        assert_eq!(
            cpu.events(),
            &[
                Event::Op(Cp15Op::IcacheInvalidateAll, 0),
                Event::Dsb,
                Event::Isb,
                Event::Op(Cp15Op::CacheInvalidateAll, 0),
                Event::Dsb,
                Event::Isb,
                Event::Op(Cp15Op::DcacheInvalidateAll, 0),
                Event::Dmb,
                Event::Op(Cp15Op::BranchPredictorInvalidateAll, 0),
                Event::Dsb,
                Event::Isb,
            ]
        );
    }

    #[test]
    fn test_range_covers_partial_lines() {
        let mut cpu = cpu_with_ctr(ARM926_CTR);
        clean_dcache_range(&mut cpu, 0x1010, 0x40);

        // 0x1010..0x1050 touches lines 0x1000, 0x1020 and 0x1040
        assert_eq!(
            cpu.events(),
            &[
                Event::Op(Cp15Op::DcacheCleanLine, 0x1000),
                Event::Op(Cp15Op::DcacheCleanLine, 0x1020),
                Event::Op(Cp15Op::DcacheCleanLine, 0x1040),
                Event::Dmb,
            ]
        );
    }

    #[test]
    fn test_range_zero_length_is_noop() {
        let mut cpu = cpu_with_ctr(ARM926_CTR);
        invalidate_dcache_range(&mut cpu, 0x1000, 0);
        assert!(cpu.events().is_empty());
    }

    #[test]
    fn test_range_at_top_of_address_space() {
        let mut cpu = cpu_with_ctr(ARM926_CTR);
        clean_invalidate_dcache_range(&mut cpu, 0xFFFF_FFE0, 0x100);
        assert_eq!(
            cpu.events(),
            &[Event::Op(Cp15Op::DcacheCleanInvalidateLine, 0xFFFF_FFE0), Event::Dmb]
        );
    }

    #[test]
    fn test_enable_caches_preserves_other_bits() {
        let mut cpu = MockCpu::new(ArchVersion::V5).with_register(Cp15Register::Sctlr, 0x0005_0078);
        enable_caches(&mut cpu);
        assert_eq!(cpu.register(Cp15Register::Sctlr), 0x0005_107C);
        assert_eq!(cpu.events().last(), Some(&Event::Isb));

        disable_caches(&mut cpu);
        assert_eq!(cpu.register(Cp15Register::Sctlr), 0x0005_0078);
    }

    #[test]
    fn test_branch_prediction_toggle() {
        let mut cpu = MockCpu::new(ArchVersion::V6);
        enable_branch_prediction(&mut cpu);
        assert_eq!(cpu.register(Cp15Register::Sctlr), 1 << 11);
        disable_branch_prediction(&mut cpu);
        assert_eq!(cpu.register(Cp15Register::Sctlr), 0);
        assert_eq!(cpu.count(&Event::Isb), 2);
    }

    #[test]
    fn test_individual_cache_enables() {
        let mut cpu = MockCpu::new(ArchVersion::V6);
        enable_icache(&mut cpu);
        assert_eq!(cpu.register(Cp15Register::Sctlr), 1 << 12);
        enable_dcache(&mut cpu);
        assert_eq!(cpu.register(Cp15Register::Sctlr), (1 << 12) | (1 << 2));
    }

    proptest! {
        #[test]
        fn prop_geometry_matches_formula(
            len in 0u32..4,
            assoc in 0u32..8,
            size in 0u32..16,
            multiplier in any::<bool>(),
        ) {
            let geometry = CacheGeometry::from_size_field(size_field(len, multiplier, assoc, size));

            let base_ways = 1u32 << assoc;
            let expected_ways = if multiplier { base_ways * 3 / 2 } else { base_ways };
            prop_assert_eq!(geometry.ways(), expected_ways.max(1));
            prop_assert_eq!(geometry.line_len(), 8 << len);

            if size + 6 >= assoc + len {
                prop_assert_eq!(geometry.sets(), 1u32 << (size + 6 - assoc - len));
            } else {
                prop_assert_eq!(geometry.sets(), 1);
            }
        }

        #[test]
        fn prop_selectors_are_distinct_and_complete(
            len in 0u32..4,
            assoc in 0u32..4,
            size in 0u32..6,
            multiplier in any::<bool>(),
        ) {
            let geometry = CacheGeometry::from_size_field(size_field(len, multiplier, assoc, size));
            let selectors: Vec<u32> = geometry.set_way_selectors().collect();
            let distinct: BTreeSet<u32> = selectors.iter().copied().collect();

            let expected = (geometry.ways() * geometry.sets()) as usize;
            prop_assert_eq!(selectors.len(), expected);
            prop_assert_eq!(distinct.len(), expected);
        }
    }
}
