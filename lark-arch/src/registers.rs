//! Control and Status Register Layouts
//!
//! Bit-exact field layouts for the AArch32 registers touched during bring-up,
//! declared with `register_bitfields!` so every field is an explicit
//! mask/shift pair. Values are read through the [`Cpu`] handle into an
//! [`InMemoryRegister`] view, edited with `modify`, and written back, which
//! keeps unrelated bits intact.
//!
//! ```ignore
//! let sctlr = read_sctlr(cpu);
//! if !sctlr.is_set(SCTLR::I) {
//!     modify_sctlr(cpu, SCTLR::I::SET + SCTLR::C::SET);
//! }
//! ```

use core::fmt;

use tock_registers::{
    fields::{Field, FieldValue},
    interfaces::{ReadWriteable, Readable},
    register_bitfields,
    registers::InMemoryRegister,
};

use crate::cp15::Cp15Register;
use crate::cpu::Cpu;

register_bitfields![u32,
    /// Current/Saved Program Status Register
    pub CPSR [
        /// Processor mode
        M OFFSET(0) NUMBITS(5) [
            User = 0x10,
            Fiq = 0x11,
            Irq = 0x12,
            Supervisor = 0x13,
            Abort = 0x17,
            Undefined = 0x1B,
            System = 0x1F
        ],
        /// Thumb execution state
        T OFFSET(5) NUMBITS(1) [],
        /// FIQ mask
        F OFFSET(6) NUMBITS(1) [],
        /// IRQ mask
        I OFFSET(7) NUMBITS(1) [],
        /// Asynchronous abort mask (ARMv6+)
        A OFFSET(8) NUMBITS(1) [],
        /// Big-endian data access (ARMv6+)
        E OFFSET(9) NUMBITS(1) [],
        /// SIMD greater-than-or-equal flags (ARMv6+)
        GE OFFSET(16) NUMBITS(4) [],
        /// Jazelle state
        J OFFSET(24) NUMBITS(1) [],
        /// Cumulative saturation
        Q OFFSET(27) NUMBITS(1) [],
        /// Overflow
        V OFFSET(28) NUMBITS(1) [],
        /// Carry
        C OFFSET(29) NUMBITS(1) [],
        /// Zero
        Z OFFSET(30) NUMBITS(1) [],
        /// Negative
        N OFFSET(31) NUMBITS(1) []
    ],

    /// System Control Register
    pub SCTLR [
        /// MMU enable
        M OFFSET(0) NUMBITS(1) [],
        /// Alignment check enable
        A OFFSET(1) NUMBITS(1) [],
        /// Data (or unified) cache enable
        C OFFSET(2) NUMBITS(1) [],
        /// Write buffer enable
        W OFFSET(3) NUMBITS(1) [],
        /// 32-bit exception handlers (ARMv4 legacy, reads as one later)
        P OFFSET(4) NUMBITS(1) [],
        /// 32-bit data address range (ARMv4 legacy, reads as one later)
        D OFFSET(5) NUMBITS(1) [],
        /// Late abort model (ARMv4 legacy, reads as one later)
        L OFFSET(6) NUMBITS(1) [],
        /// Big-endian memory system
        B OFFSET(7) NUMBITS(1) [],
        /// System protection (deprecated)
        S OFFSET(8) NUMBITS(1) [],
        /// ROM protection (deprecated)
        R OFFSET(9) NUMBITS(1) [],
        /// SWP/SWPB enable
        F OFFSET(10) NUMBITS(1) [],
        /// Branch prediction enable
        Z OFFSET(11) NUMBITS(1) [],
        /// Instruction cache enable
        I OFFSET(12) NUMBITS(1) [],
        /// High exception vectors at 0xFFFF_0000
        V OFFSET(13) NUMBITS(1) [],
        /// Round-robin cache replacement
        RR OFFSET(14) NUMBITS(1) [],
        /// ARMv4 interworking on PC loads disabled
        L4 OFFSET(15) NUMBITS(1) [],
        /// Fast interrupt configuration
        FI OFFSET(21) NUMBITS(1) [],
        /// Unaligned data access support (ARMv6)
        U OFFSET(22) NUMBITS(1) [],
        /// Extended page tables, subpage AP disabled (ARMv6)
        XP OFFSET(23) NUMBITS(1) [],
        /// Vectored interrupts
        VE OFFSET(24) NUMBITS(1) [],
        /// Exception endianness
        EE OFFSET(25) NUMBITS(1) [],
        /// L2 unified cache enable (ARM1136 family)
        L2 OFFSET(26) NUMBITS(1) []
    ],

    /// Coprocessor Access Control Register
    pub CPACR [
        CP0 OFFSET(0) NUMBITS(2) [],
        CP1 OFFSET(2) NUMBITS(2) [],
        CP2 OFFSET(4) NUMBITS(2) [],
        CP3 OFFSET(6) NUMBITS(2) [],
        CP4 OFFSET(8) NUMBITS(2) [],
        CP5 OFFSET(10) NUMBITS(2) [],
        CP6 OFFSET(12) NUMBITS(2) [],
        CP7 OFFSET(14) NUMBITS(2) [],
        CP8 OFFSET(16) NUMBITS(2) [],
        CP9 OFFSET(18) NUMBITS(2) [],
        /// Single-precision VFP
        CP10 OFFSET(20) NUMBITS(2) [
            Denied = 0b00,
            Privileged = 0b01,
            Full = 0b11
        ],
        /// Double-precision VFP
        CP11 OFFSET(22) NUMBITS(2) [
            Denied = 0b00,
            Privileged = 0b01,
            Full = 0b11
        ],
        CP12 OFFSET(24) NUMBITS(2) [],
        CP13 OFFSET(26) NUMBITS(2) []
    ],

    /// Data Fault Status Register
    pub DFSR [
        /// Fault status bits [3:0]
        FS OFFSET(0) NUMBITS(4) [],
        /// Domain being accessed when the fault occurred
        DOMAIN OFFSET(4) NUMBITS(4) [],
        /// Fault status bit 4
        FS4 OFFSET(10) NUMBITS(1) [],
        /// Write not read
        WNR OFFSET(11) NUMBITS(1) []
    ],

    /// Instruction Fault Status Register
    pub IFSR [
        /// Fault status bits [3:0]
        FS OFFSET(0) NUMBITS(4) [],
        /// Fault status bit 4
        FS4 OFFSET(10) NUMBITS(1) []
    ],

    /// Cache Type Register (ARMv5/ARMv6 format)
    pub CTR [
        /// Instruction cache size field
        ISIZE OFFSET(0) NUMBITS(12) [],
        /// Data cache size field
        DSIZE OFFSET(12) NUMBITS(12) [],
        /// Separate instruction and data caches (Harvard)
        S OFFSET(24) NUMBITS(1) [],
        /// Cache type and clean/lockdown capability
        CTYPE OFFSET(25) NUMBITS(4) []
    ],

    /// One size field of the Cache Type Register
    pub CACHE_SIZE [
        /// Line length code: bytes per line = 8 << LEN
        LEN OFFSET(0) NUMBITS(2) [],
        /// Multiplier: ways and size scaled by 1.5
        M OFFSET(2) NUMBITS(1) [],
        /// Associativity code: ways = 1 << ASSOC
        ASSOC OFFSET(3) NUMBITS(3) [],
        /// Size code: bytes = 512 << SIZE
        SIZE OFFSET(6) NUMBITS(4) [],
        /// Cache absent when set together with ASSOC == 0 and M == 1
        ABSENT OFFSET(10) NUMBITS(1) [],
        /// Page colouring restriction (ARMv6)
        P OFFSET(11) NUMBITS(1) []
    ],

    /// Cache Type Register (ARMv7 format)
    pub CTR_V7 [
        /// log2 of the smallest I-cache line, in words
        IMINLINE OFFSET(0) NUMBITS(4) [],
        /// L1 instruction cache policy
        L1IP OFFSET(14) NUMBITS(2) [],
        /// log2 of the smallest D-cache or unified line, in words
        DMINLINE OFFSET(16) NUMBITS(4) [],
        /// Exclusives reservation granule
        ERG OFFSET(20) NUMBITS(4) [],
        /// Cache writeback granule
        CWG OFFSET(24) NUMBITS(4) [],
        /// 0b100 for this layout
        FORMAT OFFSET(29) NUMBITS(3) [
            Armv6 = 0b000,
            Armv7 = 0b100
        ]
    ],

    /// Cache Size Selection Register (ARMv7)
    pub CSSELR [
        /// Instruction rather than data or unified cache
        IND OFFSET(0) NUMBITS(1) [],
        /// Cache level minus one
        LEVEL OFFSET(1) NUMBITS(3) []
    ],

    /// Cache Size ID Register (ARMv7), describing the cache CSSELR selects
    pub CCSIDR [
        /// log2 of the line length in words, minus 2
        LINE_SIZE OFFSET(0) NUMBITS(3) [],
        /// Number of ways minus one
        ASSOCIATIVITY OFFSET(3) NUMBITS(10) [],
        /// Number of sets minus one
        NUM_SETS OFFSET(13) NUMBITS(15) [],
        WA OFFSET(28) NUMBITS(1) [],
        RA OFFSET(29) NUMBITS(1) [],
        WB OFFSET(30) NUMBITS(1) [],
        WT OFFSET(31) NUMBITS(1) []
    ],

    /// Floating-Point Exception Control Register
    pub FPEXC [
        /// VFP enable
        EN OFFSET(30) NUMBITS(1) [],
        /// Exception pending
        EX OFFSET(31) NUMBITS(1) []
    ]
];

/// Snapshot of the System Control Register.
pub type Sctlr = InMemoryRegister<u32, SCTLR::Register>;

/// Snapshot of the Program Status Register.
pub type Cpsr = InMemoryRegister<u32, CPSR::Register>;

// -- SCTLR access

/// Read SCTLR into an editable snapshot.
#[must_use]
#[inline]
pub fn read_sctlr<C: Cpu + ?Sized>(cpu: &C) -> Sctlr {
    InMemoryRegister::new(cpu.read(Cp15Register::Sctlr))
}

/// Write a snapshot back to SCTLR.
#[inline]
pub fn write_sctlr<C: Cpu + ?Sized>(cpu: &mut C, value: &Sctlr) {
    cpu.write(Cp15Register::Sctlr, value.get());
}

/// Read-modify-write SCTLR, preserving every field not named in `fields`.
#[inline]
pub fn modify_sctlr<C: Cpu + ?Sized>(cpu: &mut C, fields: FieldValue<u32, SCTLR::Register>) {
    let sctlr = read_sctlr(cpu);
    sctlr.modify(fields);
    write_sctlr(cpu, &sctlr);
}

// -- CPSR access

/// Read the CPSR into an editable snapshot.
#[must_use]
#[inline]
pub fn read_cpsr<C: Cpu + ?Sized>(cpu: &C) -> Cpsr {
    InMemoryRegister::new(cpu.read_cpsr())
}

/// Read-modify-write the CPSR.
#[inline]
pub fn modify_cpsr<C: Cpu + ?Sized>(cpu: &mut C, fields: FieldValue<u32, CPSR::Register>) {
    let cpsr = read_cpsr(cpu);
    cpsr.modify(fields);
    cpu.write_cpsr(cpsr.get());
}

/// Mask IRQ and FIQ.
#[inline]
pub fn mask_interrupts<C: Cpu + ?Sized>(cpu: &mut C) {
    modify_cpsr(cpu, CPSR::I::SET + CPSR::F::SET);
}

/// Mode the processor is currently executing in.
#[inline]
pub fn current_mode<C: Cpu + ?Sized>(cpu: &C) -> Result<ProcessorMode, InvalidMode> {
    ProcessorMode::try_from(read_cpsr(cpu).read(CPSR::M))
}

// -- Processor modes

/// AArch32 processor mode, as encoded in CPSR.M.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ProcessorMode {
    User = 0x10,
    Fiq = 0x11,
    Irq = 0x12,
    Supervisor = 0x13,
    Abort = 0x17,
    Undefined = 0x1B,
    System = 0x1F,
}

impl ProcessorMode {
    /// Modes with a banked stack pointer, in the order they are set up.
    pub const BANKED: [ProcessorMode; 6] = [
        ProcessorMode::Fiq,
        ProcessorMode::Irq,
        ProcessorMode::Supervisor,
        ProcessorMode::Abort,
        ProcessorMode::Undefined,
        ProcessorMode::System,
    ];

    /// Raw 5-bit mode field.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Whether this mode runs with PL1 privileges.
    #[inline]
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        !matches!(self, ProcessorMode::User)
    }

    /// CPSR control byte that enters this mode with IRQ and FIQ masked.
    #[inline]
    #[must_use]
    pub fn masked_control(self) -> u32 {
        (CPSR::M.val(self.bits()) + CPSR::I::SET + CPSR::F::SET).value
    }
}

/// A CPSR.M value that names no architectural mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidMode(pub u32);

impl fmt::Display for InvalidMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid processor mode {:#07b}", self.0)
    }
}

impl TryFrom<u32> for ProcessorMode {
    type Error = InvalidMode;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits & 0x1F {
            0x10 => Ok(ProcessorMode::User),
            0x11 => Ok(ProcessorMode::Fiq),
            0x12 => Ok(ProcessorMode::Irq),
            0x13 => Ok(ProcessorMode::Supervisor),
            0x17 => Ok(ProcessorMode::Abort),
            0x1B => Ok(ProcessorMode::Undefined),
            0x1F => Ok(ProcessorMode::System),
            other => Err(InvalidMode(other)),
        }
    }
}

// -- Coprocessor access

/// Access rights granted to one coprocessor in CPACR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CoprocessorAccess {
    /// Any access generates an Undefined Instruction exception
    Denied = 0b00,
    /// Privileged access only
    Privileged = 0b01,
    /// Privileged and user access
    Full = 0b11,
}

/// CPACR field for coprocessor `n` (0-13).
///
/// # Panics
///
/// Panics if `n` is 14 or 15; CP14 and CP15 access is not configurable.
#[must_use]
pub const fn coprocessor_field(n: usize) -> Field<u32, CPACR::Register> {
    assert!(n < 14, "CP14 and CP15 have no CPACR field");
    Field::new(0b11, n * 2)
}

/// Grant `access` to coprocessor `n` (0-13), preserving the other fields.
pub fn set_coprocessor_access<C: Cpu + ?Sized>(cpu: &mut C, n: usize, access: CoprocessorAccess) {
    let cpacr: InMemoryRegister<u32, CPACR::Register> = InMemoryRegister::new(cpu.read(Cp15Register::Cpacr));
    cpacr.modify(coprocessor_field(n).val(access as u32));
    cpu.write(Cp15Register::Cpacr, cpacr.get());
}

// -- Fault status decoding

/// Fault status register decoding.
pub mod fault {
    use core::fmt;

    use tock_registers::LocalRegisterCopy;

    use super::{DFSR, IFSR};

    /// Classification of a short-descriptor fault status code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FaultKind {
        Alignment,
        InstructionCacheMaintenance,
        TranslationSection,
        TranslationPage,
        AccessFlagSection,
        AccessFlagPage,
        DomainSection,
        DomainPage,
        PermissionSection,
        PermissionPage,
        ExternalAbortOnTranslationFirst,
        ExternalAbortOnTranslationSecond,
        ExternalAbort,
        ImpreciseExternalAbort,
        DebugEvent,
        Unknown(u8),
    }

    impl FaultKind {
        /// Classify a 5-bit fault status code.
        #[must_use]
        pub const fn from_status(status: u8) -> Self {
            match status {
                0b00001 => FaultKind::Alignment,
                0b00011 => FaultKind::AccessFlagSection,
                0b00100 => FaultKind::InstructionCacheMaintenance,
                0b00101 => FaultKind::TranslationSection,
                0b00111 => FaultKind::TranslationPage,
                0b00110 => FaultKind::AccessFlagPage,
                0b01000 => FaultKind::ExternalAbort,
                0b01001 => FaultKind::DomainSection,
                0b01011 => FaultKind::DomainPage,
                0b01100 => FaultKind::ExternalAbortOnTranslationFirst,
                0b01110 => FaultKind::ExternalAbortOnTranslationSecond,
                0b01101 => FaultKind::PermissionSection,
                0b01111 => FaultKind::PermissionPage,
                0b00010 => FaultKind::DebugEvent,
                0b10110 => FaultKind::ImpreciseExternalAbort,
                other => FaultKind::Unknown(other),
            }
        }

        /// Short human-readable name.
        #[must_use]
        pub const fn name(self) -> &'static str {
            match self {
                FaultKind::Alignment => "alignment fault",
                FaultKind::InstructionCacheMaintenance => "instruction cache maintenance fault",
                FaultKind::TranslationSection => "section translation fault",
                FaultKind::TranslationPage => "page translation fault",
                FaultKind::AccessFlagSection => "section access flag fault",
                FaultKind::AccessFlagPage => "page access flag fault",
                FaultKind::DomainSection => "section domain fault",
                FaultKind::DomainPage => "page domain fault",
                FaultKind::PermissionSection => "section permission fault",
                FaultKind::PermissionPage => "page permission fault",
                FaultKind::ExternalAbortOnTranslationFirst => "external abort on first-level walk",
                FaultKind::ExternalAbortOnTranslationSecond => "external abort on second-level walk",
                FaultKind::ExternalAbort => "external abort",
                FaultKind::ImpreciseExternalAbort => "imprecise external abort",
                FaultKind::DebugEvent => "debug event",
                FaultKind::Unknown(_) => "unknown fault",
            }
        }
    }

    /// Decoded DFSR or IFSR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FaultStatus {
        /// 5-bit fault status code
        pub status: u8,
        /// Domain being accessed (data faults only)
        pub domain: Option<u8>,
        /// Faulting access was a write (data faults only)
        pub write: bool,
        pub kind: FaultKind,
    }

    impl FaultStatus {
        /// Decode a Data Fault Status Register value.
        #[must_use]
        pub fn from_dfsr(raw: u32) -> Self {
            let dfsr = LocalRegisterCopy::<u32, DFSR::Register>::new(raw);
            let status = (dfsr.read(DFSR::FS) | dfsr.read(DFSR::FS4) << 4) as u8;
            Self {
                status,
                domain: Some(dfsr.read(DFSR::DOMAIN) as u8),
                write: dfsr.is_set(DFSR::WNR),
                kind: FaultKind::from_status(status),
            }
        }

        /// Decode an Instruction Fault Status Register value.
        #[must_use]
        pub fn from_ifsr(raw: u32) -> Self {
            let ifsr = LocalRegisterCopy::<u32, IFSR::Register>::new(raw);
            let status = (ifsr.read(IFSR::FS) | ifsr.read(IFSR::FS4) << 4) as u8;
            Self {
                status,
                domain: None,
                write: false,
                kind: FaultKind::from_status(status),
            }
        }
    }

    impl fmt::Display for FaultStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{} (status {:#04x}", self.kind.name(), self.status)?;
            if let Some(domain) = self.domain {
                write!(f, ", domain {}", domain)?;
            }
            if self.write {
                write!(f, ", write")?;
            }
            write!(f, ")")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fault::{FaultKind, FaultStatus};
    use super::*;

    #[test]
    fn test_sctlr_layout() {
        assert_eq!(SCTLR::M::SET.value, 1 << 0);
        assert_eq!(SCTLR::C::SET.value, 1 << 2);
        assert_eq!(SCTLR::Z::SET.value, 1 << 11);
        assert_eq!(SCTLR::I::SET.value, 1 << 12);
        assert_eq!(SCTLR::V::SET.value, 1 << 13);
        assert_eq!(SCTLR::XP::SET.value, 1 << 23);
        assert_eq!(SCTLR::L2::SET.value, 1 << 26);
    }

    #[test]
    fn test_cpsr_layout() {
        assert_eq!(CPSR::I::SET.value, 0x80);
        assert_eq!(CPSR::F::SET.value, 0x40);
        assert_eq!(CPSR::M.mask, 0x1F);
        assert_eq!(CPSR::GE.shift, 16);
        assert_eq!(CPSR::N::SET.value, 1 << 31);
    }

    #[test]
    fn test_processor_mode_round_trip() {
        for mode in ProcessorMode::BANKED {
            assert_eq!(ProcessorMode::try_from(mode.bits()), Ok(mode));
        }
        assert_eq!(ProcessorMode::try_from(0x10), Ok(ProcessorMode::User));
        assert_eq!(ProcessorMode::try_from(0x14), Err(InvalidMode(0x14)));
        // Only the mode field is considered
        assert_eq!(ProcessorMode::try_from(0x6000_01D3), Ok(ProcessorMode::Supervisor));
    }

    #[test]
    fn test_masked_control() {
        assert_eq!(ProcessorMode::Irq.masked_control(), 0xD2);
        assert_eq!(ProcessorMode::System.masked_control(), 0xDF);
        assert!(!ProcessorMode::User.is_privileged());
    }

    #[test]
    fn test_invalid_mode_display() {
        assert_eq!(InvalidMode(0x14).to_string(), "invalid processor mode 0b10100");
    }

    #[test]
    fn test_coprocessor_fields() {
        assert_eq!(coprocessor_field(10).shift, 20);
        assert_eq!(coprocessor_field(11).shift, 22);
        assert_eq!(coprocessor_field(0).mask, 0b11);
        let fpu = (CPACR::CP10::Full + CPACR::CP11::Full).value;
        assert_eq!(fpu, 0x00F0_0000);
    }

    #[test]
    #[should_panic]
    fn test_coprocessor_field_rejects_cp15() {
        let _ = coprocessor_field(15);
    }

    #[test]
    fn test_cache_size_layout() {
        let field: InMemoryRegister<u32, CACHE_SIZE::Register> = InMemoryRegister::new(0b1_0_0101_010_1_10);
        assert_eq!(field.read(CACHE_SIZE::LEN), 0b10);
        assert!(field.is_set(CACHE_SIZE::M));
        assert_eq!(field.read(CACHE_SIZE::ASSOC), 0b010);
        assert_eq!(field.read(CACHE_SIZE::SIZE), 0b0101);
        assert!(!field.is_set(CACHE_SIZE::ABSENT));
        assert!(field.is_set(CACHE_SIZE::P));
    }

    #[test]
    fn test_data_fault_decode() {
        // Permission fault on a page, domain 3, write
        let status = FaultStatus::from_dfsr(0x0000_083F);
        assert_eq!(status.status, 0b01111);
        assert_eq!(status.kind, FaultKind::PermissionPage);
        assert_eq!(status.domain, Some(3));
        assert!(status.write);
        assert_eq!(
            status.to_string(),
            "page permission fault (status 0x0f, domain 3, write)"
        );
    }

    #[test]
    fn test_fault_status_bit4() {
        // FS4 set with FS = 0b0110: imprecise external abort
        let status = FaultStatus::from_dfsr(0x0000_0406);
        assert_eq!(status.status, 0b10110);
        assert_eq!(status.kind, FaultKind::ImpreciseExternalAbort);
        assert!(!status.write);
    }

    #[test]
    fn test_instruction_fault_decode() {
        let status = FaultStatus::from_ifsr(0x0000_0005);
        assert_eq!(status.kind, FaultKind::TranslationSection);
        assert_eq!(status.domain, None);
        assert_eq!(status.to_string(), "section translation fault (status 0x05)");
    }
}
