//! Real Processor Handle
//!
//! [`Cp15Core`] implements [`Cpu`] with `MRC`/`MCR`, `MRS`/`MSR` and, when the
//! target has a VFP, `VMRS`/`VMSR`. Barriers use the native ARMv7 instructions
//! when the target enables them and the CP15 equivalents otherwise.

use core::arch::asm;

use crate::cp15::{Cp15Op, Cp15Register};
use crate::cpu::{ArchVersion, Cpu};
use crate::registers::ProcessorMode;

macro_rules! mrc {
    ($crn:literal, $crm:literal, $opc2:literal) => {
        mrc!(0; $crn, $crm, $opc2)
    };
    ($opc1:literal; $crn:literal, $crm:literal, $opc2:literal) => {{
        let value: u32;
        // SAFETY: reading a CP15 identification or control register has no
        // side effects.
        unsafe {
            asm!(
                concat!("mrc p15, ", $opc1, ", {}, c", $crn, ", c", $crm, ", ", $opc2),
                out(reg) value,
                options(nomem, nostack, preserves_flags)
            );
        }
        value
    }};
}

macro_rules! mcr {
    ($crn:literal, $crm:literal, $opc2:literal, $value:expr) => {
        mcr!(0; $crn, $crm, $opc2, $value)
    };
    ($opc1:literal; $crn:literal, $crm:literal, $opc2:literal, $value:expr) => {{
        let value: u32 = $value;
        // SAFETY: the `Cpu` contract makes the caller responsible for what a
        // CP15 write does to the memory system; the instruction itself only
        // reads `value`.
        unsafe {
            asm!(
                concat!("mcr p15, ", $opc1, ", {}, c", $crn, ", c", $crm, ", ", $opc2),
                in(reg) value,
                options(nostack, preserves_flags)
            );
        }
    }};
}

/// The core this code is running on.
#[derive(Debug)]
pub struct Cp15Core {
    arch: ArchVersion,
}

impl Cp15Core {
    /// Take the handle for the executing core.
    ///
    /// # Safety
    ///
    /// `arch` must match the core, and there must be only one live handle per
    /// core. Through the handle safe code can disable the MMU or caches.
    #[must_use]
    pub const unsafe fn new(arch: ArchVersion) -> Self {
        Self { arch }
    }
}

impl Cpu for Cp15Core {
    fn arch(&self) -> ArchVersion {
        self.arch
    }

    fn read(&self, reg: Cp15Register) -> u32 {
        match reg {
            Cp15Register::MainId => mrc!(0, 0, 0),
            Cp15Register::CacheType => mrc!(0, 0, 1),
            Cp15Register::Ccsidr => mrc!(1; 0, 0, 0),
            Cp15Register::Csselr => mrc!(2; 0, 0, 0),
            Cp15Register::Sctlr => mrc!(1, 0, 0),
            Cp15Register::Actlr => mrc!(1, 0, 1),
            Cp15Register::Cpacr => mrc!(1, 0, 2),
            Cp15Register::Ttbr0 => mrc!(2, 0, 0),
            Cp15Register::Ttbr1 => mrc!(2, 0, 1),
            Cp15Register::Ttbcr => mrc!(2, 0, 2),
            Cp15Register::Dacr => mrc!(3, 0, 0),
            Cp15Register::Dfsr => mrc!(5, 0, 0),
            Cp15Register::Ifsr => mrc!(5, 0, 1),
            Cp15Register::Dfar => mrc!(6, 0, 0),
            Cp15Register::Ifar => mrc!(6, 0, 2),
            Cp15Register::Vbar => mrc!(12, 0, 0),
            Cp15Register::FcsePid => mrc!(13, 0, 0),
            Cp15Register::ContextId => mrc!(13, 0, 1),
        }
    }

    fn write(&mut self, reg: Cp15Register, value: u32) {
        match reg {
            // Read-only
            Cp15Register::MainId | Cp15Register::CacheType | Cp15Register::Ccsidr => {}
            Cp15Register::Csselr => mcr!(2; 0, 0, 0, value),
            Cp15Register::Sctlr => mcr!(1, 0, 0, value),
            Cp15Register::Actlr => mcr!(1, 0, 1, value),
            Cp15Register::Cpacr => mcr!(1, 0, 2, value),
            Cp15Register::Ttbr0 => mcr!(2, 0, 0, value),
            Cp15Register::Ttbr1 => mcr!(2, 0, 1, value),
            Cp15Register::Ttbcr => mcr!(2, 0, 2, value),
            Cp15Register::Dacr => mcr!(3, 0, 0, value),
            Cp15Register::Dfsr => mcr!(5, 0, 0, value),
            Cp15Register::Ifsr => mcr!(5, 0, 1, value),
            Cp15Register::Dfar => mcr!(6, 0, 0, value),
            Cp15Register::Ifar => mcr!(6, 0, 2, value),
            Cp15Register::Vbar => mcr!(12, 0, 0, value),
            Cp15Register::FcsePid => mcr!(13, 0, 0, value),
            Cp15Register::ContextId => mcr!(13, 0, 1, value),
        }
    }

    fn op(&mut self, op: Cp15Op, operand: u32) {
        match op {
            Cp15Op::WaitForInterrupt => mcr!(7, 0, 4, operand),
            Cp15Op::IcacheInvalidateAll => mcr!(7, 5, 0, operand),
            Cp15Op::IcacheInvalidateLine => mcr!(7, 5, 1, operand),
            Cp15Op::InstructionSynchronizationBarrier => mcr!(7, 5, 4, operand),
            Cp15Op::BranchPredictorInvalidateAll => mcr!(7, 5, 6, operand),
            Cp15Op::DcacheInvalidateAll => mcr!(7, 6, 0, operand),
            Cp15Op::DcacheInvalidateLine => mcr!(7, 6, 1, operand),
            Cp15Op::DcacheInvalidateSetWay => mcr!(7, 6, 2, operand),
            Cp15Op::CacheInvalidateAll => mcr!(7, 7, 0, operand),
            Cp15Op::DcacheCleanLine => mcr!(7, 10, 1, operand),
            Cp15Op::DcacheCleanSetWay => mcr!(7, 10, 2, operand),
            Cp15Op::DataSynchronizationBarrier => mcr!(7, 10, 4, operand),
            Cp15Op::DataMemoryBarrier => mcr!(7, 10, 5, operand),
            Cp15Op::DcacheCleanInvalidateLine => mcr!(7, 14, 1, operand),
            Cp15Op::DcacheCleanInvalidateSetWay => mcr!(7, 14, 2, operand),
            Cp15Op::TlbInvalidateAll => mcr!(8, 7, 0, operand),
            Cp15Op::TlbInvalidateLine => mcr!(8, 7, 1, operand),
            Cp15Op::TlbInvalidateAsid => mcr!(8, 7, 2, operand),
        }
    }

    fn read_cpsr(&self) -> u32 {
        let value: u32;
        // SAFETY: MRS has no side effects.
        unsafe {
            asm!("mrs {}, cpsr", out(reg) value, options(nomem, nostack, preserves_flags));
        }
        value
    }

    fn write_cpsr(&mut self, value: u32) {
        // SAFETY: only the flag and control bytes are written; a mode change
        // is the caller's decision under the `Cpu` contract.
        unsafe {
            asm!("msr cpsr_fc, {}", in(reg) value, options(nostack));
        }
    }

    #[cfg(target_feature = "vfp2")]
    fn read_fpexc(&self) -> u32 {
        let value: u32;
        // SAFETY: FPEXC is readable from any privileged mode.
        unsafe {
            asm!("vmrs {}, fpexc", out(reg) value, options(nomem, nostack, preserves_flags));
        }
        value
    }

    #[cfg(not(target_feature = "vfp2"))]
    fn read_fpexc(&self) -> u32 {
        0
    }

    #[cfg(target_feature = "vfp2")]
    fn write_fpexc(&mut self, value: u32) {
        // SAFETY: FPEXC only controls the VFP unit.
        unsafe {
            asm!("vmsr fpexc, {}", in(reg) value, options(nomem, nostack, preserves_flags));
        }
    }

    #[cfg(not(target_feature = "vfp2"))]
    fn write_fpexc(&mut self, _value: u32) {}

    #[cfg(target_feature = "vfp2")]
    fn read_fpscr(&self) -> u32 {
        let value: u32;
        // SAFETY: FPSCR is readable once the VFP is enabled.
        unsafe {
            asm!("vmrs {}, fpscr", out(reg) value, options(nomem, nostack, preserves_flags));
        }
        value
    }

    #[cfg(not(target_feature = "vfp2"))]
    fn read_fpscr(&self) -> u32 {
        0
    }

    #[cfg(target_feature = "vfp2")]
    fn write_fpscr(&mut self, value: u32) {
        // SAFETY: FPSCR only affects floating point execution.
        unsafe {
            asm!("vmsr fpscr, {}", in(reg) value, options(nomem, nostack, preserves_flags));
        }
    }

    #[cfg(not(target_feature = "vfp2"))]
    fn write_fpscr(&mut self, _value: u32) {}

    #[cfg(target_feature = "vfp2")]
    fn clear_fp_registers(&mut self) {
        // SAFETY: runs before any floating point code, so no live values are
        // held in D0-D15.
        unsafe {
            asm!(
                "vmov d0, {z}, {z}",
                "vmov d1, {z}, {z}",
                "vmov d2, {z}, {z}",
                "vmov d3, {z}, {z}",
                "vmov d4, {z}, {z}",
                "vmov d5, {z}, {z}",
                "vmov d6, {z}, {z}",
                "vmov d7, {z}, {z}",
                "vmov d8, {z}, {z}",
                "vmov d9, {z}, {z}",
                "vmov d10, {z}, {z}",
                "vmov d11, {z}, {z}",
                "vmov d12, {z}, {z}",
                "vmov d13, {z}, {z}",
                "vmov d14, {z}, {z}",
                "vmov d15, {z}, {z}",
                z = in(reg) 0u32,
                out("d0") _, out("d1") _, out("d2") _, out("d3") _,
                out("d4") _, out("d5") _, out("d6") _, out("d7") _,
                out("d8") _, out("d9") _, out("d10") _, out("d11") _,
                out("d12") _, out("d13") _, out("d14") _, out("d15") _,
                options(nomem, nostack, preserves_flags)
            );
        }
    }

    #[cfg(not(target_feature = "vfp2"))]
    fn clear_fp_registers(&mut self) {}

    unsafe fn write_banked_sp(&mut self, mode: ProcessorMode, value: u32) {
        // SAFETY: `mode` is not the current mode, so the stack this code runs
        // on is untouched. IRQ and FIQ stay masked while in `mode`, and the
        // saved control byte is restored before returning.
        unsafe {
            asm!(
                "mrs {saved}, cpsr",
                "msr cpsr_c, {control}",
                "mov sp, {value}",
                "msr cpsr_c, {saved}",
                saved = out(reg) _,
                control = in(reg) mode.masked_control(),
                value = in(reg) value,
                options(nomem, preserves_flags)
            );
        }
    }

    #[cfg(target_feature = "v7")]
    fn dsb(&mut self) {
        // SAFETY: barriers have no side effects besides ordering.
        unsafe {
            asm!("dsb", options(nostack, preserves_flags));
        }
    }

    #[cfg(not(target_feature = "v7"))]
    fn dsb(&mut self) {
        mcr!(7, 10, 4, 0);
    }

    #[cfg(target_feature = "v7")]
    fn dmb(&mut self) {
        // SAFETY: barriers have no side effects besides ordering.
        unsafe {
            asm!("dmb", options(nostack, preserves_flags));
        }
    }

    #[cfg(not(target_feature = "v7"))]
    fn dmb(&mut self) {
        if self.arch >= ArchVersion::V6 {
            mcr!(7, 10, 5, 0);
        } else {
            // Drain write buffer
            mcr!(7, 10, 4, 0);
        }
    }

    #[cfg(target_feature = "v7")]
    fn isb(&mut self) {
        // SAFETY: barriers have no side effects besides ordering.
        unsafe {
            asm!("isb", options(nostack, preserves_flags));
        }
    }

    #[cfg(not(target_feature = "v7"))]
    fn isb(&mut self) {
        if self.arch >= ArchVersion::V6 {
            mcr!(7, 5, 4, 0);
        }
    }

    fn breakpoint(&mut self) {
        // SAFETY: traps to an attached debugger; without one the core halts
        // or takes a prefetch abort, both acceptable at end of execution.
        unsafe {
            asm!("bkpt #0", options(nomem, nostack));
        }
    }

    #[cfg(target_feature = "v7")]
    fn wait_for_interrupt(&mut self) {
        // SAFETY: WFI is always safe to call
        unsafe {
            asm!("wfi", options(nomem, nostack));
        }
    }

    #[cfg(not(target_feature = "v7"))]
    fn wait_for_interrupt(&mut self) {
        mcr!(7, 0, 4, 0);
    }
}
