//! Hardware Resource Handle
//!
//! [`Cpu`] is the single seam between this workspace and the processor. Every
//! register access, barrier and pipeline operation goes through it, so every
//! side effect is visible in a function signature and host tests can swap in a
//! recording implementation.
//!
//! The real implementation is [`Cp15Core`](crate::hardware::Cp15Core), built
//! only for `target_arch = "arm"`.

use crate::cp15::{Cp15Op, Cp15Register};
use crate::registers::ProcessorMode;

/// Architecture level of the core being brought up.
///
/// Selects the few behaviours that differ between generations (coprocessor
/// access control, barrier requirements after CPACR writes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArchVersion {
    /// ARMv4/ARMv4T (ARM7TDMI, ARM920T)
    V4,
    /// ARMv5TE/ARMv5TEJ (ARM926EJ-S, ARM946E-S)
    V5,
    /// ARMv6 (ARM1136, ARM1176)
    V6,
    /// ARMv7-A/ARMv7-R (Cortex-A, Cortex-R)
    V7,
}

impl ArchVersion {
    /// Whether the core has the Coprocessor Access Control register.
    #[inline]
    #[must_use]
    pub const fn has_cpacr(self) -> bool {
        matches!(self, ArchVersion::V6 | ArchVersion::V7)
    }

    /// Whether a VFP coprocessor can be attached at all.
    #[inline]
    #[must_use]
    pub const fn supports_vfp(self) -> bool {
        !matches!(self, ArchVersion::V4)
    }

    /// Whether branch prediction can be controlled through SCTLR.Z.
    #[inline]
    #[must_use]
    pub const fn supports_branch_prediction(self) -> bool {
        !matches!(self, ArchVersion::V4)
    }
}

/// Access to one processor core's registers and pipeline.
///
/// Reads take `&self`, anything that changes processor state takes
/// `&mut self`. Implementations issue exactly the instruction asked for;
/// ordering and barriers are the caller's responsibility.
pub trait Cpu {
    /// Architecture level of this core.
    fn arch(&self) -> ArchVersion;

    /// Read a CP15 register.
    fn read(&self, reg: Cp15Register) -> u32;

    /// Write a CP15 register.
    fn write(&mut self, reg: Cp15Register, value: u32);

    /// Issue a CP15 maintenance operation with the given operand.
    fn op(&mut self, op: Cp15Op, operand: u32);

    /// Read the Current Program Status Register.
    fn read_cpsr(&self) -> u32;

    /// Write the control and flag fields of the CPSR.
    fn write_cpsr(&mut self, value: u32);

    /// Read the Floating-Point Exception Control register.
    fn read_fpexc(&self) -> u32;

    /// Write the Floating-Point Exception Control register.
    fn write_fpexc(&mut self, value: u32);

    /// Read the Floating-Point Status and Control register.
    fn read_fpscr(&self) -> u32;

    /// Write the Floating-Point Status and Control register.
    fn write_fpscr(&mut self, value: u32);

    /// Zero the VFP double registers D0-D15.
    fn clear_fp_registers(&mut self);

    /// Load the banked stack pointer of another processor mode.
    ///
    /// The implementation switches into `mode` with IRQ and FIQ masked, loads
    /// SP and switches back.
    ///
    /// # Safety
    ///
    /// `mode` must not be the current mode, since that would move the stack
    /// this code runs on. `value` must be the top of memory reserved for that
    /// mode's stack.
    unsafe fn write_banked_sp(&mut self, mode: ProcessorMode, value: u32);

    /// Whether the core enforces a hardware stack limit.
    fn has_stack_limit(&self) -> bool {
        false
    }

    /// Program the hardware stack limit. No-op on cores without one.
    fn write_stack_limit(&mut self, _limit: u32) {}

    /// Data Synchronisation Barrier.
    fn dsb(&mut self);

    /// Data Memory Barrier.
    fn dmb(&mut self);

    /// Instruction Synchronisation Barrier.
    fn isb(&mut self);

    /// Software breakpoint (`BKPT #0`).
    fn breakpoint(&mut self);

    /// Wait for interrupt.
    fn wait_for_interrupt(&mut self);
}
