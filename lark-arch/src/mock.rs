//! Recording Hardware Handle
//!
//! [`MockCpu`] implements [`Cpu`] on the host. CP15 registers, CPSR and the
//! VFP control registers live in memory, and every state-changing call is
//! appended to an event log so tests can assert on exact instruction order.
//!
//! Enabled for this crate's tests and for dependents through the `mock`
//! feature.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::cp15::{Cp15Op, Cp15Register};
use crate::cpu::{ArchVersion, Cpu};
use crate::registers::ProcessorMode;

/// Reset value of the CPSR: Supervisor mode, IRQ and FIQ masked.
pub const RESET_CPSR: u32 = 0x0000_01D3;

/// One recorded hardware interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Write(Cp15Register, u32),
    Op(Cp15Op, u32),
    Cpsr(u32),
    Fpexc(u32),
    Fpscr(u32),
    ClearFp,
    BankedSp(ProcessorMode, u32),
    StackLimit(u32),
    Dsb,
    Dmb,
    Isb,
    Breakpoint,
    WaitForInterrupt,
}

/// In-memory processor that records what is done to it.
#[derive(Debug, Clone)]
pub struct MockCpu {
    arch: ArchVersion,
    registers: BTreeMap<Cp15Register, u32>,
    cpsr: u32,
    fpexc: u32,
    fpscr: u32,
    stack_limit: bool,
    events: Vec<Event>,
}

impl MockCpu {
    /// A core of the given architecture level straight out of reset.
    #[must_use]
    pub fn new(arch: ArchVersion) -> Self {
        Self {
            arch,
            registers: BTreeMap::new(),
            cpsr: RESET_CPSR,
            fpexc: 0,
            fpscr: 0,
            stack_limit: false,
            events: Vec::new(),
        }
    }

    /// Preset a CP15 register without recording an event.
    #[must_use]
    pub fn with_register(mut self, reg: Cp15Register, value: u32) -> Self {
        self.registers.insert(reg, value);
        self
    }

    /// Preset the CPSR without recording an event.
    #[must_use]
    pub fn with_cpsr(mut self, value: u32) -> Self {
        self.cpsr = value;
        self
    }

    /// Preset the FPSCR without recording an event.
    #[must_use]
    pub fn with_fpscr(mut self, value: u32) -> Self {
        self.fpscr = value;
        self
    }

    /// Model a core with a hardware stack limit register.
    #[must_use]
    pub fn with_stack_limit(mut self) -> Self {
        self.stack_limit = true;
        self
    }

    /// Current value of a CP15 register (zero if never written).
    #[must_use]
    pub fn register(&self, reg: Cp15Register) -> u32 {
        self.registers.get(&reg).copied().unwrap_or(0)
    }

    /// All CP15 register values.
    #[must_use]
    pub fn registers(&self) -> &BTreeMap<Cp15Register, u32> {
        &self.registers
    }

    #[must_use]
    pub fn cpsr(&self) -> u32 {
        self.cpsr
    }

    #[must_use]
    pub fn fpexc(&self) -> u32 {
        self.fpexc
    }

    #[must_use]
    pub fn fpscr(&self) -> u32 {
        self.fpscr
    }

    /// Recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Forget recorded events, keeping register state.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Number of times `event` was recorded.
    #[must_use]
    pub fn count(&self, event: &Event) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }

    /// Index of the first recording of `event`.
    #[must_use]
    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }

    /// Index of the first event matching `pred`.
    #[must_use]
    pub fn position_where(&self, pred: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events.iter().position(pred)
    }
}

impl Cpu for MockCpu {
    fn arch(&self) -> ArchVersion {
        self.arch
    }

    fn read(&self, reg: Cp15Register) -> u32 {
        self.register(reg)
    }

    fn write(&mut self, reg: Cp15Register, value: u32) {
        self.registers.insert(reg, value);
        self.events.push(Event::Write(reg, value));
    }

    fn op(&mut self, op: Cp15Op, operand: u32) {
        self.events.push(Event::Op(op, operand));
    }

    fn read_cpsr(&self) -> u32 {
        self.cpsr
    }

    fn write_cpsr(&mut self, value: u32) {
        self.cpsr = value;
        self.events.push(Event::Cpsr(value));
    }

    fn read_fpexc(&self) -> u32 {
        self.fpexc
    }

    fn write_fpexc(&mut self, value: u32) {
        self.fpexc = value;
        self.events.push(Event::Fpexc(value));
    }

    fn read_fpscr(&self) -> u32 {
        self.fpscr
    }

    fn write_fpscr(&mut self, value: u32) {
        self.fpscr = value;
        self.events.push(Event::Fpscr(value));
    }

    fn clear_fp_registers(&mut self) {
        self.events.push(Event::ClearFp);
    }

    unsafe fn write_banked_sp(&mut self, mode: ProcessorMode, value: u32) {
        self.events.push(Event::BankedSp(mode, value));
    }

    fn has_stack_limit(&self) -> bool {
        self.stack_limit
    }

    fn write_stack_limit(&mut self, limit: u32) {
        if self.stack_limit {
            self.events.push(Event::StackLimit(limit));
        }
    }

    fn dsb(&mut self) {
        self.events.push(Event::Dsb);
    }

    fn dmb(&mut self) {
        self.events.push(Event::Dmb);
    }

    fn isb(&mut self) {
        self.events.push(Event::Isb);
    }

    fn breakpoint(&mut self) {
        self.events.push(Event::Breakpoint);
    }

    fn wait_for_interrupt(&mut self) {
        self.events.push(Event::WaitForInterrupt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_default_to_zero() {
        let cpu = MockCpu::new(ArchVersion::V6);
        assert_eq!(cpu.register(Cp15Register::Sctlr), 0);
        assert_eq!(cpu.cpsr(), RESET_CPSR);
        assert!(cpu.events().is_empty());
    }

    #[test]
    fn test_writes_are_recorded_and_stored() {
        let mut cpu = MockCpu::new(ArchVersion::V6);
        cpu.write(Cp15Register::Dacr, 0x5555_5555);
        cpu.dsb();
        assert_eq!(cpu.register(Cp15Register::Dacr), 0x5555_5555);
        assert_eq!(cpu.events(), &[Event::Write(Cp15Register::Dacr, 0x5555_5555), Event::Dsb]);
        assert_eq!(cpu.position(&Event::Dsb), Some(1));
    }

    #[test]
    fn test_stack_limit_only_on_capable_cores() {
        let mut plain = MockCpu::new(ArchVersion::V7);
        plain.write_stack_limit(0x2000_0000);
        assert!(plain.events().is_empty());

        let mut limited = MockCpu::new(ArchVersion::V7).with_stack_limit();
        assert!(limited.has_stack_limit());
        limited.write_stack_limit(0x2000_0000);
        assert_eq!(limited.events(), &[Event::StackLimit(0x2000_0000)]);
    }
}
