//! VFP Enable
//!
//! Coprocessors 10 and 11 are denied at reset. Enabling the VFP grants them in
//! CPACR, switches the unit on through FPEXC and clears register state left
//! over from before a warm reset.

use tock_registers::{
    interfaces::{ReadWriteable, Readable},
    registers::InMemoryRegister,
};

use crate::cp15::Cp15Register;
use crate::cpu::Cpu;
use crate::registers::{CPACR, FPEXC};

/// FPSCR bits kept across enable. Only reserved should-be-preserved bits
/// survive; flags, exception enables, rounding mode and vector configuration
/// are cleared.
pub const FPSCR_PRESERVE_MASK: u32 = 0x0008_6060;

/// Grant full access to CP10/CP11, enable the VFP and reset its state.
///
/// Cores before ARMv6 have no CPACR; on them this only touches FPEXC and the
/// register file.
pub fn enable_fpu<C: Cpu + ?Sized>(cpu: &mut C) {
    if cpu.arch().has_cpacr() {
        let cpacr: InMemoryRegister<u32, CPACR::Register> = InMemoryRegister::new(cpu.read(Cp15Register::Cpacr));
        cpacr.modify(CPACR::CP10::Full + CPACR::CP11::Full);
        cpu.write(Cp15Register::Cpacr, cpacr.get());
        cpu.isb();
    }

    let fpexc: InMemoryRegister<u32, FPEXC::Register> = InMemoryRegister::new(cpu.read_fpexc());
    fpexc.modify(FPEXC::EN::SET);
    cpu.write_fpexc(fpexc.get());

    cpu.clear_fp_registers();

    let fpscr = cpu.read_fpscr();
    cpu.write_fpscr(fpscr & FPSCR_PRESERVE_MASK);

    log::debug!("vfp enabled");
}

/// Check if the VFP is switched on.
#[must_use]
pub fn fpu_enabled<C: Cpu + ?Sized>(cpu: &C) -> bool {
    let fpexc: InMemoryRegister<u32, FPEXC::Register> = InMemoryRegister::new(cpu.read_fpexc());
    fpexc.is_set(FPEXC::EN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::ArchVersion;
    use crate::mock::{Event, MockCpu};

    #[test]
    fn test_enable_sequence() {
        let mut cpu = MockCpu::new(ArchVersion::V7)
            .with_register(Cp15Register::Cpacr, 0x0000_000C)
            .with_fpscr(0xF80F_FFFF);
        assert!(!fpu_enabled(&cpu));

        enable_fpu(&mut cpu);

        assert!(fpu_enabled(&cpu));
        assert_eq!(cpu.register(Cp15Register::Cpacr), 0x00F0_000C);
        assert_eq!(cpu.fpscr(), 0x0008_6060);
        assert_eq!(
            cpu.events(),
            &[
                Event::Write(Cp15Register::Cpacr, 0x00F0_000C),
                Event::Isb,
                Event::Fpexc(0x4000_0000),
                Event::ClearFp,
                Event::Fpscr(0x0008_6060),
            ]
        );
    }

    #[test]
    fn test_pre_v6_skips_cpacr() {
        let mut cpu = MockCpu::new(ArchVersion::V5);
        enable_fpu(&mut cpu);
        assert_eq!(cpu.position_where(|e| matches!(e, Event::Write(Cp15Register::Cpacr, _))), None);
        assert_eq!(cpu.count(&Event::Isb), 0);
        assert!(fpu_enabled(&cpu));
    }
}
