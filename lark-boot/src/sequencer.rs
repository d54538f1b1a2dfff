//! Boot Sequencer
//!
//! Drives one core from the reset stub to `main` through a fixed series of
//! [`Stage`]s. Stages only move forward: the sequencer keeps the next stage to
//! run, [`Sequencer::step`] runs it and advances, and there is no way to go
//! back. Each stage branches only on the [`BootConfig`] it was built with.
//!
//! ```text
//! StackInit -> ResetHook -> HardwareEnable -> VectorTableInstall -> DataInit
//!     -> RuntimeInit -> BootstrapHook -> ApplicationEntry -> Halt
//! ```
//!
//! Every hardware-enable step finishes with the barrier that makes it visible
//! before the next one starts.

use core::fmt;
use core::ptr::write_volatile;

use lark_arch::{
    ArchVersion, Cp15Register, Cpu, ProcessorMode, cache, fpu,
    registers::{self, SCTLR},
};

use crate::config::{BootConfig, VectorBase};
use crate::{data, runtime};

/// Value written twice at the stack seal address.
pub const STACK_SEAL: u32 = 0xFEF5_EDA5;

/// One step of the boot sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    StackInit,
    ResetHook,
    HardwareEnable,
    VectorTableInstall,
    DataInit,
    RuntimeInit,
    BootstrapHook,
    ApplicationEntry,
    /// Terminal; never left
    Halt,
}

impl Stage {
    /// Stage that follows this one. `Halt` is followed by nothing.
    #[must_use]
    pub const fn next(self) -> Option<Stage> {
        match self {
            Stage::StackInit => Some(Stage::ResetHook),
            Stage::ResetHook => Some(Stage::HardwareEnable),
            Stage::HardwareEnable => Some(Stage::VectorTableInstall),
            Stage::VectorTableInstall => Some(Stage::DataInit),
            Stage::DataInit => Some(Stage::RuntimeInit),
            Stage::RuntimeInit => Some(Stage::BootstrapHook),
            Stage::BootstrapHook => Some(Stage::ApplicationEntry),
            Stage::ApplicationEntry => Some(Stage::Halt),
            Stage::Halt => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Stage::StackInit => "stack init",
            Stage::ResetHook => "reset hook",
            Stage::HardwareEnable => "hardware enable",
            Stage::VectorTableInstall => "vector table install",
            Stage::DataInit => "data init",
            Stage::RuntimeInit => "runtime init",
            Stage::BootstrapHook => "bootstrap hook",
            Stage::ApplicationEntry => "application entry",
            Stage::Halt => "halt",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One-shot boot state machine for a single core.
pub struct Sequencer<'a, C: Cpu> {
    cpu: &'a mut C,
    config: &'a BootConfig<'a, C>,
    next: Stage,
    exit_code: Option<i32>,
}

impl<'a, C: Cpu> Sequencer<'a, C> {
    /// Create a sequencer positioned at [`Stage::StackInit`].
    ///
    /// # Safety
    ///
    /// `config` must describe this core and image exactly: stack tops and the
    /// seal must lie in memory reserved for them, every copy/zero table entry
    /// and remap register must be valid to access, and every constructor must
    /// be sound to call. The caller must run on the stack the reset stub set
    /// up, and nothing else may run on this core while the sequence is in
    /// progress.
    #[must_use]
    pub unsafe fn new(cpu: &'a mut C, config: &'a BootConfig<'a, C>) -> Self {
        Self {
            cpu,
            config,
            next: Stage::StackInit,
            exit_code: None,
        }
    }

    /// Next stage to run.
    #[inline]
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.next
    }

    /// Code returned by `main`, once the application has run.
    #[inline]
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Run the next stage and return it, or `None` once only `Halt` is left.
    pub fn step(&mut self) -> Option<Stage> {
        let stage = self.next;
        let next = stage.next()?;

        log::debug!("boot: {}", stage);
        match stage {
            Stage::StackInit => self.stack_init(),
            Stage::ResetHook => {
                if let Some(hook) = self.config.hooks.on_reset {
                    hook(&mut *self.cpu);
                }
            }
            Stage::HardwareEnable => self.hardware_enable(),
            Stage::VectorTableInstall => self.install_vectors(),
            Stage::DataInit => {
                let image = &self.config.image;
                // SAFETY: `new` requires valid copy and zero tables.
                unsafe { data::run(image.copy_table, image.zero_table) };
            }
            Stage::RuntimeInit => {
                // SAFETY: data is initialised and `new` requires sound
                // constructors.
                unsafe { runtime::run(&self.config.image) };
            }
            Stage::BootstrapHook => {
                if let Some(hook) = self.config.hooks.on_bootstrap {
                    hook(&mut *self.cpu);
                }
            }
            Stage::ApplicationEntry => self.enter_application(),
            Stage::Halt => {}
        }

        self.next = next;
        Some(stage)
    }

    /// Run every stage up to `Halt` and return the application's exit code.
    ///
    /// The exit code is 0 if `main` never ran.
    pub fn run_to_halt(mut self) -> i32 {
        self.run_stages();
        self.exit_code.unwrap_or(0)
    }

    /// Run every stage, then halt the core.
    pub fn boot(mut self) -> ! {
        self.run_stages();
        halt(self.cpu, self.config.features.halt_breakpoint)
    }

    fn run_stages(&mut self) {
        while self.step().is_some() {}
    }

    // -- Stages

    fn stack_init(&mut self) {
        let cpu = &mut *self.cpu;
        let stacks = &self.config.stacks;

        if self.config.features.mask_interrupts_on_reset {
            registers::mask_interrupts(cpu);
            registers::modify_sctlr(
                cpu,
                SCTLR::M::CLEAR + SCTLR::C::CLEAR + SCTLR::I::CLEAR + SCTLR::Z::CLEAR + SCTLR::V::CLEAR,
            );
            cpu.isb();
        }

        if let Some(banked) = &stacks.banked {
            match registers::current_mode(cpu) {
                Ok(current) => {
                    for (mode, top) in ProcessorMode::BANKED.into_iter().zip(banked.tops()) {
                        // The current mode's stack was loaded by the reset stub.
                        if mode == current {
                            continue;
                        }
                        // SAFETY: `mode` is not the current mode, and `new`
                        // requires `top` to bound memory reserved for it.
                        unsafe { cpu.write_banked_sp(mode, top) };
                    }
                }
                Err(e) => log::warn!("banked stacks not set up: {}", e),
            }
        }

        if let Some(limit) = stacks.limit {
            cpu.write_stack_limit(limit);
        }

        if let Some(seal) = stacks.seal {
            let seal = seal as *mut u32;
            // SAFETY: `new` requires the seal address to be reserved,
            // 8-byte aligned memory for two words.
            unsafe {
                write_volatile(seal, STACK_SEAL);
                write_volatile(seal.add(1), STACK_SEAL);
            }
        }
    }

    fn hardware_enable(&mut self) {
        let cpu = &mut *self.cpu;
        let features = &self.config.features;

        if features.fpu {
            fpu::enable_fpu(cpu);
        }

        if features.icache || features.dcache {
            if features.arch >= ArchVersion::V7 {
                cache::invalidate_icache_all(cpu);
                if features.dcache {
                    cache::invalidate_dcache(cpu);
                }
            } else {
                cache::invalidate_all(cpu);
            }

            match (features.icache, features.dcache) {
                (true, true) => cache::enable_caches(cpu),
                (true, false) => cache::enable_icache(cpu),
                _ => cache::enable_dcache(cpu),
            }
            log::debug!("caches enabled: i={} d={}", features.icache, features.dcache);
        }

        if let Some(aux) = self.config.auxiliary_cache {
            aux.enable();
            cpu.dsb();
        }

        if features.branch_prediction {
            cache::invalidate_branch_predictor(cpu);
            cache::enable_branch_prediction(cpu);
        }
    }

    fn install_vectors(&mut self) {
        let cpu = &mut *self.cpu;
        let features = &self.config.features;

        match features.vector_base {
            VectorBase::Fixed => {}
            VectorBase::High => {
                registers::modify_sctlr(cpu, SCTLR::V::SET);
                cpu.isb();
            }
            VectorBase::Relocatable(base) => {
                cpu.write(Cp15Register::Vbar, base);
                cpu.isb();
                log::debug!("vector base {:#010x}", base);
            }
            VectorBase::Copy { table, remap } => {
                // SAFETY: `new` requires a valid vector copy entry.
                unsafe { data::copy_block(&table) };
                if let Some(remap) = remap {
                    // SAFETY: `new` requires a valid remap register.
                    unsafe { write_volatile(remap.register as *mut u32, remap.value) };
                }
                if features.dcache {
                    cache::clean_dcache_range(cpu, table.dest as u32, table.byte_len() as u32);
                }
                cpu.dsb();
                if features.icache {
                    cache::invalidate_icache_all(cpu);
                }
                cpu.isb();
            }
        }
    }

    fn enter_application(&mut self) {
        let app = &self.config.app;
        let code = (app.main)();
        self.exit_code = Some(code);
        log::info!("main returned {}", code);
        if let Some(exit) = app.exit {
            exit(code);
        }
    }
}

impl<C: Cpu> fmt::Debug for Sequencer<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("next", &self.next)
            .field("exit_code", &self.exit_code)
            .finish()
    }
}

// -- Halt

/// Work done on entering the halt state, before the idle loop.
fn enter_halt<C: Cpu + ?Sized>(cpu: &mut C, breakpoint: bool) {
    log::info!("halted");
    if breakpoint {
        cpu.breakpoint();
    }
}

/// Park the core for good: optionally trap to a debugger, then wait for
/// interrupt forever.
///
/// Exception handlers for traps taken before the runtime is up end here too.
pub fn halt<C: Cpu + ?Sized>(cpu: &mut C, breakpoint: bool) -> ! {
    enter_halt(cpu, breakpoint);
    loop {
        cpu.wait_for_interrupt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};

    use lark_arch::Cp15Op;
    use lark_arch::mock::{Event, MockCpu, RESET_CPSR};
    use lark_common::{CopyTableEntry, ZeroTableEntry};

    use crate::config::{
        Application, BankedStacks, CoreFeatures, Hooks, Image, Remap, StackLayout,
    };

    const SCTLR_I: u32 = 1 << 12;
    const SCTLR_C: u32 = 1 << 2;
    const RESET_MARKER: u32 = 0x5EED;

    fn main_returns_seven() -> i32 {
        7
    }

    fn config(features: CoreFeatures) -> BootConfig<'static, MockCpu> {
        BootConfig {
            features,
            stacks: StackLayout::NONE,
            image: Image::EMPTY,
            auxiliary_cache: None,
            hooks: Hooks::NONE,
            app: Application::new(main_returns_seven),
        }
    }

    fn mark_reset(cpu: &mut MockCpu) {
        cpu.write(Cp15Register::ContextId, RESET_MARKER);
    }

    #[test]
    fn test_no_hooks_reaches_application() {
        let config = config(CoreFeatures::new(ArchVersion::V6));
        let mut cpu = MockCpu::new(ArchVersion::V6);
        // SAFETY: empty image, no stacks.
        let sequencer = unsafe { Sequencer::new(&mut cpu, &config) };
        assert_eq!(sequencer.run_to_halt(), 7);
    }

    #[test]
    fn test_stages_strictly_ascending() {
        let config = config(CoreFeatures::new(ArchVersion::V7));
        let mut cpu = MockCpu::new(ArchVersion::V7);
        // SAFETY: empty image, no stacks.
        let mut sequencer = unsafe { Sequencer::new(&mut cpu, &config) };

        let mut completed = Vec::new();
        while let Some(stage) = sequencer.step() {
            completed.push(stage);
        }

        assert_eq!(completed.len(), 8);
        assert!(completed.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(completed.first(), Some(&Stage::StackInit));
        assert_eq!(completed.last(), Some(&Stage::ApplicationEntry));
        assert_eq!(sequencer.stage(), Stage::Halt);
        assert_eq!(sequencer.step(), None);
        assert_eq!(sequencer.exit_code(), Some(7));
    }

    #[test]
    fn test_reset_hook_runs_before_cache_enable() {
        let mut config = config(CoreFeatures::new(ArchVersion::V6).with_caches());
        config.hooks.on_reset = Some(mark_reset);
        let mut cpu = MockCpu::new(ArchVersion::V6);
        // SAFETY: empty image, no stacks.
        unsafe { Sequencer::new(&mut cpu, &config) }.run_to_halt();

        let hook = cpu.position(&Event::Write(Cp15Register::ContextId, RESET_MARKER)).unwrap();
        let invalidate = cpu.position(&Event::Op(Cp15Op::CacheInvalidateAll, 0)).unwrap();
        let enable = cpu
            .position_where(|e| matches!(e, Event::Write(Cp15Register::Sctlr, v) if v & SCTLR_I != 0))
            .unwrap();
        assert!(hook < invalidate);
        assert!(invalidate < enable);
        assert_eq!(cpu.register(Cp15Register::Sctlr) & (SCTLR_I | SCTLR_C), SCTLR_I | SCTLR_C);
    }

    #[test]
    fn test_bootstrap_hook_runs_after_runtime_init() {
        static SEEN_INIT: AtomicBool = AtomicBool::new(false);

        fn bootstrap(_: &mut MockCpu) {
            SEEN_INIT.store(runtime::is_initialised(), Ordering::Relaxed);
        }

        let mut config = config(CoreFeatures::new(ArchVersion::V5));
        config.hooks.on_bootstrap = Some(bootstrap);
        let mut cpu = MockCpu::new(ArchVersion::V5);
        // SAFETY: empty image, no stacks.
        unsafe { Sequencer::new(&mut cpu, &config) }.run_to_halt();
        assert!(SEEN_INIT.load(Ordering::Relaxed));
    }

    #[test]
    fn test_hardware_enable_v7_order() {
        let features = CoreFeatures::new(ArchVersion::V7)
            .with_fpu()
            .with_caches()
            .with_branch_prediction();
        let config = config(features);
        let mut cpu = MockCpu::new(ArchVersion::V7);
        // SAFETY: empty image, no stacks.
        unsafe { Sequencer::new(&mut cpu, &config) }.run_to_halt();

        let fpexc = cpu.position_where(|e| matches!(e, Event::Fpexc(_))).unwrap();
        let icache = cpu.position(&Event::Op(Cp15Op::IcacheInvalidateAll, 0)).unwrap();
        let dcache = cpu
            .position_where(|e| matches!(e, Event::Op(Cp15Op::DcacheInvalidateSetWay, _)))
            .unwrap();
        let predictor = cpu.position(&Event::Op(Cp15Op::BranchPredictorInvalidateAll, 0)).unwrap();
        assert!(fpexc < icache && icache < dcache && dcache < predictor);
        assert_eq!(cpu.count(&Event::Op(Cp15Op::CacheInvalidateAll, 0)), 0);

        // Each enable is followed directly by its ISB.
        let events = cpu.events();
        for (i, event) in events.iter().enumerate() {
            if let Event::Write(Cp15Register::Sctlr, _) = event {
                assert_eq!(events[i + 1], Event::Isb);
            }
        }
        assert_ne!(cpu.register(Cp15Register::Sctlr) & (1 << 11), 0);
    }

    #[test]
    fn test_v7_dcache_invalidated_before_enable() {
        // Cortex-A8: 32KB L1 D-cache, 4-way, 64-byte lines
        let config = config(CoreFeatures::new(ArchVersion::V7).with_caches());
        let mut cpu = MockCpu::new(ArchVersion::V7)
            .with_register(Cp15Register::CacheType, 0x8204_8004)
            .with_register(Cp15Register::Ccsidr, 0xE00F_E01A);
        // SAFETY: empty image, no stacks.
        unsafe { Sequencer::new(&mut cpu, &config) }.run_to_halt();

        assert_eq!(cpu.count(&Event::Write(Cp15Register::Csselr, 0)), 1);
        let selectors: Vec<u32> = cpu
            .events()
            .iter()
            .filter_map(|e| match *e {
                Event::Op(Cp15Op::DcacheInvalidateSetWay, sw) => Some(sw),
                _ => None,
            })
            .collect();
        assert_eq!(selectors.len(), 512);
        let distinct: std::collections::BTreeSet<u32> = selectors.iter().copied().collect();
        assert_eq!(distinct.len(), 512);

        let last_invalidate = cpu
            .events()
            .iter()
            .rposition(|e| matches!(e, Event::Op(Cp15Op::DcacheInvalidateSetWay, _)))
            .unwrap();
        let enable = cpu
            .position_where(|e| matches!(e, Event::Write(Cp15Register::Sctlr, v) if v & SCTLR_C != 0))
            .unwrap();
        assert!(last_invalidate < enable);
    }

    #[test]
    fn test_icache_only() {
        let mut features = CoreFeatures::new(ArchVersion::V7);
        features.icache = true;
        let config = config(features);
        let mut cpu = MockCpu::new(ArchVersion::V7);
        // SAFETY: empty image, no stacks.
        unsafe { Sequencer::new(&mut cpu, &config) }.run_to_halt();

        assert_eq!(cpu.position_where(|e| matches!(e, Event::Op(Cp15Op::DcacheInvalidateSetWay, _))), None);
        assert_eq!(cpu.register(Cp15Register::Sctlr) & (SCTLR_I | SCTLR_C), SCTLR_I);
    }

    #[test]
    fn test_absent_features_are_skipped() {
        let config = config(CoreFeatures::new(ArchVersion::V4));
        let mut cpu = MockCpu::new(ArchVersion::V4);
        // SAFETY: empty image, no stacks.
        unsafe { Sequencer::new(&mut cpu, &config) }.run_to_halt();
        assert!(cpu.events().is_empty());
    }

    #[test]
    fn test_banked_stacks_skip_current_mode() {
        let mut config = config(CoreFeatures::new(ArchVersion::V6));
        let mut seal = [0u32; 2];
        config.stacks = StackLayout {
            banked: Some(BankedStacks {
                top: 0x2000_8000,
                sizes: [0x100, 0x200, 0x400, 0x100, 0x100, 0x800],
            }),
            limit: Some(0x2000_0000),
            seal: Some(seal.as_mut_ptr() as usize),
        };
        let mut cpu = MockCpu::new(ArchVersion::V6).with_stack_limit();
        assert_eq!(cpu.cpsr(), RESET_CPSR);
        // SAFETY: the seal points at a local array; banked writes are mocked.
        unsafe { Sequencer::new(&mut cpu, &config) }.run_to_halt();

        assert_eq!(
            cpu.events(),
            &[
                Event::BankedSp(ProcessorMode::Fiq, 0x2000_8000),
                Event::BankedSp(ProcessorMode::Irq, 0x2000_7F00),
                Event::BankedSp(ProcessorMode::Abort, 0x2000_7900),
                Event::BankedSp(ProcessorMode::Undefined, 0x2000_7800),
                Event::BankedSp(ProcessorMode::System, 0x2000_7700),
                Event::StackLimit(0x2000_0000),
            ]
        );
        assert_eq!(seal, [STACK_SEAL, STACK_SEAL]);
    }

    #[test]
    fn test_reset_masking() {
        let config = config(CoreFeatures::new(ArchVersion::V7).with_reset_masking());
        let mut cpu = MockCpu::new(ArchVersion::V7)
            .with_cpsr(0x0000_0013)
            .with_register(Cp15Register::Sctlr, 0x0000_3805 | (1 << 11));
        // SAFETY: empty image, no stacks.
        let mut sequencer = unsafe { Sequencer::new(&mut cpu, &config) };
        assert_eq!(sequencer.step(), Some(Stage::StackInit));
        drop(sequencer);

        assert_eq!(cpu.cpsr(), 0x0000_00D3);
        assert_eq!(cpu.register(Cp15Register::Sctlr), 0x0000_0000);
        assert_eq!(cpu.events().last(), Some(&Event::Isb));
    }

    #[test]
    fn test_vector_base_variants() {
        let mut cpu = MockCpu::new(ArchVersion::V7);
        let high = config(CoreFeatures::new(ArchVersion::V7).with_vector_base(VectorBase::High));
        // SAFETY: empty image, no stacks.
        unsafe { Sequencer::new(&mut cpu, &high) }.run_to_halt();
        assert_ne!(cpu.register(Cp15Register::Sctlr) & (1 << 13), 0);

        let mut cpu = MockCpu::new(ArchVersion::V7);
        let relocated =
            config(CoreFeatures::new(ArchVersion::V7).with_vector_base(VectorBase::Relocatable(0x8000_0000)));
        // SAFETY: empty image, no stacks.
        unsafe { Sequencer::new(&mut cpu, &relocated) }.run_to_halt();
        assert_eq!(cpu.events(), &[Event::Write(Cp15Register::Vbar, 0x8000_0000), Event::Isb]);

        let mut cpu = MockCpu::new(ArchVersion::V7);
        let fixed = config(CoreFeatures::new(ArchVersion::V7));
        // SAFETY: empty image, no stacks.
        unsafe { Sequencer::new(&mut cpu, &fixed) }.run_to_halt();
        assert_eq!(cpu.register(Cp15Register::Vbar), 0);
    }

    #[test]
    fn test_vector_copy_with_remap() {
        let vectors: [u32; 8] = core::array::from_fn(|i| 0xE59F_F018 + i as u32);
        let mut low = [0u32; 8];
        let mut remap_register = 0u32;

        let features = CoreFeatures::new(ArchVersion::V5).with_caches().with_vector_base(VectorBase::Copy {
            table: CopyTableEntry::new(vectors.as_ptr(), low.as_mut_ptr(), 8),
            remap: Some(Remap {
                register: &raw mut remap_register as usize,
                value: 0x1,
            }),
        });
        let config = config(features);
        let mut cpu = MockCpu::new(ArchVersion::V5);
        // SAFETY: the copy entry and remap register are locals.
        let mut sequencer = unsafe { Sequencer::new(&mut cpu, &config) };
        while sequencer.stage() <= Stage::VectorTableInstall {
            sequencer.step();
        }
        drop(sequencer);

        assert_eq!(low, vectors);
        assert_eq!(remap_register, 0x1);

        let clean = cpu.position_where(|e| matches!(e, Event::Op(Cp15Op::DcacheCleanLine, _))).unwrap();
        let invalidate = cpu.events().iter().rposition(|e| *e == Event::Op(Cp15Op::IcacheInvalidateAll, 0));
        assert!(clean < invalidate.unwrap());
        assert_eq!(cpu.events().last(), Some(&Event::Isb));
    }

    #[test]
    fn test_data_and_application() {
        static EXIT_CODE: AtomicI32 = AtomicI32::new(-1);

        fn exit(code: i32) {
            EXIT_CODE.store(code, Ordering::Relaxed);
        }

        let source = [0x1111_1111u32, 0x2222_2222];
        let mut data = [0u32; 2];
        let mut bss = [0xFFFF_FFFFu32; 3];
        let copy = [CopyTableEntry::new(source.as_ptr(), data.as_mut_ptr(), 2)];
        let zero = [ZeroTableEntry::new(bss.as_mut_ptr(), 3)];

        let config = BootConfig {
            features: CoreFeatures::new(ArchVersion::V6),
            stacks: StackLayout::NONE,
            image: Image {
                copy_table: &copy,
                zero_table: &zero,
                ..Image::EMPTY
            },
            auxiliary_cache: None,
            hooks: Hooks::NONE,
            app: Application::new(main_returns_seven).with_exit(exit),
        };
        let mut cpu = MockCpu::new(ArchVersion::V6);
        // SAFETY: the tables describe local arrays.
        let code = unsafe { Sequencer::new(&mut cpu, &config) }.run_to_halt();

        assert_eq!(code, 7);
        assert_eq!(EXIT_CODE.load(Ordering::Relaxed), 7);
        assert_eq!(data, source);
        assert_eq!(bss, [0; 3]);
    }

    #[test]
    fn test_auxiliary_cache_enabled_with_barrier() {
        use crate::aux_cache::{AuxiliaryCache, MmioCacheControl};

        let mut control = 0u32;
        // SAFETY: `control` outlives the handle.
        let aux = unsafe { MmioCacheControl::new(&raw mut control as usize, 0x1) };
        let mut config = config(CoreFeatures::new(ArchVersion::V7));
        config.auxiliary_cache = Some(&aux);
        let mut cpu = MockCpu::new(ArchVersion::V7);
        // SAFETY: empty image, no stacks.
        unsafe { Sequencer::new(&mut cpu, &config) }.run_to_halt();

        assert!(aux.is_enabled());
        assert_eq!(cpu.events(), &[Event::Dsb]);
    }

    #[test]
    fn test_halt_entry() {
        let mut cpu = MockCpu::new(ArchVersion::V7);
        enter_halt(&mut cpu, true);
        assert_eq!(cpu.events(), &[Event::Breakpoint]);

        let mut cpu = MockCpu::new(ArchVersion::V7);
        enter_halt(&mut cpu, false);
        assert!(cpu.events().is_empty());
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::VectorTableInstall.to_string(), "vector table install");
        assert_eq!(Stage::Halt.next(), None);
    }
}
