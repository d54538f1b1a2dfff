//! Boot Configuration
//!
//! Everything the sequencer branches on is fixed in one [`BootConfig`], built
//! by the board crate. Feature presence is decided there once; no stage probes
//! hardware to find out what to do.
//!
//! ```ignore
//! const FEATURES: CoreFeatures = CoreFeatures::new(ArchVersion::V7).with_caches().with_fpu();
//! const _: () = assert!(FEATURES.validate().is_ok());
//!
//! fn config() -> BootConfig<'static, Cp15Core> {
//!     BootConfig {
//!         features: FEATURES,
//!         stacks: StackLayout::NONE,
//!         image: unsafe { Image::from_linker() },
//!         auxiliary_cache: None,
//!         hooks: Hooks::NONE,
//!         app: Application::new(main),
//!     }
//! }
//! ```

use core::fmt;

use lark_arch::ArchVersion;
use lark_common::{CopyTableEntry, InitEntry, InitFn, ZeroTableEntry};

use crate::aux_cache::AuxiliaryCache;

/// Stack alignment required by the procedure call standard.
pub const STACK_ALIGN: u32 = 8;

/// Alignment of a relocated vector table (VBAR bits [4:0] are reserved).
pub const VECTOR_ALIGN: u32 = 32;

// -- Errors

/// A configuration the target cannot boot with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// FPU requested on an architecture level without a VFP coprocessor
    FpuWithoutArchSupport,
    /// Branch prediction requested on ARMv4
    BranchPredictionUnsupported,
    /// Relocatable vector base requested before ARMv7
    VectorBaseUnsupported,
    /// Relocated vector table not 32-byte aligned
    UnalignedVectorBase(u32),
    /// Stack top, size or seal not 8-byte aligned
    UnalignedStack(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FpuWithoutArchSupport => write!(f, "FPU requested but architecture has no VFP"),
            ConfigError::BranchPredictionUnsupported => {
                write!(f, "branch prediction requested on ARMv4")
            }
            ConfigError::VectorBaseUnsupported => write!(f, "relocatable vector base requires ARMv7"),
            ConfigError::UnalignedVectorBase(addr) => {
                write!(f, "vector table {:#x} is not 32-byte aligned", addr)
            }
            ConfigError::UnalignedStack(addr) => write!(f, "stack value {:#x} is not 8-byte aligned", addr),
        }
    }
}

// -- Core features

/// Where the exception vectors live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorBase {
    /// Leave the vector address alone (0x0000_0000 at reset)
    Fixed,
    /// Use the high vectors at 0xFFFF_0000 (SCTLR.V)
    High,
    /// Point VBAR at a table anywhere in memory (ARMv7)
    Relocatable(u32),
    /// Copy the table from its load address to the fixed vector address,
    /// optionally followed by a bus-matrix remap write
    Copy {
        table: CopyTableEntry,
        remap: Option<Remap>,
    },
}

/// One memory-mapped register write that remaps the vector address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remap {
    pub register: usize,
    pub value: u32,
}

/// Hardware features to bring up, resolved at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreFeatures {
    pub arch: ArchVersion,
    /// Mask IRQ/FIQ and clear SCTLR.M/C/I/Z/V before anything else
    pub mask_interrupts_on_reset: bool,
    pub fpu: bool,
    pub icache: bool,
    pub dcache: bool,
    pub branch_prediction: bool,
    pub vector_base: VectorBase,
    /// Break into an attached debugger before halting
    pub halt_breakpoint: bool,
}

impl CoreFeatures {
    /// Nothing enabled, vectors left in place.
    #[must_use]
    pub const fn new(arch: ArchVersion) -> Self {
        Self {
            arch,
            mask_interrupts_on_reset: false,
            fpu: false,
            icache: false,
            dcache: false,
            branch_prediction: false,
            vector_base: VectorBase::Fixed,
            halt_breakpoint: cfg!(debug_assertions),
        }
    }

    #[must_use]
    pub const fn with_fpu(mut self) -> Self {
        self.fpu = true;
        self
    }

    /// Both L1 caches.
    #[must_use]
    pub const fn with_caches(mut self) -> Self {
        self.icache = true;
        self.dcache = true;
        self
    }

    #[must_use]
    pub const fn with_branch_prediction(mut self) -> Self {
        self.branch_prediction = true;
        self
    }

    #[must_use]
    pub const fn with_vector_base(mut self, vector_base: VectorBase) -> Self {
        self.vector_base = vector_base;
        self
    }

    #[must_use]
    pub const fn with_reset_masking(mut self) -> Self {
        self.mask_interrupts_on_reset = true;
        self
    }

    /// Check the features against the architecture level.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.fpu && !self.arch.supports_vfp() {
            return Err(ConfigError::FpuWithoutArchSupport);
        }
        if self.branch_prediction && !self.arch.supports_branch_prediction() {
            return Err(ConfigError::BranchPredictionUnsupported);
        }
        if let VectorBase::Relocatable(addr) = self.vector_base {
            if !matches!(self.arch, ArchVersion::V7) {
                return Err(ConfigError::VectorBaseUnsupported);
            }
            if addr % VECTOR_ALIGN != 0 {
                return Err(ConfigError::UnalignedVectorBase(addr));
            }
        }
        Ok(())
    }
}

// -- Stacks

/// Per-mode stacks carved downward from one top address.
///
/// Sizes are in bytes, in [`ProcessorMode::BANKED`](lark_arch::ProcessorMode::BANKED)
/// order: FIQ, IRQ, Supervisor, Abort, Undefined, System.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankedStacks {
    pub top: u32,
    pub sizes: [u32; 6],
}

impl BankedStacks {
    /// Top of each mode's stack, in the order of `sizes`.
    #[must_use]
    pub const fn tops(&self) -> [u32; 6] {
        let mut tops = [0; 6];
        let mut top = self.top;
        let mut i = 0;
        while i < tops.len() {
            tops[i] = top;
            top = top.wrapping_sub(self.sizes[i]);
            i += 1;
        }
        tops
    }
}

/// Stack setup done before any other stage.
///
/// The active stack pointer is loaded by the reset stub, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackLayout {
    /// Stacks for the modes other than the one the sequencer runs in
    pub banked: Option<BankedStacks>,
    /// Lowest valid stack address, for cores with a hardware limit
    pub limit: Option<u32>,
    /// Address of the two-word stack seal
    pub seal: Option<usize>,
}

impl StackLayout {
    pub const NONE: Self = Self {
        banked: None,
        limit: None,
        seal: None,
    };

    pub const fn validate(&self) -> Result<(), ConfigError> {
        if let Some(banked) = &self.banked {
            if banked.top % STACK_ALIGN != 0 {
                return Err(ConfigError::UnalignedStack(banked.top));
            }
            let mut i = 0;
            while i < banked.sizes.len() {
                if banked.sizes[i] % STACK_ALIGN != 0 {
                    return Err(ConfigError::UnalignedStack(banked.sizes[i]));
                }
                i += 1;
            }
        }
        if let Some(seal) = self.seal {
            if seal % STACK_ALIGN as usize != 0 {
                return Err(ConfigError::UnalignedStack(seal as u32));
            }
        }
        Ok(())
    }
}

// -- Image

/// Link-time tables describing the program image.
#[derive(Debug, Clone, Copy)]
pub struct Image<'a> {
    pub copy_table: &'a [CopyTableEntry],
    pub zero_table: &'a [ZeroTableEntry],
    pub preinit_array: &'a [InitEntry],
    /// `_init` from the toolchain's crti, called between the two arrays
    pub init: Option<InitFn>,
    pub init_array: &'a [InitEntry],
}

impl Image<'_> {
    /// No data to initialise and no constructors.
    pub const EMPTY: Image<'static> = Image {
        copy_table: &[],
        zero_table: &[],
        preinit_array: &[],
        init: None,
        init_array: &[],
    };
}

#[cfg(target_arch = "arm")]
impl Image<'static> {
    /// Image described by the conventional linker script symbols.
    ///
    /// # Safety
    ///
    /// The linker script must define every start/end pair, each pair must
    /// bound an array of the matching record type, and nothing may write to
    /// the tables while the returned image is alive.
    #[must_use]
    pub unsafe fn from_linker() -> Self {
        unsafe extern "C" {
            static __copy_table_start__: CopyTableEntry;
            static __copy_table_end__: CopyTableEntry;
            static __zero_table_start__: ZeroTableEntry;
            static __zero_table_end__: ZeroTableEntry;
            static __preinit_array_start: InitEntry;
            static __preinit_array_end: InitEntry;
            static __init_array_start: InitEntry;
            static __init_array_end: InitEntry;
        }

        // SAFETY: the caller guarantees each pair bounds an array of `T`.
        unsafe fn table<T>(start: *const T, end: *const T) -> &'static [T] {
            unsafe { core::slice::from_raw_parts(start, end.offset_from(start) as usize) }
        }

        // SAFETY: forwarded from the caller.
        unsafe {
            Image {
                copy_table: table(&raw const __copy_table_start__, &raw const __copy_table_end__),
                zero_table: table(&raw const __zero_table_start__, &raw const __zero_table_end__),
                preinit_array: table(&raw const __preinit_array_start, &raw const __preinit_array_end),
                init: None,
                init_array: table(&raw const __init_array_start, &raw const __init_array_end),
            }
        }
    }
}

// -- Hooks and application

/// Optional callbacks around the boot sequence.
pub struct Hooks<C> {
    /// After stacks are set up, before any hardware is enabled
    pub on_reset: Option<fn(&mut C)>,
    /// After static initialisation, right before `main`
    pub on_bootstrap: Option<fn(&mut C)>,
}

impl<C> Hooks<C> {
    pub const NONE: Self = Self {
        on_reset: None,
        on_bootstrap: None,
    };
}

impl<C> Clone for Hooks<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Hooks<C> {}

impl<C> fmt::Debug for Hooks<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_reset", &self.on_reset.is_some())
            .field("on_bootstrap", &self.on_bootstrap.is_some())
            .finish()
    }
}

/// The program to run once the runtime is initialised.
#[derive(Debug, Clone, Copy)]
pub struct Application {
    pub main: fn() -> i32,
    /// Receives the exit code of `main`; if absent or if it returns, the core
    /// halts
    pub exit: Option<fn(i32)>,
}

impl Application {
    #[must_use]
    pub const fn new(main: fn() -> i32) -> Self {
        Self { main, exit: None }
    }

    #[must_use]
    pub const fn with_exit(mut self, exit: fn(i32)) -> Self {
        self.exit = Some(exit);
        self
    }
}

// -- Descriptor

/// Complete static description of one boot.
pub struct BootConfig<'a, C> {
    pub features: CoreFeatures,
    pub stacks: StackLayout,
    pub image: Image<'a>,
    pub auxiliary_cache: Option<&'a (dyn AuxiliaryCache + Sync)>,
    pub hooks: Hooks<C>,
    pub app: Application,
}

impl<C> BootConfig<'_, C> {
    /// Check features and stack layout together.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        match self.features.validate() {
            Ok(()) => self.stacks.validate(),
            Err(e) => Err(e),
        }
    }
}
