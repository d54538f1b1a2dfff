//! # lark-arch
//!
//! AArch32 architecture support for the lark bring-up crates.
//!
//! Provides the processor-facing half of reset handling:
//! - [`cpu`]: the [`Cpu`] hardware handle every other operation goes through
//! - [`cp15`]: CP15 register and maintenance operation encodings
//! - [`registers`]: bit layouts of CPSR, SCTLR, CPACR, the fault status
//!   registers and the cache identification registers
//! - [`cache`]: cache geometry decoding and set/way, line and range maintenance
//! - [`mmu`]: translation table base, domain access and TLB control
//! - [`fpu`]: VFP enable
//!
//! On `target_arch = "arm"` the `hardware` module provides `Cp15Core`, the
//! implementation of [`Cpu`] that issues real instructions. The `mock` feature
//! provides `MockCpu`, a recording implementation for host tests.
//!
//! # Safety
//!
//! Inline assembly is confined to the `hardware` module. All unsafe operations
//! are documented with `// SAFETY:` comments explaining the invariants that
//! must be maintained.
//!
//! # Example
//!
//! ```ignore
//! use lark_arch::{cache, Cpu};
//!
//! fn flush_before_dma<C: Cpu>(cpu: &mut C, buf: &[u8]) {
//!     cache::clean_dcache_range(cpu, buf.as_ptr() as u32, buf.len() as u32);
//!     cpu.dsb();
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod cache;
pub mod cp15;
pub mod cpu;
pub mod fpu;
#[cfg(target_arch = "arm")]
pub mod hardware;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod mmu;
pub mod registers;

pub use cache::CacheGeometry;
pub use cp15::{Cp15Op, Cp15Register};
pub use cpu::{ArchVersion, Cpu};
pub use mmu::Mmu;
pub use registers::ProcessorMode;
