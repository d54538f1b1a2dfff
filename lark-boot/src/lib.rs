//! # lark-boot
//!
//! Reset-to-`main` bring-up for a single bare-metal ARM core.
//!
//! - [`config`]: the static [`BootConfig`] a board crate fills in
//! - [`sequencer`]: the one-shot [`Sequencer`] state machine and [`halt`]
//! - [`data`]: copy/zero table processing for static storage
//! - [`runtime`]: preinit/init constructor arrays
//! - [`aux_cache`]: caches enabled through memory-mapped registers
//! - [`logging`]: a `log` backend writing to a board-provided sink
//!
//! On `target_arch = "arm"`, `entry` provides the reset stub and the
//! [`entry!`] macro that ties a board's configuration to it.
//!
//! # Safety
//!
//! Bring-up writes memory the compiler knows nothing about: stacks, linker
//! tables, vector copies. Everything that does so is reached through
//! [`Sequencer::new`], whose safety contract covers the whole configuration.
//!
//! # Example
//!
//! ```ignore
//! const FEATURES: CoreFeatures = CoreFeatures::new(ArchVersion::V6).with_caches().with_fpu();
//! const _: () = assert!(FEATURES.validate().is_ok());
//!
//! fn config() -> BootConfig<'static, Cp15Core> {
//!     BootConfig {
//!         features: FEATURES,
//!         stacks: StackLayout::NONE,
//!         image: unsafe { Image::from_linker() },
//!         auxiliary_cache: None,
//!         hooks: Hooks { on_reset: Some(console_init), on_bootstrap: None },
//!         app: Application::new(main),
//!     }
//! }
//!
//! lark_boot::entry!(config);
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod aux_cache;
pub mod config;
pub mod data;
#[cfg(target_arch = "arm")]
pub mod entry;
pub mod logging;
pub mod runtime;
pub mod sequencer;

pub use aux_cache::{AuxiliaryCache, MmioCacheControl};
pub use config::{
    Application, BankedStacks, BootConfig, ConfigError, CoreFeatures, Hooks, Image, StackLayout,
    VectorBase,
};
#[cfg(target_arch = "arm")]
pub use lark_arch::hardware::Cp15Core;
pub use sequencer::{Sequencer, Stage, halt};
