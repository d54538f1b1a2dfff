//! Reset Entry
//!
//! The reset vector branches to `_lark_reset`, which loads the stack pointer
//! from the linker symbol `__StackTop` and jumps to `_lark_start`. The board
//! crate defines `_lark_start` with [`entry!`](crate::entry), naming a
//! function that returns its [`BootConfig`].
//!
//! ```ignore
//! fn config() -> BootConfig<'static, Cp15Core> { ... }
//!
//! lark_boot::entry!(config);
//! ```

use core::arch::naked_asm;

use lark_arch::hardware::Cp15Core;

use crate::config::BootConfig;
use crate::sequencer::{Sequencer, halt};

/// First instruction after reset: load SP and enter Rust.
///
/// # Safety
///
/// Only the reset vector may branch here.
#[unsafe(naked)]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _lark_reset() -> ! {
    naked_asm!("ldr sp, =__StackTop", "b _lark_start")
}

/// Boot the core described by `config`. Never returns.
///
/// An invalid configuration halts before any stage runs.
///
/// # Safety
///
/// As [`Sequencer::new`]. Must be called once, from `_lark_start`.
pub unsafe fn start(config: &BootConfig<'_, Cp15Core>) -> ! {
    // SAFETY: this is the only handle; `arch` comes from the board config.
    let mut cpu = unsafe { Cp15Core::new(config.features.arch) };

    if let Err(err) = config.validate() {
        log::error!("invalid boot configuration: {}", err);
        halt(&mut cpu, true);
    }

    // SAFETY: forwarded from the caller.
    unsafe { Sequencer::new(&mut cpu, config) }.boot()
}

/// Define `_lark_start`, booting with the configuration returned by `$config`.
#[macro_export]
macro_rules! entry {
    ($config:path) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _lark_start() -> ! {
            let config: $crate::config::BootConfig<'static, $crate::Cp15Core> = $config();
            // SAFETY: called once, from the reset stub.
            unsafe { $crate::entry::start(&config) }
        }
    };
}

#[cfg(feature = "panic-halt")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    log::error!("panic: {}", info);
    // SAFETY: the panicking code never resumes, so this is the only live
    // handle. BKPT and WFI do not depend on the architecture level.
    let mut cpu = unsafe { Cp15Core::new(lark_arch::ArchVersion::V4) };
    halt(&mut cpu, cfg!(debug_assertions))
}
