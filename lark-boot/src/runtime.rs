//! Runtime initialisation
//!
//! Runs the image's static constructors: every `.preinit_array` entry, then
//! `_init`, then every `.init_array` entry, each in link order. Null and `-1`
//! padding slots are skipped.

use core::sync::atomic::{AtomicBool, Ordering};

use lark_common::InitEntry;

use crate::config::Image;

/// Whether the constructors have run.
static RUNTIME_INITIALISED: AtomicBool = AtomicBool::new(false);

/// Check if the runtime has been initialised.
#[inline]
pub fn is_initialised() -> bool {
    RUNTIME_INITIALISED.load(Ordering::Acquire)
}

/// Call every constructor in `entries`, in order.
///
/// # Safety
///
/// Every non-sentinel slot must hold a function that is sound to call now.
pub unsafe fn call_array(entries: &[InitEntry]) -> usize {
    let mut called = 0;
    for f in entries.iter().filter_map(|entry| entry.function()) {
        // SAFETY: forwarded from the caller.
        unsafe { f() };
        called += 1;
    }
    called
}

/// Run the image's constructors.
///
/// # Safety
///
/// Static data must already be initialised, and every constructor must be
/// sound to call in this environment.
pub unsafe fn run(image: &Image<'_>) {
    // SAFETY: forwarded from the caller.
    let preinit = unsafe { call_array(image.preinit_array) };
    if let Some(init) = image.init {
        // SAFETY: forwarded from the caller.
        unsafe { init() };
    }
    // SAFETY: forwarded from the caller.
    let init = unsafe { call_array(image.init_array) };

    RUNTIME_INITIALISED.store(true, Ordering::Release);
    log::trace!("constructors run: {} preinit, {} init", preinit, init);
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicU32;

    // Each recorder shifts its id into TRACE, so the final value spells out
    // the call order.
    static TRACE: AtomicU32 = AtomicU32::new(0);

    fn record(id: u32) {
        let prev = TRACE.load(Ordering::Relaxed);
        TRACE.store(prev << 4 | id, Ordering::Relaxed);
    }

    unsafe extern "C" fn preinit_a() {
        record(1);
    }
    unsafe extern "C" fn preinit_b() {
        record(2);
    }
    unsafe extern "C" fn init_hook() {
        record(3);
    }
    unsafe extern "C" fn ctor_a() {
        record(4);
    }
    unsafe extern "C" fn ctor_b() {
        record(5);
    }

    #[test]
    fn test_constructor_order_and_sentinels() {
        let preinit = [InitEntry::new(preinit_a), InitEntry::NULL, InitEntry::new(preinit_b)];
        let init_array = [
            InitEntry::TERMINATOR,
            InitEntry::new(ctor_a),
            InitEntry::new(ctor_b),
            InitEntry::NULL,
        ];
        let image = Image {
            preinit_array: &preinit,
            init: Some(init_hook),
            init_array: &init_array,
            ..Image::EMPTY
        };

        TRACE.store(0, Ordering::Relaxed);
        // SAFETY: the recorders only touch an atomic.
        unsafe { run(&image) };

        assert_eq!(TRACE.load(Ordering::Relaxed), 0x12345);
        assert!(is_initialised());
    }

    #[test]
    fn test_call_array_counts_functions() {
        let entries = [InitEntry::NULL, InitEntry::TERMINATOR];
        // SAFETY: only sentinels.
        assert_eq!(unsafe { call_array(&entries) }, 0);
        // SAFETY: empty.
        assert_eq!(unsafe { call_array(&[]) }, 0);
    }
}
