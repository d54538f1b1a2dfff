//! Static Constructor Arrays
//!
//! `.preinit_array` and `.init_array` hold pointers to functions the runtime
//! must call before `main`. Toolchains pad these arrays with `0` and `-1`
//! sentinels, so slots are kept as raw words and only turned into function
//! pointers once checked.

/// Signature of a static constructor.
pub type InitFn = unsafe extern "C" fn();

/// One slot of a preinit/init array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct InitEntry(usize);

impl InitEntry {
    /// Empty slot, as emitted by some toolchains for padding.
    pub const NULL: Self = Self(0);

    /// Terminator slot (`-1`).
    pub const TERMINATOR: Self = Self(usize::MAX);

    /// Wrap a constructor.
    #[inline]
    #[must_use]
    pub fn new(f: InitFn) -> Self {
        Self(f as usize)
    }

    /// Raw slot value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> usize {
        self.0
    }

    /// The constructor in this slot, or `None` for a sentinel.
    #[inline]
    #[must_use]
    pub fn function(self) -> Option<InitFn> {
        match self.0 {
            0 | usize::MAX => None,
            // SAFETY: Non-sentinel slots are only ever produced from a function
            // pointer, either by `new` or by the linker collecting
            // `.init_array` sections.
            raw => Some(unsafe { core::mem::transmute::<usize, InitFn>(raw) }),
        }
    }
}
