//! Auxiliary Cache Controllers
//!
//! Caches outside the core (an L2 controller, a flash cache controller) are
//! enabled through memory-mapped registers rather than CP15. The sequencer
//! only needs to switch them on, so the seam is a single trait.

use core::ptr::{read_volatile, write_volatile};

/// A cache controller outside the processor core.
pub trait AuxiliaryCache {
    /// Switch the cache on.
    fn enable(&self);

    /// Check if the cache is on.
    fn is_enabled(&self) -> bool;
}

/// Controller enabled by setting bits in one memory-mapped control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmioCacheControl {
    control: usize,
    enable_mask: u32,
}

impl MmioCacheControl {
    /// Create a controller handle.
    ///
    /// # Safety
    ///
    /// `control` must be the address of a mapped, device-memory control
    /// register, and setting `enable_mask` in it must only enable the cache.
    #[inline]
    #[must_use]
    pub const unsafe fn new(control: usize, enable_mask: u32) -> Self {
        Self { control, enable_mask }
    }

    #[inline]
    #[must_use]
    pub const fn control(&self) -> usize {
        self.control
    }
}

impl AuxiliaryCache for MmioCacheControl {
    fn enable(&self) {
        let reg = self.control as *mut u32;
        // SAFETY: `new` requires `control` to be a valid control register.
        unsafe {
            let value = read_volatile(reg);
            write_volatile(reg, value | self.enable_mask);
        }
        log::debug!("auxiliary cache at {:#x} enabled", self.control);
    }

    fn is_enabled(&self) -> bool {
        // SAFETY: `new` requires `control` to be a valid control register.
        let value = unsafe { read_volatile(self.control as *const u32) };
        value & self.enable_mask == self.enable_mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_sets_mask_only() {
        let mut register: u32 = 0x0000_0100;
        // SAFETY: `register` outlives the handle.
        let cache = unsafe { MmioCacheControl::new(&raw mut register as usize, 0x1) };
        assert!(!cache.is_enabled());
        cache.enable();
        assert!(cache.is_enabled());
        assert_eq!(unsafe { read_volatile(&raw const register) }, 0x0000_0101);
    }
}
