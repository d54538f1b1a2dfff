//! Static Data Layout
//!
//! Describes where initialised and zero-initialised static data lives, as
//! produced by the link step. The linker script emits two tables:
//!
//! ```text
//! __copy_table_start__:            __zero_table_start__:
//!     .long LOADADDR(.data)            .long ADDR(.bss)
//!     .long ADDR(.data)                .long SIZEOF(.bss) / 4
//!     .long SIZEOF(.data) / 4      __zero_table_end__:
//! __copy_table_end__:
//! ```
//!
//! Images linked without tables only provide symbol pairs such as
//! `__bss_start`/`__bss_end`; those are wrapped in a [`LinkerRange`].

use core::fmt;

use crate::WORD_SIZE;

/// One block of initialised data to copy from its load address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct CopyTableEntry {
    /// Load address (usually in flash)
    pub src: *const u32,
    /// Run address (in RAM)
    pub dest: *mut u32,
    /// Length in 32-bit words
    pub wlen: u32,
}

impl CopyTableEntry {
    /// Create a copy table entry.
    #[inline]
    #[must_use]
    pub const fn new(src: *const u32, dest: *mut u32, wlen: u32) -> Self {
        Self { src, dest, wlen }
    }

    /// Number of bytes this entry copies.
    #[inline]
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.wlen as usize * WORD_SIZE
    }
}

/// One block of zero-initialised data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ZeroTableEntry {
    /// Run address (in RAM)
    pub dest: *mut u32,
    /// Length in 32-bit words
    pub wlen: u32,
}

impl ZeroTableEntry {
    /// Create a zero table entry.
    #[inline]
    #[must_use]
    pub const fn new(dest: *mut u32, wlen: u32) -> Self {
        Self { dest, wlen }
    }

    /// Number of bytes this entry clears.
    #[inline]
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.wlen as usize * WORD_SIZE
    }
}

// SAFETY: Table entries are plain addresses emitted by the linker. They are
// read-only once linked and only dereferenced by the data initialiser, which
// runs single-threaded before any other code.
unsafe impl Sync for CopyTableEntry {}
// SAFETY: See `CopyTableEntry`.
unsafe impl Sync for ZeroTableEntry {}

/// Errors from validating a linker-provided range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    /// A bound is not aligned to a 32-bit word
    Misaligned(usize),
    /// The end symbol lies before the start symbol
    Inverted { start: usize, end: usize },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Misaligned(addr) => {
                write!(f, "linker symbol {:#x} is not word aligned", addr)
            }
            LayoutError::Inverted { start, end } => {
                write!(f, "linker range end {:#x} precedes start {:#x}", end, start)
            }
        }
    }
}

/// A word-aligned `start..end` range bounded by two linker symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkerRange {
    start: usize,
    end: usize,
}

impl LinkerRange {
    /// Validate a range from the addresses of its bounding symbols.
    pub const fn new(start: usize, end: usize) -> Result<Self, LayoutError> {
        if start % WORD_SIZE != 0 {
            return Err(LayoutError::Misaligned(start));
        }
        if end % WORD_SIZE != 0 {
            return Err(LayoutError::Misaligned(end));
        }
        if end < start {
            return Err(LayoutError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range covering `words` words from `start`.
    pub const fn from_words(start: usize, words: usize) -> Result<Self, LayoutError> {
        Self::new(start, start + words * WORD_SIZE)
    }

    /// First address of the range.
    #[inline]
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// One past the last address of the range.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Length in 32-bit words.
    #[inline]
    #[must_use]
    pub const fn words(&self) -> usize {
        (self.end - self.start) / WORD_SIZE
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Zero table entry clearing this range.
    #[inline]
    #[must_use]
    pub const fn as_zero_entry(&self) -> ZeroTableEntry {
        ZeroTableEntry::new(self.start as *mut u32, self.words() as u32)
    }

    /// Copy table entry filling this range from `source`.
    #[inline]
    #[must_use]
    pub const fn as_copy_entry(&self, source: usize) -> CopyTableEntry {
        CopyTableEntry::new(source as *const u32, self.start as *mut u32, self.words() as u32)
    }
}
