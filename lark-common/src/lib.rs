//! # lark-common
//!
//! Link-time ABI shared by the lark bring-up crates.
//!
//! This crate defines the records the linker script lays out for the boot
//! sequencer to consume:
//! - [`CopyTableEntry`](layout::CopyTableEntry): one initialised-data block to copy
//! - [`ZeroTableEntry`](layout::ZeroTableEntry): one zero-initialised block to clear
//! - [`LinkerRange`](layout::LinkerRange): a `start..end` word range bounded by two symbols
//! - [`InitEntry`](init::InitEntry): one slot of a preinit/init array
//!
//! All records use `#[repr(C)]` so their layout matches what the linker emits.
//!
//! # no_std
//!
//! This crate is `#![no_std]` and has zero dependencies, making it suitable
//! as a foundation crate that all other lark crates can depend on.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod init;
pub mod layout;

// Re-export commonly used types
pub use init::{InitEntry, InitFn};
pub use layout::{CopyTableEntry, LayoutError, LinkerRange, ZeroTableEntry};

/// Size of the word unit used by every linker table.
pub const WORD_SIZE: usize = core::mem::size_of::<u32>();
