//! Early-boot memory for the hartpal platform layer.
//!
//! - [`arena`]: caller-owned bump allocator over a fixed address range.
//! - [`heap`]: the process-wide platform heap built on one [`Arena`].
//! - [`mm_constants`]: compiled-in platform memory layout.

#![cfg_attr(not(test), no_std)]

pub mod arena;
pub mod error;
pub mod heap;
pub mod mm_constants;

pub use arena::{Arena, ArenaRegion};
pub use error::{ArenaError, ArenaResult};
