//! Bump-pointer arena over a fixed address range.
//!
//! The arena hands out addresses; it never reads or writes the memory behind
//! them. Whoever stores data at a returned address is responsible for the
//! range being real, writable memory.
//!
//! # Allocation policy
//!
//! Allocation is single-pass and run-scoped. The cursor only moves forward,
//! and [`Arena::release`] is a no-op: space handed out is never reclaimed,
//! and no address is ever returned twice. Each request consumes its size,
//! `alignment - 1` bytes of slack and the padding needed to align the cursor.
//!
//! # Concurrency
//!
//! An `Arena` is a single mutable cursor with no internal synchronisation.
//! It is meant for the one execution context that performs platform setup;
//! sharing it between contexts is outside its contract.

use hartpal_lib::config::PalConfig;
use hartpal_lib::{align_up, klog_debug, klog_warn};

use crate::error::{ArenaError, ArenaResult};
use crate::mm_constants::{PLATFORM_HEAP_REGION_BASE, PLATFORM_HEAP_REGION_SIZE};

/// An address range `[base, base + size)` handed to an arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaRegion {
    pub base: usize,
    pub size: usize,
}

impl ArenaRegion {
    /// The compiled-in platform heap region.
    pub const PLATFORM_DEFAULT: Self = Self::new(PLATFORM_HEAP_REGION_BASE, PLATFORM_HEAP_REGION_SIZE);

    pub const fn new(base: usize, size: usize) -> Self {
        Self { base, size }
    }

    /// The platform default, with any command-line overrides applied.
    pub fn from_config(config: &PalConfig) -> Self {
        let mut region = Self::PLATFORM_DEFAULT;
        if let Some(base) = config.heap_base {
            region.base = base as usize;
        }
        if let Some(size) = config.heap_size {
            region.size = size as usize;
        }
        region
    }

    /// Exclusive end of the range, or `None` if it wraps.
    #[inline]
    pub const fn end(&self) -> Option<usize> {
        self.base.checked_add(self.size)
    }
}

/// Monotonic allocator state.
#[derive(Debug)]
pub struct Arena {
    /// Next free address.
    base: usize,
    /// Exclusive upper bound.
    top: usize,
    initialized: bool,
    /// Range adopted by the first allocation if `init` was never called.
    fallback: ArenaRegion,
}

impl Arena {
    /// Create an arena with no range yet.
    ///
    /// The first call to [`allocate`](Self::allocate) adopts `fallback` unless
    /// [`init`](Self::init) ran before it.
    pub const fn new(fallback: ArenaRegion) -> Self {
        Self {
            base: 0,
            top: 0,
            initialized: false,
            fallback,
        }
    }

    /// Set the working range.
    ///
    /// An arena is initialised once, either here or implicitly on first
    /// allocation. A second call is rejected and leaves the cursor untouched.
    pub fn init(&mut self, base: usize, size: usize) -> ArenaResult {
        if self.initialized {
            klog_warn!(
                "ARENA: ignoring re-init to {:#x}+{:#x}, cursor at {:#x}",
                base,
                size,
                self.base
            );
            return Err(ArenaError::AlreadyInitialized);
        }
        let Some(top) = ArenaRegion::new(base, size).end() else {
            klog_warn!("ARENA: region {:#x}+{:#x} wraps", base, size);
            return Err(ArenaError::RegionOverflow { base, size });
        };
        self.base = base;
        self.top = top;
        self.initialized = true;
        klog_debug!("ARENA: range {:#x}-{:#x}", base, top);
        Ok(())
    }

    /// Hand out `size` bytes at an address that is a multiple of `alignment`.
    ///
    /// `alignment` must be a power of two and `size` non-zero. On failure the
    /// cursor does not move.
    pub fn allocate(&mut self, alignment: usize, size: usize) -> ArenaResult<usize> {
        if size == 0 || !alignment.is_power_of_two() {
            klog_debug!(
                "ARENA: rejecting request align={:#x} size={:#x}",
                alignment,
                size
            );
            return Err(ArenaError::InvalidArgument);
        }

        if !self.initialized {
            let fallback = self.fallback;
            self.init(fallback.base, fallback.size)?;
        }

        let remaining = self.remaining();
        let out_of_space = ArenaError::OutOfSpace {
            requested: size,
            remaining,
        };

        let addr = align_up(self.base, alignment);
        if addr < self.base {
            return Err(out_of_space);
        }
        let consumed = size
            .checked_add(alignment - 1)
            .and_then(|padded| padded.checked_add(addr - self.base))
            .ok_or(out_of_space)?;
        if consumed > remaining {
            klog_debug!(
                "ARENA: {:#x} bytes (align {:#x}) do not fit in {:#x}",
                size,
                alignment,
                remaining
            );
            return Err(out_of_space);
        }

        self.base += consumed;
        Ok(addr)
    }

    /// Accepted for symmetry with `allocate`; does nothing.
    ///
    /// The pointer is not validated and its space is not reclaimed.
    #[inline]
    pub fn release(&mut self, _addr: usize) {}

    /// Next free address.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.base
    }

    /// Exclusive upper bound of the range.
    #[inline]
    pub fn top(&self) -> usize {
        self.top
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.top - self.base
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}
