//! Process-wide platform heap.
//!
//! Bare-metal harness code expects C-style `mem_alloc` / `mem_free` entry
//! points backed by one fixed region. This module keeps a single [`Arena`]
//! for them. The region is [`ArenaRegion::PLATFORM_DEFAULT`] unless
//! [`configure`] runs before the first allocation.
//!
//! The lock only gives the static interior mutability; the heap is still a
//! setup-phase allocator and callers must not race on it. Nothing allocated
//! here is ever freed.

use core::ptr;

use hartpal_lib::config::PalConfig;
use hartpal_lib::{klog_info, klog_warn};
use spin::Mutex;

use crate::arena::{Arena, ArenaRegion};
use crate::error::ArenaResult;
use crate::mm_constants::{CACHEABLE_ALIGN, MEM_ALIGN_4K, PLATFORM_PAGE_SIZE};

static PLATFORM_HEAP: Mutex<Arena> = Mutex::new(Arena::new(ArenaRegion::PLATFORM_DEFAULT));

fn heap_alloc(alignment: usize, size: usize) -> *mut u8 {
    match PLATFORM_HEAP.lock().allocate(alignment, size) {
        Ok(addr) => addr as *mut u8,
        Err(err) => {
            klog_warn!(
                "HEAP: allocation of {:#x} bytes (align {:#x}) failed: {}",
                size,
                alignment,
                err
            );
            ptr::null_mut()
        }
    }
}

/// Fix the heap region before first use.
///
/// Fails with `AlreadyInitialized` once anything has been allocated.
pub fn configure(region: ArenaRegion) -> ArenaResult {
    PLATFORM_HEAP.lock().init(region.base, region.size)?;
    klog_info!(
        "HEAP: platform heap at {:#x}, {:#x} bytes",
        region.base,
        region.size
    );
    Ok(())
}

/// Fix the heap region from the command-line configuration.
pub fn configure_from(config: &PalConfig) -> ArenaResult {
    configure(ArenaRegion::from_config(config))
}

/// Allocate `size` bytes aligned to `alignment`. Returns null on failure.
pub fn mem_alloc(alignment: usize, size: usize) -> *mut u8 {
    heap_alloc(alignment, size)
}

/// No-op: the platform heap never reclaims memory.
pub fn mem_free(_ptr: *mut u8) {}

/// Allocate with an explicit alignment. Returns null on failure.
pub fn aligned_alloc(alignment: usize, size: usize) -> *mut u8 {
    heap_alloc(alignment, size)
}

/// No-op counterpart of [`aligned_alloc`].
pub fn free_aligned(_ptr: *mut u8) {}

/// Allocate `count` contiguous pages of [`page_size`] bytes.
pub fn alloc_pages(count: usize) -> *mut u8 {
    match count.checked_mul(PLATFORM_PAGE_SIZE) {
        Some(size) => heap_alloc(MEM_ALIGN_4K, size),
        None => ptr::null_mut(),
    }
}

/// No-op counterpart of [`alloc_pages`].
pub fn free_pages(_base: *mut u8, _count: usize) {}

/// Allocate a buffer for device access.
///
/// The platform heap is identity mapped and cacheable, so the returned
/// pointer doubles as the physical address (see [`virt_to_phys`]).
pub fn alloc_cacheable(size: usize) -> *mut u8 {
    heap_alloc(CACHEABLE_ALIGN, size)
}

#[inline]
pub const fn page_size() -> usize {
    PLATFORM_PAGE_SIZE
}

/// Heap memory is identity mapped.
#[inline]
pub fn virt_to_phys(va: *const u8) -> u64 {
    va as u64
}

#[inline]
pub fn phys_to_virt(pa: u64) -> *mut u8 {
    pa as usize as *mut u8
}

/// Bytes still available in the platform heap.
pub fn remaining() -> usize {
    let heap = PLATFORM_HEAP.lock();
    if heap.is_initialized() {
        heap.remaining()
    } else {
        ArenaRegion::PLATFORM_DEFAULT.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArenaError;

    // The heap is process-wide, so everything touching it lives in one test.
    #[test]
    fn platform_heap_hands_out_aligned_disjoint_blocks() {
        let a = mem_alloc(16, 100);
        assert!(!a.is_null());
        assert_eq!(a as usize % 16, 0);

        let pages = alloc_pages(2);
        assert!(!pages.is_null());
        assert_eq!(pages as usize % page_size(), 0);
        assert!(pages as usize >= a as usize + 100);

        let dma = alloc_cacheable(64);
        assert_eq!(dma as usize % CACHEABLE_ALIGN, 0);
        assert!(dma as usize >= pages as usize + 2 * page_size());
        assert_eq!(phys_to_virt(virt_to_phys(dma)), dma);

        mem_free(a);
        free_pages(pages, 2);
        let b = aligned_alloc(8, 8);
        assert!(b as usize > dma as usize);
        free_aligned(b);

        assert!(mem_alloc(3, 8).is_null());
        assert!(mem_alloc(8, 0).is_null());
        assert!(alloc_pages(usize::MAX).is_null());
        assert!(mem_alloc(8, remaining() + 1).is_null());

        assert_eq!(
            configure(ArenaRegion::new(0x1000, 0x1000)),
            Err(ArenaError::AlreadyInitialized)
        );
        assert_eq!(
            configure_from(&PalConfig::default()),
            Err(ArenaError::AlreadyInitialized)
        );
    }
}
