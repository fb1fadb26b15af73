//! Platform memory constants.
//!
//! The heap region is the default backing store for the platform heap when
//! the command line does not override it (`pal.heap.base` / `pal.heap.size`).

/// Base of the bare-metal platform heap region.
pub const PLATFORM_HEAP_REGION_BASE: usize = 0x8800_0000;

/// Size of the bare-metal platform heap region (16 MiB).
pub const PLATFORM_HEAP_REGION_SIZE: usize = 0x0100_0000;

/// Translation granule used by the harness.
pub const PLATFORM_PAGE_SIZE: usize = 0x1000;

/// Alignment of page allocations.
pub const MEM_ALIGN_4K: usize = 0x1000;

/// Alignment of cacheable DMA-style buffers.
pub const CACHEABLE_ALIGN: usize = 0x8;
