//! Stacks for secondary execution contexts.
//!
//! One region is carved from the arena and split into
//! [`SECONDARY_STACK_SIZE`] slices, one per possible context. The region
//! base is 16-byte aligned; the word just below it holds the address the
//! arena actually returned.
//!
//! ```text
//!   raw            base-8        base                      base + count*0x100
//!    |  [pad 8]  |  raw addr  |  ctx 0  |  ctx 1  | ... |
//! ```
//!
//! The pad is only present when `raw` is already 16-byte aligned.

use core::mem;

use hartpal_lib::{CacheOp, CachePublish, is_aligned_usize, klog_debug, klog_error, klog_info};
use hartpal_mm::{Arena, ArenaError, ArenaResult};

/// Stack bytes per secondary context.
pub const SECONDARY_STACK_SIZE: usize = 0x100;

/// Required stack pointer alignment.
pub const STACK_ALIGNMENT: usize = 16;

/// Alignment the backing pool guarantees.
const POOL_ALIGNMENT: usize = 8;

const ROUTING_FIELD_SHIFTS: [u32; 4] = [0, 8, 16, 32];

/// Packed affinity identifier: four 8-bit fields at bits 0-7, 8-15, 16-23
/// and 32-39. Other bits are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoutingId(u64);

impl RoutingId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn from_fields(fields: [u8; 4]) -> Self {
        let raw = fields
            .iter()
            .zip(ROUTING_FIELD_SHIFTS)
            .fold(0u64, |acc, (&f, shift)| acc | (u64::from(f) << shift));
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Affinity fields, lowest first.
    pub fn fields(self) -> [u8; 4] {
        ROUTING_FIELD_SHIFTS.map(|shift| (self.0 >> shift) as u8)
    }

    /// Per-field maximum of `self` and `other`.
    pub fn field_max(self, other: Self) -> Self {
        let (a, b) = (self.fields(), other.fields());
        Self::from_fields([a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2]), a[3].max(b[3])])
    }

    /// Contexts addressable when every field ranges up to this id's value.
    pub fn context_count(self) -> usize {
        self.fields()
            .iter()
            .fold(1usize, |n, &f| n.saturating_mul(usize::from(f) + 1))
    }
}

/// The secondary stack region, allocated at most once.
#[derive(Debug, Default)]
pub struct SecondaryStacks {
    base: Option<usize>,
    region_size: usize,
    context_count: usize,
}

impl SecondaryStacks {
    pub const fn new() -> Self {
        Self {
            base: None,
            region_size: 0,
            context_count: 0,
        }
    }

    /// Allocate stacks for every context `routing_id` can address and return
    /// the aligned base. A second call returns the existing base.
    ///
    /// On failure nothing is recorded and a later call may retry.
    ///
    /// # Safety
    ///
    /// Addresses handed out by `arena` must be writable memory: one word of
    /// the allocation is written here.
    pub unsafe fn provision<P>(
        &mut self,
        arena: &mut Arena,
        routing_id: RoutingId,
        publisher: &P,
    ) -> ArenaResult<usize>
    where
        P: CachePublish + ?Sized,
    {
        if let Some(base) = self.base {
            return Ok(base);
        }

        let count = routing_id.context_count();
        let size = count
            .checked_mul(SECONDARY_STACK_SIZE)
            .and_then(|bytes| bytes.checked_add(STACK_ALIGNMENT))
            .ok_or(ArenaError::OutOfSpace {
                requested: usize::MAX,
                remaining: arena.remaining(),
            })?;

        let raw = match arena.allocate(POOL_ALIGNMENT, size) {
            Ok(raw) => raw,
            Err(err) => {
                klog_error!("PE: secondary stack allocation of {:#x} bytes failed: {}", size, err);
                return Err(err);
            }
        };

        let (slot, base) = if !is_aligned_usize(raw, STACK_ALIGNMENT) {
            (raw, raw + mem::size_of::<u64>())
        } else {
            (raw + mem::size_of::<u64>(), raw + 2 * mem::size_of::<u64>())
        };
        // SAFETY: `slot` is an 8-byte aligned word inside the fresh
        // allocation; the caller guarantees it is writable.
        unsafe { (slot as *mut u64).write(raw as u64) };
        publisher.publish(slot, mem::size_of::<u64>(), CacheOp::CleanAndInvalidate);

        self.base = Some(base);
        self.region_size = size;
        self.context_count = count;
        klog_info!(
            "PE: {} secondary stacks at {:#x} ({:#x} bytes from {:#x})",
            count,
            base,
            size,
            raw
        );
        Ok(base)
    }

    /// Aligned region base, once provisioned.
    #[inline]
    pub fn base(&self) -> Option<usize> {
        self.base
    }

    /// Bytes requested from the arena, padding included.
    #[inline]
    pub fn region_size(&self) -> usize {
        self.region_size
    }

    #[inline]
    pub fn context_count(&self) -> usize {
        self.context_count
    }

    /// Initial stack pointer for context `index`: the top of its slice.
    pub fn stack_top(&self, index: usize) -> Option<usize> {
        let base = self.base?;
        if index >= self.context_count {
            klog_debug!(
                "PE: no secondary stack for context {} (have {})",
                index,
                self.context_count
            );
            return None;
        }
        Some(base + (index + 1) * SECONDARY_STACK_SIZE)
    }

    /// The address the arena returned for the region whose aligned base is
    /// `base`.
    ///
    /// # Safety
    ///
    /// `base` must be a value returned by [`provision`](Self::provision) and
    /// the region must still be mapped.
    pub unsafe fn raw_allocation(base: usize) -> usize {
        // SAFETY: `provision` stored the raw address in the word below `base`.
        unsafe { ((base - mem::size_of::<u64>()) as *const u64).read() as usize }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use hartpal_lib::NoopPublish;
    use hartpal_mm::ArenaRegion;

    #[repr(C, align(16))]
    struct Backing([u8; 0x1000]);

    fn backed_arena(backing: &mut Backing, skew: usize) -> Arena {
        let mut arena = Arena::new(ArenaRegion::new(0, 0));
        let base = backing.0.as_mut_ptr() as usize + skew;
        arena.init(base, backing.0.len() - skew).unwrap();
        arena
    }

    #[test]
    fn routing_fields_and_count() {
        let id = RoutingId::from_fields([0, 1, 0, 0]);
        assert_eq!(id.raw(), 0x100);
        assert_eq!(id.context_count(), 2);
        assert_eq!(RoutingId::new(0).context_count(), 1);
        assert_eq!(RoutingId::new(0xff_0000_0000).fields(), [0, 0, 0, 0xff]);
        // Bits 24-31 are not an affinity field.
        assert_eq!(RoutingId::new(0xff00_0000).context_count(), 1);
        assert_eq!(RoutingId::new(0xff_00ff_ffff).context_count(), 1 << 32);
    }

    #[test]
    fn aligned_pool_address_gets_padding_word() {
        let mut backing = Backing([0; 0x1000]);
        let mut arena = backed_arena(&mut backing, 0);
        let raw = arena.cursor();
        let mut stacks = SecondaryStacks::new();

        let base = unsafe { stacks.provision(&mut arena, RoutingId::from_fields([0, 1, 0, 0]), &NoopPublish) }
            .unwrap();
        assert_eq!(base, raw + 16);
        assert_eq!(stacks.region_size(), 2 * 0x100 + 16);
        assert_eq!(unsafe { SecondaryStacks::raw_allocation(base) }, raw);
    }

    #[test]
    fn misaligned_pool_address_stores_in_place() {
        let mut backing = Backing([0; 0x1000]);
        let mut arena = backed_arena(&mut backing, 8);
        let raw = arena.cursor();
        assert_eq!(raw % 16, 8);
        let mut stacks = SecondaryStacks::new();

        let base = unsafe { stacks.provision(&mut arena, RoutingId::new(3), &NoopPublish) }.unwrap();
        assert_eq!(base, raw + 8);
        assert_eq!(base % STACK_ALIGNMENT, 0);
        assert_eq!(unsafe { SecondaryStacks::raw_allocation(base) }, raw);
        assert_eq!(stacks.context_count(), 4);
        assert!(base + 4 * SECONDARY_STACK_SIZE <= raw + stacks.region_size());
    }

    #[test]
    fn second_provision_reuses_region() {
        let mut backing = Backing([0; 0x1000]);
        let mut arena = backed_arena(&mut backing, 0);
        let mut stacks = SecondaryStacks::new();

        let first = unsafe { stacks.provision(&mut arena, RoutingId::new(1), &NoopPublish) }.unwrap();
        let cursor = arena.cursor();
        let again = unsafe { stacks.provision(&mut arena, RoutingId::new(7), &NoopPublish) }.unwrap();
        assert_eq!(first, again);
        assert_eq!(arena.cursor(), cursor);
        assert_eq!(stacks.context_count(), 2);
    }

    #[test]
    fn stored_word_is_published() {
        let mut backing = Backing([0; 0x1000]);
        let mut arena = backed_arena(&mut backing, 0);
        let seen = RefCell::new(Vec::new());
        let publisher = |addr: usize, len: usize, op: CacheOp| seen.borrow_mut().push((addr, len, op));
        let mut stacks = SecondaryStacks::new();

        let base = unsafe { stacks.provision(&mut arena, RoutingId::new(0), &publisher) }.unwrap();
        assert_eq!(*seen.borrow(), [(base - 8, 8, CacheOp::CleanAndInvalidate)]);
    }

    #[test]
    fn stack_tops_partition_the_region() {
        let mut backing = Backing([0; 0x1000]);
        let mut arena = backed_arena(&mut backing, 0);
        let mut stacks = SecondaryStacks::new();
        assert_eq!(stacks.stack_top(0), None);

        let base = unsafe { stacks.provision(&mut arena, RoutingId::new(2), &NoopPublish) }.unwrap();
        assert_eq!(stacks.stack_top(0), Some(base + 0x100));
        assert_eq!(stacks.stack_top(2), Some(base + 0x300));
        assert_eq!(stacks.stack_top(3), None);
    }

    #[test]
    fn exhausted_arena_records_nothing() {
        let mut backing = Backing([0; 0x1000]);
        let mut arena = backed_arena(&mut backing, 0);
        let mut stacks = SecondaryStacks::new();

        let err = unsafe { stacks.provision(&mut arena, RoutingId::new(0xff), &NoopPublish) };
        assert!(matches!(err, Err(ArenaError::OutOfSpace { .. })));
        assert_eq!(stacks.base(), None);
        assert_eq!(stacks.region_size(), 0);
    }
}
