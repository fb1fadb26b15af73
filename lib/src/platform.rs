//! Platform collaborators.
//!
//! The platform layer never touches cache-maintenance instructions or firmware
//! discovery directly; the embedding harness supplies both through these
//! traits.

use core::mem;

/// Cache maintenance requested when publishing a memory range.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheOp {
    Clean = 0,
    Invalidate = 1,
    CleanAndInvalidate = 2,
}

/// Makes prior writes to a memory range visible to other execution contexts.
pub trait CachePublish {
    fn publish(&self, addr: usize, len: usize, op: CacheOp);
}

impl<F> CachePublish for F
where
    F: Fn(usize, usize, CacheOp),
{
    #[inline]
    fn publish(&self, addr: usize, len: usize, op: CacheOp) {
        self(addr, len, op)
    }
}

/// Publisher for single-context platforms with coherent caches.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPublish;

impl CachePublish for NoopPublish {
    #[inline]
    fn publish(&self, _addr: usize, _len: usize, _op: CacheOp) {}
}

/// Publish the memory occupied by `value`.
#[inline]
pub fn publish_object<T, P>(publisher: &P, value: &T, op: CacheOp)
where
    P: CachePublish + ?Sized,
{
    publisher.publish(value as *const T as usize, mem::size_of::<T>(), op);
}

/// Firmware table discovery.
///
/// Each method returns the complete table bytes (header included), or `None`
/// when firmware does not provide the table.
pub trait FirmwareTables {
    /// The MADT (`"APIC"`) table.
    fn madt(&self) -> Option<&[u8]>;
    /// The RISC-V hart capabilities table (`"RHCT"`).
    fn rhct(&self) -> Option<&[u8]>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::vec::Vec;

    #[test]
    fn closures_publish() {
        let seen = RefCell::new(Vec::new());
        let publisher = |addr: usize, len: usize, op: CacheOp| seen.borrow_mut().push((addr, len, op));

        let value = 0u64;
        publish_object(&publisher, &value, CacheOp::Clean);

        let seen = seen.into_inner();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], (&value as *const u64 as usize, 8, CacheOp::Clean));
    }

    #[test]
    fn noop_publish_accepts_anything() {
        NoopPublish.publish(0, usize::MAX, CacheOp::Invalidate);
    }
}
