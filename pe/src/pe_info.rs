//! The PE info table: one fixed-layout entry per usable hart.
//!
//! The layout is `#[repr(C)]` because secondary harts and test payloads read
//! it by address after it has been published.

use hartpal_lib::bytes_as_str;

use crate::error::{PeError, PeResult};
use crate::secondary_stack::RoutingId;

/// Bytes reserved for a hart's ISA string.
pub const ISA_STRING_CAPACITY: usize = 256;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeInfoEntry {
    pub hart_id: u64,
    /// Dense index over accepted harts, in firmware order.
    pub pe_num: u32,
    pub acpi_processor_uid: u32,
    pub ext_intc_id: u32,
    pub imsic_base: u64,
    pub imsic_size: u32,
    /// NUL-padded. A string that fills the buffer has no terminator.
    pub isa_string: [u8; ISA_STRING_CAPACITY],
}

impl PeInfoEntry {
    pub const EMPTY: Self = Self {
        hart_id: 0,
        pe_num: 0,
        acpi_processor_uid: 0,
        ext_intc_id: 0,
        imsic_base: 0,
        imsic_size: 0,
        isa_string: [0; ISA_STRING_CAPACITY],
    };

    #[inline]
    pub fn isa_str(&self) -> &str {
        bytes_as_str(&self.isa_string)
    }

    #[inline]
    pub fn routing_id(&self) -> RoutingId {
        RoutingId::new(self.hart_id)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PeInfoHeader {
    pub num_of_pe: u32,
}

/// Caller-owned PE table holding up to `N` entries.
///
/// Entries are append-only; `header.num_of_pe` always equals the number
/// written.
#[repr(C)]
pub struct PeInfoTable<const N: usize> {
    header: PeInfoHeader,
    entries: [PeInfoEntry; N],
}

impl<const N: usize> Default for PeInfoTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PeInfoTable<N> {
    pub const fn new() -> Self {
        Self {
            header: PeInfoHeader { num_of_pe: 0 },
            entries: [PeInfoEntry::EMPTY; N],
        }
    }

    #[inline]
    pub fn num_of_pe(&self) -> u32 {
        self.header.num_of_pe
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn header(&self) -> &PeInfoHeader {
        &self.header
    }

    /// The accepted entries, indexed by `pe_num`.
    #[inline]
    pub fn entries(&self) -> &[PeInfoEntry] {
        &self.entries[..self.header.num_of_pe as usize]
    }

    #[inline]
    pub fn get(&self, pe_num: u32) -> Option<&PeInfoEntry> {
        self.entries().get(pe_num as usize)
    }

    pub fn find_by_hart_id(&self, hart_id: u64) -> Option<&PeInfoEntry> {
        self.entries().iter().find(|e| e.hart_id == hart_id)
    }

    pub fn find_by_uid(&self, acpi_processor_uid: u32) -> Option<&PeInfoEntry> {
        self.entries()
            .iter()
            .find(|e| e.acpi_processor_uid == acpi_processor_uid)
    }

    /// Largest value seen in each affinity field across all hart ids.
    pub fn max_routing_id(&self) -> RoutingId {
        self.entries()
            .iter()
            .fold(RoutingId::new(0), |max, e| max.field_max(e.routing_id()))
    }

    /// Forget every entry.
    pub(crate) fn reset(&mut self) {
        self.entries.fill(PeInfoEntry::EMPTY);
        self.header.num_of_pe = 0;
    }

    /// Append a blank entry numbered `num_of_pe` and count it.
    pub(crate) fn push(&mut self) -> PeResult<&mut PeInfoEntry> {
        let index = self.header.num_of_pe as usize;
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(PeError::OutOfCapacity { capacity: N })?;
        *entry = PeInfoEntry::EMPTY;
        entry.pe_num = index as u32;
        self.header.num_of_pe += 1;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(hart_ids: &[u64]) -> PeInfoTable<4> {
        let mut table = PeInfoTable::new();
        for (uid, &hart_id) in hart_ids.iter().enumerate() {
            let entry = table.push().unwrap();
            entry.hart_id = hart_id;
            entry.acpi_processor_uid = uid as u32 + 10;
        }
        table
    }

    #[test]
    fn push_numbers_entries_densely() {
        let table = table_with(&[7, 3, 5]);
        assert_eq!(table.num_of_pe(), 3);
        assert_eq!(table.capacity(), 4);
        let nums: Vec<u32> = table.entries().iter().map(|e| e.pe_num).collect();
        assert_eq!(nums, [0, 1, 2]);
        assert_eq!(table.get(1).map(|e| e.hart_id), Some(3));
        assert!(table.get(3).is_none());
    }

    #[test]
    fn push_past_capacity_is_rejected() {
        let mut table = table_with(&[0, 1, 2, 3]);
        assert_eq!(
            table.push().err(),
            Some(PeError::OutOfCapacity { capacity: 4 })
        );
        assert_eq!(table.num_of_pe(), 4);
    }

    #[test]
    fn lookups_only_see_accepted_entries() {
        let mut table = table_with(&[0x10, 0x20]);
        assert_eq!(table.find_by_hart_id(0x20).map(|e| e.pe_num), Some(1));
        assert_eq!(table.find_by_uid(10).map(|e| e.hart_id), Some(0x10));
        // Blank slots past num_of_pe have hart id 0.
        assert!(table.find_by_hart_id(0).is_none());

        table.reset();
        assert_eq!(table.num_of_pe(), 0);
        assert!(table.find_by_hart_id(0x10).is_none());
    }

    #[test]
    fn max_routing_id_is_per_field() {
        let table = table_with(&[0x0000_0000_0003, 0x0001_0000_0100, 0x0000_0002_0001]);
        assert_eq!(table.max_routing_id().fields(), [3, 1, 2, 1]);
        assert_eq!(PeInfoTable::<2>::new().max_routing_id().fields(), [0; 4]);
    }

    #[test]
    fn isa_str_handles_full_buffer() {
        let mut entry = PeInfoEntry::EMPTY;
        assert_eq!(entry.isa_str(), "");
        entry.isa_string.fill(b'x');
        assert_eq!(entry.isa_str().len(), ISA_STRING_CAPACITY);
    }
}
