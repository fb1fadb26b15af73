use bitflags::bitflags;

use crate::tables::{AcpiTable, SDT_HEADER_LEN, TableError};

pub const MADT_SIGNATURE: &[u8; 4] = b"APIC";

/// SDT header + local interrupt controller address + flags.
pub const MADT_HEADER_LEN: usize = SDT_HEADER_LEN + 8;

/// RISC-V hart local interrupt controller (RINTC) record type.
pub const MADT_ENTRY_RINTC: u8 = 0x18;

/// Minimum RINTC record length (ACPI 6.5, version 1).
pub const RINTC_LEN: usize = 36;

const ENTRY_HEADER_LEN: usize = 2;

// RINTC field offsets, relative to the record start.
const RINTC_VERSION: usize = 2;
const RINTC_FLAGS: usize = 4;
const RINTC_HART_ID: usize = 8;
const RINTC_PROCESSOR_UID: usize = 16;
const RINTC_EXT_INTC_ID: usize = 20;
const RINTC_IMSIC_BASE: usize = 24;
const RINTC_IMSIC_SIZE: usize = 32;

bitflags! {
    /// RINTC `flags` field.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RintcFlags: u32 {
        /// The hart is ready to use (bit 0).
        const ENABLED        = 1 << 0;
        /// The hart can be brought online later (bit 1). Only meaningful
        /// when `ENABLED` is clear.
        const ONLINE_CAPABLE = 1 << 1;
    }
}

impl RintcFlags {
    /// A hart is usable when it is enabled, or disabled but online-capable.
    /// With both bits clear the hart must not be used.
    #[inline]
    pub fn is_usable(self) -> bool {
        self.intersects(Self::ENABLED | Self::ONLINE_CAPABLE)
    }
}

/// Decoded RINTC record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RintcInfo {
    pub version: u8,
    pub flags: RintcFlags,
    pub hart_id: u64,
    pub acpi_processor_uid: u32,
    pub ext_intc_id: u32,
    pub imsic_base: u64,
    pub imsic_size: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MadtEntry {
    Rintc(RintcInfo),
    /// A well-formed record of a type this parser does not decode.
    Other {
        offset: usize,
        entry_type: u8,
        length: u8,
    },
    /// A record that cannot be decoded. If its length cannot be trusted
    /// (zero, shorter than a record header, or running past the table), this
    /// is the last item the iterator yields.
    Malformed {
        offset: usize,
        entry_type: u8,
        length: u8,
    },
}

/// Parsed handle to the MADT, supporting iteration over its records.
#[derive(Clone, Copy)]
pub struct Madt<'a> {
    table: AcpiTable<'a>,
}

impl<'a> Madt<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, TableError> {
        let table = AcpiTable::with_signature(bytes, MADT_SIGNATURE, MADT_HEADER_LEN)?;
        Ok(Self { table })
    }

    #[inline]
    pub fn table(&self) -> AcpiTable<'a> {
        self.table
    }

    pub fn local_interrupt_controller_address(&self) -> u32 {
        self.table.read_u32(SDT_HEADER_LEN).unwrap_or(0)
    }

    pub fn flags(&self) -> u32 {
        self.table.read_u32(SDT_HEADER_LEN + 4).unwrap_or(0)
    }

    /// Walk the records after the header, by cumulative record length, up to
    /// the declared table length.
    pub fn entries(&self) -> MadtEntries<'a> {
        MadtEntries {
            table: self.table,
            offset: MADT_HEADER_LEN,
            done: false,
        }
    }

    /// Only the RINTC records, in table order.
    pub fn harts(self) -> impl Iterator<Item = RintcInfo> + 'a {
        self.entries().filter_map(|entry| match entry {
            MadtEntry::Rintc(info) => Some(info),
            _ => None,
        })
    }
}

pub struct MadtEntries<'a> {
    table: AcpiTable<'a>,
    offset: usize,
    done: bool,
}

impl MadtEntries<'_> {
    fn decode_rintc(&self, at: usize) -> Option<RintcInfo> {
        let t = &self.table;
        Some(RintcInfo {
            version: t.read_u8(at + RINTC_VERSION)?,
            flags: RintcFlags::from_bits_retain(t.read_u32(at + RINTC_FLAGS)?),
            hart_id: t.read_u64(at + RINTC_HART_ID)?,
            acpi_processor_uid: t.read_u32(at + RINTC_PROCESSOR_UID)?,
            ext_intc_id: t.read_u32(at + RINTC_EXT_INTC_ID)?,
            imsic_base: t.read_u64(at + RINTC_IMSIC_BASE)?,
            imsic_size: t.read_u32(at + RINTC_IMSIC_SIZE)?,
        })
    }
}

impl Iterator for MadtEntries<'_> {
    type Item = MadtEntry;

    fn next(&mut self) -> Option<MadtEntry> {
        if self.done || self.offset >= self.table.len() {
            return None;
        }

        let offset = self.offset;
        let entry_type = self.table.read_u8(offset).unwrap_or(0);
        let length = self.table.read_u8(offset + 1).unwrap_or(0);
        let end = offset + length as usize;

        if (length as usize) < ENTRY_HEADER_LEN || end > self.table.len() {
            self.done = true;
            return Some(MadtEntry::Malformed {
                offset,
                entry_type,
                length,
            });
        }
        self.offset = end;

        let entry = match entry_type {
            MADT_ENTRY_RINTC if length as usize >= RINTC_LEN => match self.decode_rintc(offset) {
                Some(info) => MadtEntry::Rintc(info),
                None => MadtEntry::Malformed {
                    offset,
                    entry_type,
                    length,
                },
            },
            MADT_ENTRY_RINTC => MadtEntry::Malformed {
                offset,
                entry_type,
                length,
            },
            _ => MadtEntry::Other {
                offset,
                entry_type,
                length,
            },
        };
        Some(entry)
    }
}
