//! RISC-V Hart Capabilities Table.
//!
//! The RHCT is a bag of nodes reached by byte offset from the table base.
//! Hart-info nodes tie an ACPI processor UID to a list of offsets naming the
//! ISA string, CMO and MMU nodes that apply to that hart.

use crate::tables::{AcpiTable, SDT_HEADER_LEN, TableError};

pub const RHCT_SIGNATURE: &[u8; 4] = b"RHCT";

/// SDT header + flags + time base frequency + node count + node offset.
pub const RHCT_HEADER_LEN: usize = SDT_HEADER_LEN + 20;

pub const RHCT_NODE_ISA_STRING: u16 = 0;
pub const RHCT_NODE_CMO: u16 = 1;
pub const RHCT_NODE_MMU: u16 = 2;
pub const RHCT_NODE_HART_INFO: u16 = 0xFFFF;

/// type + length + revision.
pub const RHCT_NODE_HEADER_LEN: usize = 6;

const RHCT_FLAGS: usize = SDT_HEADER_LEN;
const RHCT_TIME_BASE_FREQUENCY: usize = SDT_HEADER_LEN + 4;
const RHCT_NODE_COUNT: usize = SDT_HEADER_LEN + 12;
const RHCT_NODE_OFFSET: usize = SDT_HEADER_LEN + 16;

const ISA_LENGTH: usize = 6;
const ISA_BYTES: usize = 8;

const CMO_CBOM: usize = 7;
const CMO_CBOP: usize = 8;
const CMO_CBOZ: usize = 9;
const CMO_NODE_LEN: usize = 10;

const MMU_TYPE: usize = 7;
const MMU_NODE_LEN: usize = 8;

const HART_INFO_COUNT: usize = 6;
const HART_INFO_UID: usize = 8;
const HART_INFO_OFFSETS: usize = 12;

/// Cache-management block sizes, each given as log2 of the size in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmoInfo {
    pub cbom_size: u8,
    pub cbop_size: u8,
    pub cboz_size: u8,
}

impl CmoInfo {
    /// Block size in bytes for a log2 field; zero means not supported.
    #[inline]
    pub fn block_bytes(log2: u8) -> u64 {
        if log2 == 0 || log2 >= 64 { 0 } else { 1u64 << log2 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MmuType {
    Sv39,
    Sv48,
    Sv57,
    Unknown(u8),
}

impl MmuType {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Sv39,
            1 => Self::Sv48,
            2 => Self::Sv57,
            other => Self::Unknown(other),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sv39 => "Sv39",
            Self::Sv48 => "Sv48",
            Self::Sv57 => "Sv57",
            Self::Unknown(_) => "unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MmuInfo {
    pub mmu_type: MmuType,
}

/// A hart-info node: the UID it describes and its list of node offsets.
#[derive(Clone, Copy)]
pub struct HartInfo<'a> {
    table: AcpiTable<'a>,
    offset: usize,
    uid: u32,
    offset_count: u16,
}

impl core::fmt::Debug for HartInfo<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HartInfo")
            .field("offset", &self.offset)
            .field("uid", &self.uid)
            .field("offset_count", &self.offset_count)
            .finish()
    }
}

impl PartialEq for HartInfo<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.uid == other.uid && self.offset_count == other.offset_count
    }
}

impl Eq for HartInfo<'_> {}

impl<'a> HartInfo<'a> {
    /// Offset of this node from the table base.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn uid(&self) -> u32 {
        self.uid
    }

    #[inline]
    pub fn offset_count(&self) -> u16 {
        self.offset_count
    }

    /// Raw offsets from the hart's list. Entries that would lie past the
    /// end of the table are not yielded.
    pub fn node_offsets(self) -> impl Iterator<Item = u32> + 'a {
        let table = self.table;
        let start = self.offset + HART_INFO_OFFSETS;
        (0..self.offset_count as usize).map_while(move |i| table.read_u32(start + i * 4))
    }

    /// Every listed offset paired with the node found there.
    pub fn related_nodes(self) -> impl Iterator<Item = (u32, RhctNode<'a>)> + 'a {
        let table = self.table;
        self.node_offsets()
            .map(move |offset| (offset, decode_node(table, offset as usize)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RhctNode<'a> {
    /// ISA string bytes as stored, without any NUL terminator the firmware
    /// may have included in the declared length.
    IsaString(&'a [u8]),
    Cmo(CmoInfo),
    Mmu(MmuInfo),
    HartInfo(HartInfo<'a>),
    Unknown { node_type: u16, length: u16 },
    /// The offset does not hold a decodable node: it points outside the
    /// table, the node's length runs past the table, or its payload is
    /// shorter than its type requires.
    Malformed { offset: usize },
}

/// Node type and length, if a whole node header lies inside the table.
fn node_header(table: AcpiTable<'_>, offset: usize) -> Option<(u16, u16)> {
    let raw = table.bytes(offset, RHCT_NODE_HEADER_LEN)?;
    Some((
        u16::from_le_bytes([raw[0], raw[1]]),
        u16::from_le_bytes([raw[2], raw[3]]),
    ))
}

/// Length of the node at `offset`, if the walk can step over it.
fn node_extent(table: AcpiTable<'_>, offset: usize) -> Option<usize> {
    let (_, length) = node_header(table, offset)?;
    let len = length as usize;
    (len >= RHCT_NODE_HEADER_LEN && table.bytes(offset, len).is_some()).then_some(len)
}

fn decode_payload(table: AcpiTable<'_>, offset: usize) -> Option<RhctNode<'_>> {
    let (node_type, length) = node_header(table, offset)?;
    let len = node_extent(table, offset)?;

    match node_type {
        RHCT_NODE_ISA_STRING => {
            let isa_len = table.read_u16(offset + ISA_LENGTH)? as usize;
            if ISA_BYTES + isa_len > len {
                return None;
            }
            let raw = table.bytes(offset + ISA_BYTES, isa_len)?;
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            Some(RhctNode::IsaString(&raw[..end]))
        }
        RHCT_NODE_CMO if len >= CMO_NODE_LEN => Some(RhctNode::Cmo(CmoInfo {
            cbom_size: table.read_u8(offset + CMO_CBOM)?,
            cbop_size: table.read_u8(offset + CMO_CBOP)?,
            cboz_size: table.read_u8(offset + CMO_CBOZ)?,
        })),
        RHCT_NODE_MMU if len >= MMU_NODE_LEN => Some(RhctNode::Mmu(MmuInfo {
            mmu_type: MmuType::from_raw(table.read_u8(offset + MMU_TYPE)?),
        })),
        RHCT_NODE_HART_INFO if len >= HART_INFO_OFFSETS => {
            let offset_count = table.read_u16(offset + HART_INFO_COUNT)?;
            if HART_INFO_OFFSETS + offset_count as usize * 4 > len {
                return None;
            }
            Some(RhctNode::HartInfo(HartInfo {
                table,
                offset,
                uid: table.read_u32(offset + HART_INFO_UID)?,
                offset_count,
            }))
        }
        RHCT_NODE_CMO | RHCT_NODE_MMU | RHCT_NODE_HART_INFO => None,
        _ => Some(RhctNode::Unknown { node_type, length }),
    }
}

fn decode_node(table: AcpiTable<'_>, offset: usize) -> RhctNode<'_> {
    decode_payload(table, offset).unwrap_or(RhctNode::Malformed { offset })
}

/// Parsed handle to the RHCT.
#[derive(Clone, Copy)]
pub struct Rhct<'a> {
    table: AcpiTable<'a>,
}

impl<'a> Rhct<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, TableError> {
        let table = AcpiTable::with_signature(bytes, RHCT_SIGNATURE, RHCT_HEADER_LEN)?;
        Ok(Self { table })
    }

    #[inline]
    pub fn table(&self) -> AcpiTable<'a> {
        self.table
    }

    pub fn flags(&self) -> u32 {
        self.table.read_u32(RHCT_FLAGS).unwrap_or(0)
    }

    pub fn time_base_frequency(&self) -> u64 {
        self.table.read_u64(RHCT_TIME_BASE_FREQUENCY).unwrap_or(0)
    }

    pub fn node_count(&self) -> u32 {
        self.table.read_u32(RHCT_NODE_COUNT).unwrap_or(0)
    }

    pub fn node_offset(&self) -> u32 {
        self.table.read_u32(RHCT_NODE_OFFSET).unwrap_or(0)
    }

    /// Decode the node at `offset` from the table base.
    pub fn node_at(&self, offset: usize) -> RhctNode<'a> {
        decode_node(self.table, offset)
    }

    /// Walk at most `node_count` nodes from `node_offset`, each advancing by
    /// its own length. A node that cannot be advanced past ends the walk, as
    /// does reaching the end of the table.
    pub fn nodes(&self) -> RhctNodes<'a> {
        RhctNodes {
            table: self.table,
            offset: self.node_offset() as usize,
            remaining: self.node_count(),
        }
    }

    /// The first hart-info node describing `uid`.
    pub fn find_hart_info(&self, uid: u32) -> Option<HartInfo<'a>> {
        self.nodes().find_map(|(_, node)| match node {
            RhctNode::HartInfo(info) if info.uid() == uid => Some(info),
            _ => None,
        })
    }
}

pub struct RhctNodes<'a> {
    table: AcpiTable<'a>,
    offset: usize,
    remaining: u32,
}

impl<'a> Iterator for RhctNodes<'a> {
    type Item = (usize, RhctNode<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.offset >= self.table.len() {
            return None;
        }
        self.remaining -= 1;

        let offset = self.offset;
        match node_extent(self.table, offset) {
            Some(length) => self.offset = offset + length,
            None => self.remaining = 0,
        }
        Some((offset, decode_node(self.table, offset)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::RhctBuilder;
    use std::vec::Vec;

    #[test]
    fn header_fields_are_decoded() {
        let mut builder = RhctBuilder::new();
        builder.time_base_frequency(10_000_000);
        builder.isa_string("rv64imac");
        let bytes = builder.build();

        let rhct = Rhct::parse(&bytes).unwrap();
        assert_eq!(rhct.time_base_frequency(), 10_000_000);
        assert_eq!(rhct.node_count(), 1);
        assert_eq!(rhct.node_offset(), RHCT_HEADER_LEN as u32);
        assert!(rhct.table().checksum_valid());
    }

    #[test]
    fn hart_info_resolves_related_nodes() {
        let mut builder = RhctBuilder::new();
        let isa = builder.isa_string("rv64imafdc_zicbom");
        let cmo = builder.cmo(6, 0, 6);
        let mmu = builder.mmu(1);
        builder.hart_info(3, &[isa, cmo, mmu]);
        let bytes = builder.build();
        let rhct = Rhct::parse(&bytes).unwrap();

        let hart = rhct.find_hart_info(3).unwrap();
        assert_eq!(hart.uid(), 3);
        assert_eq!(hart.offset_count(), 3);

        let related: Vec<_> = hart.related_nodes().collect();
        assert_eq!(related[0], (isa, RhctNode::IsaString(b"rv64imafdc_zicbom")));
        assert_eq!(
            related[1],
            (
                cmo,
                RhctNode::Cmo(CmoInfo {
                    cbom_size: 6,
                    cbop_size: 0,
                    cboz_size: 6
                })
            )
        );
        assert_eq!(
            related[2],
            (
                mmu,
                RhctNode::Mmu(MmuInfo {
                    mmu_type: MmuType::Sv48
                })
            )
        );
        assert!(rhct.find_hart_info(4).is_none());
    }

    #[test]
    fn walk_is_bounded_by_node_count() {
        let mut builder = RhctBuilder::new();
        builder.isa_string("rv64gc");
        builder.hart_info(0, &[]);
        builder.node_count_override(1);
        let bytes = builder.build();
        let rhct = Rhct::parse(&bytes).unwrap();

        assert_eq!(rhct.nodes().count(), 1);
        assert!(rhct.find_hart_info(0).is_none());
    }

    #[test]
    fn out_of_table_offsets_are_malformed() {
        let mut builder = RhctBuilder::new();
        builder.hart_info(1, &[0x4000]);
        let bytes = builder.build();
        let rhct = Rhct::parse(&bytes).unwrap();

        let hart = rhct.find_hart_info(1).unwrap();
        let related: Vec<_> = hart.related_nodes().collect();
        assert_eq!(related, [(0x4000, RhctNode::Malformed { offset: 0x4000 })]);
        assert_eq!(rhct.node_at(usize::MAX), RhctNode::Malformed { offset: usize::MAX });
    }

    #[test]
    fn unknown_node_types_are_reported_with_length() {
        let mut builder = RhctBuilder::new();
        let at = builder.raw_node(0x42, &[0xaa; 6]);
        let bytes = builder.build();
        let rhct = Rhct::parse(&bytes).unwrap();

        assert_eq!(
            rhct.node_at(at as usize),
            RhctNode::Unknown {
                node_type: 0x42,
                length: 12
            }
        );
    }

    #[test]
    fn overstated_node_count_stops_at_table_end() {
        let mut builder = RhctBuilder::new();
        let isa = builder.isa_string("rv64gc");
        builder.hart_info(0, &[isa]);
        builder.node_count_override(5);
        let bytes = builder.build();
        let rhct = Rhct::parse(&bytes).unwrap();

        let nodes: Vec<_> = rhct.nodes().collect();
        assert_eq!(nodes.len(), 2);
        assert!(
            nodes
                .iter()
                .all(|(_, node)| !matches!(node, RhctNode::Malformed { .. }))
        );
    }

    #[test]
    fn zero_length_node_stops_the_walk() {
        let mut builder = RhctBuilder::new();
        builder.raw_bytes(&[0, 0, 0, 0, 0, 0]);
        builder.hart_info(9, &[]);
        builder.node_count_override(2);
        let bytes = builder.build();
        let rhct = Rhct::parse(&bytes).unwrap();

        let nodes: Vec<_> = rhct.nodes().collect();
        assert_eq!(
            nodes,
            [(
                RHCT_HEADER_LEN,
                RhctNode::Malformed {
                    offset: RHCT_HEADER_LEN
                }
            )]
        );
    }

    #[test]
    fn isa_string_stops_at_nul() {
        let mut builder = RhctBuilder::new();
        let at = builder.raw_node(RHCT_NODE_ISA_STRING, &[6, 0, b'r', b'v', b'6', b'4', 0, 0]);
        let bytes = builder.build();
        let rhct = Rhct::parse(&bytes).unwrap();
        assert_eq!(rhct.node_at(at as usize), RhctNode::IsaString(b"rv64"));
    }

    #[test]
    fn isa_length_past_node_is_malformed() {
        let mut builder = RhctBuilder::new();
        let at = builder.raw_node(RHCT_NODE_ISA_STRING, &[40, 0, b'r', b'v']);
        let bytes = builder.build();
        let rhct = Rhct::parse(&bytes).unwrap();
        assert_eq!(
            rhct.node_at(at as usize),
            RhctNode::Malformed { offset: at as usize }
        );
    }

    #[test]
    fn mmu_and_cmo_helpers() {
        assert_eq!(MmuType::from_raw(2), MmuType::Sv57);
        assert_eq!(MmuType::from_raw(7), MmuType::Unknown(7));
        assert_eq!(MmuType::Sv39.as_str(), "Sv39");
        assert_eq!(CmoInfo::block_bytes(6), 64);
        assert_eq!(CmoInfo::block_bytes(0), 0);
    }
}
