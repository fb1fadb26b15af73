//! Byte-exact MADT and RHCT builders for tests.
//!
//! Tables come out with correct lengths and checksums. Builders that return
//! offsets return them relative to the table base, the form RHCT hart-info
//! nodes store.

use alloc::vec::Vec;

use crate::madt::{MADT_ENTRY_RINTC, MADT_SIGNATURE, RINTC_LEN};
use crate::rhct::{
    RHCT_HEADER_LEN, RHCT_NODE_CMO, RHCT_NODE_HART_INFO, RHCT_NODE_HEADER_LEN,
    RHCT_NODE_ISA_STRING, RHCT_NODE_MMU, RHCT_SIGNATURE,
};
use crate::tables::SDT_HEADER_LEN;

const OEM_ID: &[u8; 6] = b"HARTPL";
const OEM_TABLE_ID: &[u8; 8] = b"FIXTURE ";

/// Prefix `body` with an SDT header and fix up length and checksum.
pub fn finish_table(signature: [u8; 4], revision: u8, body: &[u8]) -> Vec<u8> {
    let length = (SDT_HEADER_LEN + body.len()) as u32;
    let mut bytes = Vec::with_capacity(length as usize);
    bytes.extend_from_slice(&signature);
    bytes.extend_from_slice(&length.to_le_bytes());
    bytes.push(revision);
    bytes.push(0);
    bytes.extend_from_slice(OEM_ID);
    bytes.extend_from_slice(OEM_TABLE_ID);
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(b"HPAL");
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(body);

    let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    bytes[9] = 0u8.wrapping_sub(sum);
    bytes
}

/// Field values for one RINTC record.
#[derive(Clone, Copy, Debug, Default)]
pub struct RintcRecord {
    pub flags: u32,
    pub hart_id: u64,
    pub acpi_processor_uid: u32,
    pub ext_intc_id: u32,
    pub imsic_base: u64,
    pub imsic_size: u32,
}

impl RintcRecord {
    pub fn new(hart_id: u64, acpi_processor_uid: u32, flags: u32) -> Self {
        Self {
            flags,
            hart_id,
            acpi_processor_uid,
            ..Self::default()
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(MADT_ENTRY_RINTC);
        out.push(RINTC_LEN as u8);
        out.push(1);
        out.push(0);
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.hart_id.to_le_bytes());
        out.extend_from_slice(&self.acpi_processor_uid.to_le_bytes());
        out.extend_from_slice(&self.ext_intc_id.to_le_bytes());
        out.extend_from_slice(&self.imsic_base.to_le_bytes());
        out.extend_from_slice(&self.imsic_size.to_le_bytes());
    }
}

#[derive(Default)]
pub struct MadtBuilder {
    records: Vec<u8>,
}

impl MadtBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rintc(mut self, record: RintcRecord) -> Self {
        record.encode(&mut self.records);
        self
    }

    /// A record with a correct type/length header around `payload`.
    pub fn raw_record(mut self, entry_type: u8, payload: &[u8]) -> Self {
        self.records.push(entry_type);
        self.records.push((payload.len() + 2) as u8);
        self.records.extend_from_slice(payload);
        self
    }

    /// Bytes appended as-is, for malformed records.
    pub fn raw_bytes(mut self, bytes: &[u8]) -> Self {
        self.records.extend_from_slice(bytes);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(8 + self.records.len());
        // Local interrupt controller address and flags are unused on RISC-V.
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&self.records);
        finish_table(*MADT_SIGNATURE, 6, &body)
    }
}

pub struct RhctBuilder {
    nodes: Vec<u8>,
    node_count: u32,
    node_count_override: Option<u32>,
    time_base_frequency: u64,
}

impl Default for RhctBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RhctBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            node_count: 0,
            node_count_override: None,
            time_base_frequency: 10_000_000,
        }
    }

    pub fn time_base_frequency(&mut self, hz: u64) -> &mut Self {
        self.time_base_frequency = hz;
        self
    }

    /// Force the header's node count.
    pub fn node_count_override(&mut self, count: u32) -> &mut Self {
        self.node_count_override = Some(count);
        self
    }

    fn next_offset(&self) -> u32 {
        (RHCT_HEADER_LEN + self.nodes.len()) as u32
    }

    /// A node with a correct header around `payload`. Returns its offset.
    pub fn raw_node(&mut self, node_type: u16, payload: &[u8]) -> u32 {
        let offset = self.next_offset();
        let length = (RHCT_NODE_HEADER_LEN + payload.len()) as u16;
        self.nodes.extend_from_slice(&node_type.to_le_bytes());
        self.nodes.extend_from_slice(&length.to_le_bytes());
        self.nodes.extend_from_slice(&1u16.to_le_bytes());
        self.nodes.extend_from_slice(payload);
        self.node_count += 1;
        offset
    }

    /// Bytes appended as-is; not counted as a node.
    pub fn raw_bytes(&mut self, bytes: &[u8]) -> u32 {
        let offset = self.next_offset();
        self.nodes.extend_from_slice(bytes);
        offset
    }

    /// ISA string node. The stored length includes a NUL terminator and the
    /// node is padded to an even length.
    pub fn isa_string(&mut self, isa: &str) -> u32 {
        self.isa_bytes(isa.as_bytes())
    }

    pub fn isa_bytes(&mut self, isa: &[u8]) -> u32 {
        let isa_len = (isa.len() + 1) as u16;
        let mut payload = Vec::with_capacity(isa.len() + 4);
        payload.extend_from_slice(&isa_len.to_le_bytes());
        payload.extend_from_slice(isa);
        payload.push(0);
        if payload.len() % 2 != 0 {
            payload.push(0);
        }
        self.raw_node(RHCT_NODE_ISA_STRING, &payload)
    }

    pub fn cmo(&mut self, cbom: u8, cbop: u8, cboz: u8) -> u32 {
        self.raw_node(RHCT_NODE_CMO, &[0, cbom, cbop, cboz])
    }

    pub fn mmu(&mut self, mmu_type: u8) -> u32 {
        self.raw_node(RHCT_NODE_MMU, &[0, mmu_type])
    }

    pub fn hart_info(&mut self, uid: u32, offsets: &[u32]) -> u32 {
        let mut payload = Vec::with_capacity(6 + offsets.len() * 4);
        payload.extend_from_slice(&(offsets.len() as u16).to_le_bytes());
        payload.extend_from_slice(&uid.to_le_bytes());
        for offset in offsets {
            payload.extend_from_slice(&offset.to_le_bytes());
        }
        self.raw_node(RHCT_NODE_HART_INFO, &payload)
    }

    pub fn build(&self) -> Vec<u8> {
        let count = self.node_count_override.unwrap_or(self.node_count);
        let mut body = Vec::with_capacity(RHCT_HEADER_LEN - SDT_HEADER_LEN + self.nodes.len());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&self.time_base_frequency.to_le_bytes());
        body.extend_from_slice(&count.to_le_bytes());
        body.extend_from_slice(&(RHCT_HEADER_LEN as u32).to_le_bytes());
        body.extend_from_slice(&self.nodes);
        finish_table(*RHCT_SIGNATURE, 1, &body)
    }
}

/// One hart for [`platform_tables`].
#[derive(Clone, Copy, Debug)]
pub struct FixtureHart<'a> {
    pub hart_id: u64,
    pub uid: u32,
    pub flags: u32,
    pub isa: &'a str,
}

/// A matching MADT/RHCT pair: one RINTC per hart and one hart-info node per
/// hart pointing at its own ISA string plus a shared MMU node.
pub fn platform_tables(harts: &[FixtureHart<'_>]) -> (Vec<u8>, Vec<u8>) {
    let mut madt = MadtBuilder::new();
    let mut rhct = RhctBuilder::new();
    let mmu = rhct.mmu(0);
    for hart in harts {
        madt = madt.rintc(RintcRecord {
            ext_intc_id: hart.uid,
            imsic_base: 0x2800_0000 + u64::from(hart.uid) * 0x1000,
            imsic_size: 0x1000,
            ..RintcRecord::new(hart.hart_id, hart.uid, hart.flags)
        });
        let isa = rhct.isa_string(hart.isa);
        rhct.hart_info(hart.uid, &[isa, mmu]);
    }
    (madt.build(), rhct.build())
}
