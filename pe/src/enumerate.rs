//! Build the PE info table from the MADT and RHCT.
//!
//! Every usable RINTC record becomes one entry, numbered in MADT order. The
//! RHCT hart-info nodes whose UID matches the record supply its ISA string.
//! Record-level problems are logged and skipped; only a missing or
//! structurally broken table aborts the build.

use hartpal_acpi::madt::{Madt, MadtEntry, RintcFlags, RintcInfo};
use hartpal_acpi::rhct::{CmoInfo, Rhct, RhctNode};
use hartpal_acpi::{AcpiTable, TableError};
use hartpal_lib::string::copy_bounded;
use hartpal_lib::{
    CacheOp, CachePublish, FirmwareTables, klog_debug, klog_error, klog_info, klog_trace,
    klog_warn, publish_object,
};

use crate::error::{PeError, PeResult, TableKind};
use crate::pe_info::{ISA_STRING_CAPACITY, PeInfoEntry, PeInfoTable};

fn present<'a>(bytes: Option<&'a [u8]>, kind: TableKind) -> PeResult<&'a [u8]> {
    bytes.ok_or_else(|| {
        klog_error!("PE: {} not found", kind);
        PeError::MissingTable(kind)
    })
}

fn invalid(kind: TableKind) -> impl FnOnce(TableError) -> PeError {
    move |error| {
        klog_error!("PE: {} rejected: {}", kind, error);
        PeError::InvalidTable { kind, error }
    }
}

fn log_table(kind: TableKind, table: AcpiTable<'_>) {
    klog_info!(
        "PE: {} at {:#x}, length {:#x}",
        kind,
        table.as_bytes().as_ptr() as usize,
        table.len()
    );
    if !table.checksum_valid() {
        klog_warn!("PE: {} checksum mismatch, continuing", kind);
    }
}

/// Fill `table` from the firmware tables and publish it.
///
/// Returns the number of entries written. `table` is reset first, so on
/// `MissingTable` or `InvalidTable` it is left empty. On `OutOfCapacity`
/// the first `N` usable harts are kept and the table is still published.
pub fn build_pe_table<const N: usize, P>(
    madt: Option<&[u8]>,
    rhct: Option<&[u8]>,
    table: &mut PeInfoTable<N>,
    publisher: &P,
) -> PeResult<u32>
where
    P: CachePublish + ?Sized,
{
    table.reset();

    let madt_bytes = present(madt, TableKind::Madt)?;
    let rhct_bytes = present(rhct, TableKind::Rhct)?;
    let madt = Madt::parse(madt_bytes).map_err(invalid(TableKind::Madt))?;
    let rhct = Rhct::parse(rhct_bytes).map_err(invalid(TableKind::Rhct))?;
    log_table(TableKind::Madt, madt.table());
    log_table(TableKind::Rhct, rhct.table());

    let mut overflow = false;
    for entry in madt.entries() {
        let hart = match entry {
            MadtEntry::Rintc(hart) => hart,
            MadtEntry::Other {
                offset,
                entry_type,
                length,
            } => {
                klog_trace!(
                    "PE: MADT record type {:#x} (len {}) at {:#x} ignored",
                    entry_type,
                    length,
                    offset
                );
                continue;
            }
            MadtEntry::Malformed {
                offset,
                entry_type,
                length,
            } => {
                klog_warn!(
                    "PE: malformed MADT record type {:#x} len {} at {:#x}",
                    entry_type,
                    length,
                    offset
                );
                continue;
            }
        };

        klog_debug!(
            "PE: RINTC flags {:#x}: enabled {}, online capable {}",
            hart.flags.bits(),
            hart.flags.contains(RintcFlags::ENABLED),
            hart.flags.contains(RintcFlags::ONLINE_CAPABLE)
        );
        if !hart.flags.is_usable() {
            klog_debug!("PE: hart {:#x} not usable, skipped", hart.hart_id);
            continue;
        }

        let slot = match table.push() {
            Ok(slot) => slot,
            Err(err) => {
                klog_error!("PE: hart {:#x} dropped: {}", hart.hart_id, err);
                overflow = true;
                break;
            }
        };
        fill_entry(slot, &hart, &rhct);
        publish_object(publisher, &*slot, CacheOp::CleanAndInvalidate);
    }

    let count = table.num_of_pe();
    publish_object(publisher, &*table, CacheOp::CleanAndInvalidate);
    klog_info!("PE: {} usable harts", count);

    if overflow {
        return Err(PeError::OutOfCapacity { capacity: N });
    }
    Ok(count)
}

/// [`build_pe_table`] over the tables `firmware` provides.
pub fn create_info_table<const N: usize, F, P>(
    firmware: &F,
    publisher: &P,
    table: &mut PeInfoTable<N>,
) -> PeResult<u32>
where
    F: FirmwareTables + ?Sized,
    P: CachePublish + ?Sized,
{
    build_pe_table(firmware.madt(), firmware.rhct(), table, publisher)
}

fn fill_entry(entry: &mut PeInfoEntry, hart: &RintcInfo, rhct: &Rhct<'_>) {
    entry.hart_id = hart.hart_id;
    entry.acpi_processor_uid = hart.acpi_processor_uid;
    entry.ext_intc_id = hart.ext_intc_id;
    entry.imsic_base = hart.imsic_base;
    entry.imsic_size = hart.imsic_size;
    klog_debug!(
        "PE: hart {:#x} -> pe {}, uid {}, IMSIC {:#x}+{:#x}",
        entry.hart_id,
        entry.pe_num,
        entry.acpi_processor_uid,
        entry.imsic_base,
        entry.imsic_size
    );

    let mut described = false;
    for (_, node) in rhct.nodes() {
        let RhctNode::HartInfo(info) = node else {
            continue;
        };
        if info.uid() != hart.acpi_processor_uid {
            continue;
        }
        described = true;
        klog_debug!("PE:   hart info at {:#x}", info.offset());

        for (offset, related) in info.related_nodes() {
            match related {
                RhctNode::IsaString(isa) => {
                    // A string that fills the buffer leaves no room for the NUL.
                    if isa.len() >= ISA_STRING_CAPACITY {
                        klog_error!(
                            "PE:   ISA string size overflow {} (capacity {})",
                            isa.len(),
                            ISA_STRING_CAPACITY
                        );
                    }
                    copy_bounded(&mut entry.isa_string, isa);
                    klog_info!("PE:   ISA string: {}", entry.isa_str());
                }
                RhctNode::Cmo(cmo) => klog_info!(
                    "PE:   CMO: cbom {} cbop {} cboz {} bytes",
                    CmoInfo::block_bytes(cmo.cbom_size),
                    CmoInfo::block_bytes(cmo.cbop_size),
                    CmoInfo::block_bytes(cmo.cboz_size)
                ),
                RhctNode::Mmu(mmu) => klog_info!("PE:   MMU: {}", mmu.mmu_type.as_str()),
                RhctNode::HartInfo(_) => {
                    klog_info!("PE:   hart info node at {:#x} listed as related", offset)
                }
                RhctNode::Unknown { node_type, .. } => {
                    klog_info!("PE:   unknown node type {} at {:#x}", node_type, offset)
                }
                RhctNode::Malformed { .. } => {
                    klog_warn!("PE:   bad RHCT node offset {:#x}", offset)
                }
            }
        }
    }

    if !described {
        klog_warn!(
            "PE: no RHCT hart info for uid {}, ISA unknown",
            hart.acpi_processor_uid
        );
    }
}
