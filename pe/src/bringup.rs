//! Platform bring-up: discover harts, then size and carve their stacks.

use hartpal_lib::{CachePublish, FirmwareTables, klog_info, klog_warn};
use hartpal_mm::Arena;

use crate::enumerate::create_info_table;
use crate::error::PeResult;
use crate::pe_info::PeInfoTable;
use crate::secondary_stack::{RoutingId, SecondaryStacks};

/// What bring-up established.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BringUp {
    pub num_of_pe: u32,
    /// Per-field maximum over every discovered hart id.
    pub routing_id: RoutingId,
    /// Aligned base of the secondary stacks; `None` if they could not be
    /// allocated.
    pub stack_base: Option<usize>,
}

/// Build the PE table and provision secondary stacks sized from it.
///
/// Enumeration errors abort. A failed stack allocation is logged and
/// reported as `stack_base: None`.
///
/// # Safety
///
/// Addresses handed out by `arena` must be writable memory.
pub unsafe fn bring_up<const N: usize, F, P>(
    firmware: &F,
    publisher: &P,
    arena: &mut Arena,
    table: &mut PeInfoTable<N>,
    stacks: &mut SecondaryStacks,
) -> PeResult<BringUp>
where
    F: FirmwareTables + ?Sized,
    P: CachePublish + ?Sized,
{
    let num_of_pe = create_info_table(firmware, publisher, table)?;
    let routing_id = table.max_routing_id();

    // SAFETY: forwarded from the caller.
    let stack_base = match unsafe { stacks.provision(arena, routing_id, publisher) } {
        Ok(base) => Some(base),
        Err(err) => {
            klog_warn!("PE: continuing without secondary stacks: {}", err);
            None
        }
    };

    klog_info!(
        "PE: bring-up done, {} harts, routing id max {:#x}",
        num_of_pe,
        routing_id.raw()
    );
    Ok(BringUp {
        num_of_pe,
        routing_id,
        stack_base,
    })
}
