//! Processing-element discovery for the hartpal platform layer.
//!
//! - [`pe_info`]: the caller-owned, fixed-layout PE table.
//! - [`enumerate`]: fills the table from the MADT and RHCT.
//! - [`secondary_stack`]: routing ids and the secondary stack region.
//! - [`bringup`]: the discover-then-provision sequence.

#![cfg_attr(not(test), no_std)]

pub mod bringup;
pub mod enumerate;
pub mod error;
pub mod pe_info;
pub mod secondary_stack;

pub use bringup::{BringUp, bring_up};
pub use enumerate::{build_pe_table, create_info_table};
pub use error::{PeError, PeResult, TableKind};
pub use pe_info::{ISA_STRING_CAPACITY, PeInfoEntry, PeInfoHeader, PeInfoTable};
pub use secondary_stack::{RoutingId, SECONDARY_STACK_SIZE, STACK_ALIGNMENT, SecondaryStacks};
