//! ACPI table parsing for the hartpal platform layer.
//!
//! Zero-allocation parsers over firmware-owned table bytes. Every read goes
//! through [`tables::AcpiTable`], which confines offsets to the table's
//! declared length, so a malformed table yields malformed records instead of
//! out-of-bounds reads.
//!
//! # Architecture
//!
//! - [`tables`]: SDT header decoding and the bounds-checked table view.
//! - [`madt`]: MADT (Multiple APIC Description Table) record iteration, RINTC decoding.
//! - [`rhct`]: RHCT (RISC-V Hart Capabilities Table) node walking.
//!
//! # Usage
//!
//! ```ignore
//! use hartpal_acpi::madt::{Madt, MadtEntry};
//! use hartpal_acpi::rhct::Rhct;
//!
//! let madt = Madt::parse(madt_bytes)?;
//! let rhct = Rhct::parse(rhct_bytes)?;
//!
//! for entry in madt.entries() {
//!     if let MadtEntry::Rintc(hart) = entry {
//!         let info = rhct.find_hart_info(hart.acpi_processor_uid);
//!     }
//! }
//! ```

#![cfg_attr(not(test), no_std)]

#[cfg(any(test, feature = "test-fixtures"))]
extern crate alloc;

pub mod madt;
pub mod rhct;
pub mod tables;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod test_fixtures;

pub use tables::{AcpiTable, TableError};
