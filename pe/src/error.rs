//! Error type for processing-element discovery.

use core::fmt;

use hartpal_acpi::TableError;

/// Which firmware table an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Madt,
    Rhct,
}

impl TableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Madt => "MADT",
            Self::Rhct => "RHCT",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PE table construction error.
///
/// `MissingTable` and `InvalidTable` leave the PE table empty.
/// `OutOfCapacity` leaves every entry accepted before the table filled up
/// in place, with `num_of_pe` matching them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeError {
    /// Firmware did not provide the table.
    MissingTable(TableKind),
    /// The table is present but its header cannot be trusted.
    InvalidTable { kind: TableKind, error: TableError },
    /// Firmware describes more usable harts than the PE table holds.
    OutOfCapacity { capacity: usize },
}

impl fmt::Display for PeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTable(kind) => write!(f, "{} not found", kind),
            Self::InvalidTable { kind, error } => write!(f, "invalid {}: {}", kind, error),
            Self::OutOfCapacity { capacity } => {
                write!(f, "more usable harts than the PE table holds ({})", capacity)
            }
        }
    }
}

pub type PeResult<T = ()> = Result<T, PeError>;
