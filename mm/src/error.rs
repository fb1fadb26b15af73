//! Error type for arena and platform heap operations.

use core::fmt;

/// Arena allocation error.
///
/// Every variant is reported before the arena cursor moves: a failed call
/// leaves the arena exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    /// Alignment is not a power of two, or the requested size is zero.
    InvalidArgument,
    /// The padded request does not fit in the remaining range.
    OutOfSpace { requested: usize, remaining: usize },
    /// `init` was called on an arena that already has a range.
    AlreadyInitialized,
    /// The range `base..base + size` wraps the address space.
    RegionOverflow { base: usize, size: usize },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => {
                write!(f, "alignment must be a power of two and size non-zero")
            }
            Self::OutOfSpace {
                requested,
                remaining,
            } => write!(
                f,
                "arena exhausted: {:#x} bytes requested, {:#x} remaining",
                requested, remaining
            ),
            Self::AlreadyInitialized => write!(f, "arena already initialized"),
            Self::RegionOverflow { base, size } => {
                write!(f, "region {:#x}+{:#x} overflows the address space", base, size)
            }
        }
    }
}

/// Convenience result type for arena operations.
pub type ArenaResult<T = ()> = Result<T, ArenaError>;
