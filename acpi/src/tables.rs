use core::fmt;
use core::mem;
use core::ptr::{self, read_unaligned};
use core::slice;

/// Size of the common System Description Table header.
pub const SDT_HEADER_LEN: usize = mem::size_of::<SdtHeader>();

const SDT_LENGTH_OFFSET: usize = 4;

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct SdtHeader {
    pub signature: [u8; 4],
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: u32,
    pub creator_revision: u32,
}

/// Structural problems that make a whole table unusable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableError {
    /// Fewer bytes than the table's fixed header.
    TooShort { length: usize, minimum: usize },
    /// The header declares more bytes than were supplied.
    Truncated { declared: usize, available: usize },
    BadSignature { expected: [u8; 4], found: [u8; 4] },
}

fn signature_str(sig: &[u8; 4]) -> &str {
    core::str::from_utf8(sig).unwrap_or("????")
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { length, minimum } => {
                write!(f, "table too short ({} bytes, minimum {})", length, minimum)
            }
            Self::Truncated {
                declared,
                available,
            } => write!(
                f,
                "table declares {} bytes but only {} are mapped",
                declared, available
            ),
            Self::BadSignature { expected, found } => write!(
                f,
                "expected signature {}, found {}",
                signature_str(expected),
                signature_str(found)
            ),
        }
    }
}

/// Bounds-checked view of one ACPI table.
///
/// The view covers exactly the header's declared length. All accessors take
/// offsets relative to the table base and return `None` for any range that
/// leaves the table, so record walkers never need pointer arithmetic.
#[derive(Clone, Copy)]
pub struct AcpiTable<'a> {
    bytes: &'a [u8],
}

impl<'a> AcpiTable<'a> {
    /// Validate the SDT header and clamp the view to its declared length.
    pub fn new(bytes: &'a [u8]) -> Result<Self, TableError> {
        if bytes.len() < SDT_HEADER_LEN {
            return Err(TableError::TooShort {
                length: bytes.len(),
                minimum: SDT_HEADER_LEN,
            });
        }
        let declared = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        if declared < SDT_HEADER_LEN {
            return Err(TableError::TooShort {
                length: declared,
                minimum: SDT_HEADER_LEN,
            });
        }
        if declared > bytes.len() {
            return Err(TableError::Truncated {
                declared,
                available: bytes.len(),
            });
        }
        Ok(Self {
            bytes: &bytes[..declared],
        })
    }

    /// Like [`new`](Self::new), additionally requiring a signature and a
    /// table-specific minimum length.
    pub fn with_signature(
        bytes: &'a [u8],
        signature: &[u8; 4],
        minimum: usize,
    ) -> Result<Self, TableError> {
        let table = Self::new(bytes)?;
        let found = table.signature();
        if found != *signature {
            return Err(TableError::BadSignature {
                expected: *signature,
                found,
            });
        }
        if table.len() < minimum {
            return Err(TableError::TooShort {
                length: table.len(),
                minimum,
            });
        }
        Ok(table)
    }

    /// Borrow a firmware table in place, sized by its own header.
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to an ACPI table whose header and full
    /// declared length are readable for `'a` and not written meanwhile.
    pub unsafe fn from_raw(ptr: *const u8) -> Option<&'a [u8]> {
        if ptr.is_null() {
            return None;
        }
        let length = unsafe { read_unaligned(ptr.add(SDT_LENGTH_OFFSET) as *const u32) } as usize;
        let length = length.max(SDT_HEADER_LEN);
        Some(unsafe { slice::from_raw_parts(ptr, length) })
    }

    pub fn header(&self) -> SdtHeader {
        // SAFETY: `new` guarantees at least SDT_HEADER_LEN bytes and the
        // header is plain integers, valid for any bit pattern.
        unsafe { ptr::read_unaligned(self.bytes.as_ptr() as *const SdtHeader) }
    }

    pub fn signature(&self) -> [u8; 4] {
        [self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]]
    }

    /// Declared table length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Whether all table bytes sum to zero, as ACPI requires.
    pub fn checksum_valid(&self) -> bool {
        self.bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b)) == 0
    }

    /// `len` bytes starting at `offset`, if they lie inside the table.
    #[inline]
    pub fn bytes(&self, offset: usize, len: usize) -> Option<&'a [u8]> {
        let end = offset.checked_add(len)?;
        self.bytes.get(offset..end)
    }

    #[inline]
    pub fn read_u8(&self, offset: usize) -> Option<u8> {
        self.bytes.get(offset).copied()
    }

    #[inline]
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let raw = self.bytes(offset, 2)?;
        Some(u16::from_le_bytes([raw[0], raw[1]]))
    }

    #[inline]
    pub fn read_u32(&self, offset: usize) -> Option<u32> {
        let raw = self.bytes(offset, 4)?;
        Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    #[inline]
    pub fn read_u64(&self, offset: usize) -> Option<u64> {
        let raw = self.bytes(offset, 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        Some(u64::from_le_bytes(buf))
    }
}
