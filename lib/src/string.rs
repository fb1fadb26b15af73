/// Extract a NUL-padded byte array as a `&str`.
///
/// Scans for the first NUL byte (or end of slice) and interprets the
/// prefix as UTF-8. Returns `"<invalid>"` if the bytes are not valid
/// UTF-8, or `""` if the buffer starts with NUL / is empty.
#[inline]
pub fn bytes_as_str(buf: &[u8]) -> &str {
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    core::str::from_utf8(&buf[..len]).unwrap_or("<invalid>")
}

/// Copy `src` into the fixed buffer `dst`, truncating to `dst.len()`.
///
/// Bytes of `dst` past the copied prefix are zeroed. Returns the number of
/// bytes copied; a return value smaller than `src.len()` means truncation.
#[inline]
pub fn copy_bounded(dst: &mut [u8], src: &[u8]) -> usize {
    let copied = src.len().min(dst.len());
    dst[..copied].copy_from_slice(&src[..copied]);
    dst[copied..].fill(0);
    copied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_first_nul() {
        assert_eq!(bytes_as_str(b"rv64imac\0\0\0"), "rv64imac");
        assert_eq!(bytes_as_str(b"\0rv64"), "");
        assert_eq!(bytes_as_str(b"rv64gc"), "rv64gc");
        assert_eq!(bytes_as_str(&[0xff, 0xfe]), "<invalid>");
    }

    #[test]
    fn copy_bounded_truncates_and_clears_tail() {
        let mut buf = [0xaau8; 4];
        assert_eq!(copy_bounded(&mut buf, b"rv"), 2);
        assert_eq!(buf, [b'r', b'v', 0, 0]);

        assert_eq!(copy_bounded(&mut buf, b"rv64gc"), 4);
        assert_eq!(&buf, b"rv64");
    }
}
