/// Extract a NUL-padded byte array as a `&str`.
///
/// Scans for the first NUL byte (or end of slice) and interprets the
/// prefix as UTF-8. Returns `"<invalid>"` if the bytes are not valid
/// UTF-8, or `""` if the buffer starts with NUL / is empty. Used for
/// ACPI signatures and OEM identifiers, which are fixed-width ASCII.
#[inline]
pub fn bytes_as_str(buf: &[u8]) -> &str {
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    core::str::from_utf8(&buf[..len]).unwrap_or("<invalid>")
}

/// Narrow a UCS-2 string into `dst` as ASCII.
///
/// Stops at the first NUL code unit, the end of `src`, or when `dst` is
/// full. Code units outside 7-bit ASCII become `?`. Returns the written
/// prefix of `dst`.
pub fn ucs2_to_ascii<'a>(src: &[u16], dst: &'a mut [u8]) -> &'a str {
    let mut len = 0;
    for (&unit, slot) in src.iter().take_while(|&&unit| unit != 0).zip(dst.iter_mut()) {
        *slot = if unit < 0x80 { unit as u8 } else { b'?' };
        len += 1;
    }
    // Every byte written above is 7-bit ASCII.
    core::str::from_utf8(&dst[..len]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_as_str_signature() {
        assert_eq!(bytes_as_str(b"HEST"), "HEST");
        assert_eq!(bytes_as_str(b"BOCHS\0"), "BOCHS");
        assert_eq!(bytes_as_str(&[0, b'A']), "");
        assert_eq!(bytes_as_str(&[0xFF, 0xFE]), "<invalid>");
    }

    #[test]
    fn test_ucs2_to_ascii() {
        let src: [u16; 8] = [
            'a' as u16, '=' as u16, '1' as u16, 0x00E9, ' ' as u16, 'b' as u16, 0, 'x' as u16,
        ];
        let mut buf = [0u8; 16];
        assert_eq!(ucs2_to_ascii(&src, &mut buf), "a=1? b");

        let mut small = [0u8; 3];
        assert_eq!(ucs2_to_ascii(&src, &mut small), "a=1");
    }
}
