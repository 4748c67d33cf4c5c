//! Power-of-two alignment for page arithmetic.

/// Rounds `value` up to `alignment`, saturating at the highest aligned value
/// instead of wrapping to zero. An alignment of zero leaves `value` unchanged.
#[inline(always)]
pub const fn align_up_u64(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    value.saturating_add(alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up_pages() {
        assert_eq!(align_up_u64(0x10000, 0x1000), 0x10000);
        assert_eq!(align_up_u64(0x10001, 0x1000), 0x11000);
        assert_eq!(align_up_u64(1, 0), 1);
        assert_eq!(align_up_u64(u64::MAX, 0x1000), u64::MAX & !0xFFF);
    }
}
