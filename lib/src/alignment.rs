/// Generate `align_down_$suffix`, `align_up_$suffix` and `is_aligned_$suffix`
/// for a given integer type.
///
/// All three treat `alignment == 0` as "no constraint".
/// `align_up` uses saturating arithmetic to prevent overflow.
macro_rules! impl_align_fns {
    ($ty:ty, $suffix:ident) => {
        paste::paste! {
            /// Align `value` down to the nearest multiple of `alignment`.
            /// If `alignment` is zero, the input is returned unchanged.
            #[inline(always)]
            pub const fn [<align_down_ $suffix>](value: $ty, alignment: $ty) -> $ty {
                if alignment == 0 {
                    return value;
                }
                value & !(alignment - 1)
            }

            /// Align `value` up to the nearest multiple of `alignment`.
            /// If `alignment` is zero, the input is returned unchanged.
            /// Uses saturating arithmetic to prevent overflow.
            #[inline(always)]
            pub const fn [<align_up_ $suffix>](value: $ty, alignment: $ty) -> $ty {
                if alignment == 0 {
                    return value;
                }
                let adjusted = value.saturating_add(alignment - 1);
                adjusted & !(alignment - 1)
            }

            /// Whether `value` is a multiple of the power-of-two `alignment`.
            #[inline(always)]
            pub const fn [<is_aligned_ $suffix>](value: $ty, alignment: $ty) -> bool {
                if alignment == 0 {
                    return true;
                }
                value & (alignment - 1) == 0
            }
        }
    };
}

impl_align_fns!(u64, u64);
impl_align_fns!(usize, usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_next_boundary() {
        assert_eq!(align_up_usize(0x1001, 16), 0x1010);
        assert_eq!(align_up_usize(0x1000, 16), 0x1000);
        assert_eq!(align_up_u64(7, 8), 8);
    }

    #[test]
    fn align_down_truncates() {
        assert_eq!(align_down_usize(0x100f, 16), 0x1000);
        assert_eq!(align_down_u64(0xfff, 0x1000), 0);
    }

    #[test]
    fn zero_alignment_is_identity() {
        assert_eq!(align_up_usize(13, 0), 13);
        assert_eq!(align_down_usize(13, 0), 13);
        assert!(is_aligned_usize(13, 0));
    }

    #[test]
    fn align_up_saturates_near_max() {
        assert_eq!(align_up_u64(u64::MAX - 1, 16), u64::MAX & !15);
    }

    #[test]
    fn is_aligned_checks_low_bits() {
        assert!(is_aligned_usize(0x1078, 8));
        assert!(!is_aligned_usize(0x1078, 16));
        assert!(is_aligned_u64(0x4000, 0x1000));
    }
}
