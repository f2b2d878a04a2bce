//! Planning of 2D data texture shapes.
//!
//! GPU data textures are two dimensional, so a linear array of `n` items is
//! packed into a `width x height` texel grid. The shader decodes texel
//! coordinates from an item index with this exact packing, so the shape
//! must be reproduced bit for bit.

use crate::error::{Result, UnrayError};

/// Computes a near-square `[width, height]` texel grid holding `n` items.
///
/// `width` is the largest power of two not exceeding `sqrt(n)` and
/// `height = ceil(n / width)`, which guarantees `width * height >= n` with
/// less than one row of padding.
pub fn compute_texture_shape(n: usize) -> Result<[u32; 2]> {
    if n == 0 {
        return Err(UnrayError::InvalidSize(n));
    }
    // floor(log2(n) / 2) == floor(floor(log2(n)) / 2)
    let log2 = n.ilog2();
    let width = 1usize << (log2 / 2);
    let height = n.div_ceil(width);
    let to_u32 = |v: usize| u32::try_from(v).map_err(|_| UnrayError::InvalidSize(n));
    Ok([to_u32(width)?, to_u32(height)?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_shapes() {
        assert_eq!(compute_texture_shape(1).unwrap(), [1, 1]);
        assert_eq!(compute_texture_shape(2).unwrap(), [1, 2]);
        assert_eq!(compute_texture_shape(5).unwrap(), [2, 3]);
        assert_eq!(compute_texture_shape(16).unwrap(), [4, 4]);
        assert_eq!(compute_texture_shape(17).unwrap(), [4, 5]);
    }

    #[test]
    fn test_zero_is_invalid() {
        assert!(matches!(
            compute_texture_shape(0),
            Err(UnrayError::InvalidSize(0))
        ));
    }

    proptest! {
        #[test]
        fn prop_shape_holds_items_without_waste(n in 1usize..10_000_000) {
            let [w, h] = compute_texture_shape(n).unwrap();
            let (w, h) = (w as usize, h as usize);
            prop_assert!(w.is_power_of_two());
            prop_assert!(w * h >= n);
            prop_assert!(w * h < n + w);
            prop_assert!(w * w <= n);
        }
    }
}
