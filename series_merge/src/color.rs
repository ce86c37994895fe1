//! Series color identity
//!
//! Each series receives an index into a fixed palette once, by its position in
//! the result set. The palette is reused cyclically, so the index is stable
//! even when there are more series than colors.

use std::num::NonZeroUsize;

/// The default palette, in assignment order.
pub const DEFAULT_PALETTE: [&str; 15] = [
    "#5794f2", "#73bf69", "#ff9830", "#f2495c", "#8a2be2", "#00ced1", "#ff1493", "#32cd32",
    "#ffeb3b", "#00ffff", "#ff69b4", "#7b68ee", "#20b2aa", "#ff6347", "#ba55d3",
];

/// Palette index for the series at `series_index` (0-based, first-appearance
/// order).
#[inline]
#[must_use]
pub fn color_index_for(series_index: usize, palette_len: NonZeroUsize) -> usize {
    series_index % palette_len.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cycles_through_default_palette() {
        let len = NonZeroUsize::new(DEFAULT_PALETTE.len()).expect("non-empty");
        assert_eq!(color_index_for(0, len), 0);
        assert_eq!(color_index_for(14, len), 14);
        assert_eq!(color_index_for(15, len), 0);
        assert_eq!(color_index_for(31, len), 1);
    }

    proptest! {
        #[test]
        fn always_in_palette(index in any::<usize>(), len in 1usize..64) {
            let len = NonZeroUsize::new(len).expect("non-zero");
            let color = color_index_for(index, len);
            prop_assert!(color < len.get());
            prop_assert_eq!(color, index % len.get());
        }
    }
}
