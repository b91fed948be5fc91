//! Attribute word
//!
//! The native attribute word packs a color-pair index and rendition flags
//! above the character text bits. Offsets follow the library header's
//! `NCURSES_BITS(mask, shift)` convention, which shifts every field past the
//! 8 bits of `A_CHARTEXT`: the color-pair index is `NCURSES_BITS(0xff, 0)`
//! and the flags start at `NCURSES_BITS(1, 8)`.

use bitflags::bitflags;

/// Width of the character text field below all attribute bits
pub const ATTR_SHIFT: u32 = 8;

/// `NCURSES_BITS(mask, shift)`
pub const fn ncurses_bits(mask: u32, shift: u32) -> u32 {
    mask << (shift + ATTR_SHIFT)
}

pub const A_NORMAL: u32 = 0;
pub const A_ATTRIBUTES: u32 = ncurses_bits(!0, 0);
pub const A_CHARTEXT: u32 = ncurses_bits(1, 0) - 1;
pub const A_COLOR: u32 = ncurses_bits((1 << 8) - 1, 0);

/// Largest pair index the packed color field can hold
pub const MAX_PACKED_PAIR: u16 = 255;

bitflags! {
    /// Rendition flags of the attribute word.
    ///
    /// Unknown bits are retained, so a caller-supplied word passes through
    /// the codec untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u32 {
        const STANDOUT   = ncurses_bits(1, 8);
        const UNDERLINE  = ncurses_bits(1, 9);
        const REVERSE    = ncurses_bits(1, 10);
        const BLINK      = ncurses_bits(1, 11);
        const DIM        = ncurses_bits(1, 12);
        const BOLD       = ncurses_bits(1, 13);
        const ALTCHARSET = ncurses_bits(1, 14);
        const INVIS      = ncurses_bits(1, 15);
        const PROTECT    = ncurses_bits(1, 16);
        const HORIZONTAL = ncurses_bits(1, 17);
        const LEFT       = ncurses_bits(1, 18);
        const LOW        = ncurses_bits(1, 19);
        const RIGHT      = ncurses_bits(1, 20);
        const TOP        = ncurses_bits(1, 21);
        const VERTICAL   = ncurses_bits(1, 22);
        const ITALIC     = ncurses_bits(1, 23);
    }
}

impl Attr {
    /// Wrap a raw attribute word without validating it
    pub const fn from_word(word: u32) -> Self {
        Self::from_bits_retain(word)
    }

    /// Attribute word holding only the given color pair
    pub const fn with_pair(pair: u16) -> Self {
        Self::from_bits_retain(color_pair(pair))
    }

    /// Color-pair index carried in the packed field
    pub const fn pair(self) -> u16 {
        pair_number(self.bits())
    }

    /// The word with the packed color field cleared
    pub const fn without_color(self) -> Self {
        Self::from_bits_retain(self.bits() & !A_COLOR)
    }
}

/// `COLOR_PAIR(n)`, saturating at [`MAX_PACKED_PAIR`].
///
/// Pairs above 255 are carried in the cell's `ext_color` field; the packed
/// field keeps the saturated sentinel.
pub const fn color_pair(pair: u16) -> u32 {
    let packed = if pair > MAX_PACKED_PAIR {
        MAX_PACKED_PAIR
    } else {
        pair
    };
    ncurses_bits(packed as u32, 0) & A_COLOR
}

/// `PAIR_NUMBER(attr)`
pub const fn pair_number(word: u32) -> u16 {
    ((word & A_COLOR) >> ATTR_SHIFT) as u16
}

/// Fold an optional color pair into an attribute word.
///
/// Returns the attribute word and the `ext_color` value. Without a pair the
/// caller's word is kept as is, including any color bits it already carries.
pub const fn fold_color(attrs: Attr, pair: Option<u16>) -> (u32, i32) {
    match pair {
        Some(pair) => (attrs.without_color().bits() | color_pair(pair), pair as i32),
        None => (attrs.bits(), 0),
    }
}

/// Recover attributes and color pair from an attribute word and `ext_color`
pub const fn unfold_color(word: u32, ext_color: i32) -> (Attr, u16) {
    let pair = if ext_color > 0 && ext_color <= u16::MAX as i32 {
        ext_color as u16
    } else {
        pair_number(word)
    };
    (Attr::from_bits_retain(word).without_color(), pair)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks() {
        assert_eq!(A_CHARTEXT, 0x0000_00ff);
        assert_eq!(A_COLOR, 0x0000_ff00);
        assert_eq!(A_ATTRIBUTES, 0xffff_ff00);
        assert_eq!(Attr::STANDOUT.bits(), 1 << 16);
        assert_eq!(Attr::BOLD.bits(), 1 << 21);
        assert_eq!(Attr::ITALIC.bits(), 1 << 31);
    }

    #[test]
    fn test_flags_do_not_overlap_color() {
        assert_eq!(Attr::all().bits() & A_COLOR, 0);
        assert_eq!(Attr::all().bits() & A_CHARTEXT, 0);
    }

    #[test]
    fn test_color_pair_round_trip() {
        for pair in [0u16, 1, 3, 200, 255] {
            assert_eq!(pair_number(color_pair(pair)), pair);
        }
    }

    #[test]
    fn test_color_pair_saturates() {
        assert_eq!(pair_number(color_pair(256)), 255);
        assert_eq!(pair_number(color_pair(u16::MAX)), 255);
    }

    #[test]
    fn test_fold_extended_pair() {
        let (word, ext) = fold_color(Attr::BOLD, Some(300));
        assert_eq!(pair_number(word), 255);
        assert_eq!(ext, 300);

        let (attrs, pair) = unfold_color(word, ext);
        assert_eq!(attrs, Attr::BOLD);
        assert_eq!(pair, 300);
    }

    #[test]
    fn test_fold_replaces_existing_color_bits() {
        let attrs = Attr::UNDERLINE | Attr::with_pair(7);
        let (word, _) = fold_color(attrs, Some(2));
        assert_eq!(pair_number(word), 2);
        assert_ne!(word & Attr::UNDERLINE.bits(), 0);
    }

    #[test]
    fn test_fold_without_pair_keeps_word() {
        let attrs = Attr::from_word(Attr::DIM.bits() | color_pair(3));
        let (word, ext) = fold_color(attrs, None);
        assert_eq!(word, attrs.bits());
        assert_eq!(ext, 0);
        assert_eq!(unfold_color(word, ext).1, 3);
    }
}
