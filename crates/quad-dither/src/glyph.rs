//! The 16 quadrant-block glyphs.
//!
//! A glyph's index IS its quadrant mask: bit 3 is the top-left quadrant,
//! bit 2 top-right, bit 1 bottom-left, bit 0 bottom-right. Index 0 is the
//! space (all background), index 15 the full block (all foreground). The
//! optimizer's inner loop and the diffusion target selector both test
//! quadrant membership as a bit operation on the index, so the table order
//! below must never change.

/// One quadrant-block glyph: its character and quadrant mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    /// The Unicode character for this glyph.
    pub ch: char,
    /// Quadrant mask, equal to the glyph's table index.
    pub quadrants: u8,
}

/// Number of quadrant glyphs.
pub const GLYPH_COUNT: u8 = 16;

/// Index of the space glyph (all quadrants background).
pub const SPACE: u8 = 0;

/// Index of the full-block glyph (all quadrants foreground).
pub const FULL_BLOCK: u8 = 15;

/// Quadrant glyph table, indexed by quadrant mask.
pub const GLYPHS: [Glyph; 16] = [
    Glyph { ch: ' ', quadrants: 0b0000 },
    Glyph { ch: '\u{2597}', quadrants: 0b0001 }, // ▗
    Glyph { ch: '\u{2596}', quadrants: 0b0010 }, // ▖
    Glyph { ch: '\u{2584}', quadrants: 0b0011 }, // ▄
    Glyph { ch: '\u{259D}', quadrants: 0b0100 }, // ▝
    Glyph { ch: '\u{2590}', quadrants: 0b0101 }, // ▐
    Glyph { ch: '\u{259E}', quadrants: 0b0110 }, // ▞
    Glyph { ch: '\u{259F}', quadrants: 0b0111 }, // ▟
    Glyph { ch: '\u{2598}', quadrants: 0b1000 }, // ▘
    Glyph { ch: '\u{259A}', quadrants: 0b1001 }, // ▚
    Glyph { ch: '\u{258C}', quadrants: 0b1010 }, // ▌
    Glyph { ch: '\u{2599}', quadrants: 0b1011 }, // ▙
    Glyph { ch: '\u{2580}', quadrants: 0b1100 }, // ▀
    Glyph { ch: '\u{259C}', quadrants: 0b1101 }, // ▜
    Glyph { ch: '\u{259B}', quadrants: 0b1110 }, // ▛
    Glyph { ch: '\u{2588}', quadrants: 0b1111 }, // █
];

/// Is quadrant `i` (0=TL, 1=TR, 2=BL, 3=BR) of glyph `index` foreground?
///
/// This is the branch-free index form the hot loop depends on; do not
/// replace it with a table lookup.
#[inline(always)]
pub fn quadrant_is_fg(index: u8, quadrant: usize) -> bool {
    (index >> (3 - quadrant)) & 1 == 1
}

/// The character for a glyph index.
#[inline]
pub fn glyph_char(index: u8) -> char {
    GLYPHS[index as usize].ch
}

/// Reverse lookup from character to glyph index, for the ANSI parser.
pub fn glyph_index(ch: char) -> Option<u8> {
    GLYPHS.iter().position(|g| g.ch == ch).map(|i| i as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_encodes_quadrant_mask() {
        for (i, glyph) in GLYPHS.iter().enumerate() {
            assert_eq!(
                glyph.quadrants, i as u8,
                "glyph {} mask does not equal its index",
                glyph.ch
            );
        }
    }

    #[test]
    fn test_bit_mapping_per_quadrant() {
        // bit 3 -> TL, bit 2 -> TR, bit 1 -> BL, bit 0 -> BR
        assert!(quadrant_is_fg(0b1000, 0));
        assert!(quadrant_is_fg(0b0100, 1));
        assert!(quadrant_is_fg(0b0010, 2));
        assert!(quadrant_is_fg(0b0001, 3));
        for q in 0..4 {
            assert!(!quadrant_is_fg(SPACE, q));
            assert!(quadrant_is_fg(FULL_BLOCK, q));
        }
    }

    #[test]
    fn test_space_and_full_block() {
        assert_eq!(glyph_char(SPACE), ' ');
        assert_eq!(glyph_char(FULL_BLOCK), '█');
    }

    #[test]
    fn test_half_blocks() {
        assert_eq!(glyph_char(0b1100), '▀', "upper half is TL+TR");
        assert_eq!(glyph_char(0b0011), '▄', "lower half is BL+BR");
        assert_eq!(glyph_char(0b1010), '▌', "left half is TL+BL");
        assert_eq!(glyph_char(0b0101), '▐', "right half is TR+BR");
    }

    #[test]
    fn test_reverse_lookup() {
        for (i, glyph) in GLYPHS.iter().enumerate() {
            assert_eq!(glyph_index(glyph.ch), Some(i as u8));
        }
        assert_eq!(glyph_index('x'), None);
    }

    #[test]
    fn test_all_characters_distinct() {
        for i in 0..16 {
            for j in (i + 1)..16 {
                assert_ne!(GLYPHS[i].ch, GLYPHS[j].ch);
            }
        }
    }
}
