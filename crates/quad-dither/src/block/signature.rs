//! 256-bit palette-quantized block signatures.
//!
//! A block's signature packs the eight anchor colors (four pixels quantized
//! through the foreground set, four through the background set) into four
//! big-endian 64-bit limbs. Equal signatures mean equal anchors, not equal
//! pixels; the cache layer re-validates by recomputed error.

use crate::color::Rgb;

/// A 256-bit block signature: four 64-bit limbs, most significant first.
///
/// Used purely as an opaque hash-map key; hashing covers all 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    highest: u64,
    high: u64,
    low: u64,
    lowest: u64,
}

impl Signature {
    /// Pack eight anchor colors into a signature.
    ///
    /// Layout, byte 0 most significant per limb:
    ///
    /// ```text
    /// highest: fg0.R fg0.G fg0.B fg1.R fg1.G fg1.B fg2.R fg2.G
    /// high:    fg2.B fg3.R fg3.G fg3.B 0 0 0 0
    /// low:     bg0.R bg0.G bg0.B bg1.R bg1.G bg1.B bg2.R bg2.G
    /// lowest:  bg2.B bg3.R bg3.G bg3.B 0 0 0 0
    /// ```
    ///
    /// The trailing zero bytes are reserved.
    pub fn pack(fg: [Rgb; 4], bg: [Rgb; 4]) -> Self {
        let (highest, high) = pack_half(fg);
        let (low, lowest) = pack_half(bg);
        Self {
            highest,
            high,
            low,
            lowest,
        }
    }

    /// The signature as 32 bytes, limb order highest to lowest.
    pub fn to_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[0..8].copy_from_slice(&self.highest.to_be_bytes());
        out[8..16].copy_from_slice(&self.high.to_be_bytes());
        out[16..24].copy_from_slice(&self.low.to_be_bytes());
        out[24..32].copy_from_slice(&self.lowest.to_be_bytes());
        out
    }
}

/// Pack four colors into two limbs: twelve color bytes then four zeros.
fn pack_half(colors: [Rgb; 4]) -> (u64, u64) {
    let mut bytes = [0u8; 16];
    for (i, c) in colors.iter().enumerate() {
        bytes[i * 3] = c.r;
        bytes[i * 3 + 1] = c.g;
        bytes[i * 3 + 2] = c.b;
    }
    let first = u64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]);
    let second = u64::from_be_bytes([
        bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
    ]);
    (first, second)
}
