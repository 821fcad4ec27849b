//! Whole-cube nearest-color lookup table.
//!
//! One byte per 24-bit RGB value: the palette index of the nearest color
//! under a fixed distance method. Building it walks all 16,777,216 colors
//! through the KD-tree and is by far the dominant cost of palette
//! construction; tables are meant to be built once and serialized.

use std::collections::HashMap;

use crate::color::{ColorMethod, Rgb};

use super::error::{FormatError, PaletteError};
use super::kdtree::KdTree;

/// Number of entries in a whole-cube table.
pub const CUBE_LEN: usize = 1 << 24;

/// A whole-cube nearest-palette-index table for one (palette, method) pair.
#[derive(Clone)]
pub struct CubeTable {
    entries: Vec<u8>,
}

impl CubeTable {
    /// Build the table by querying the tree for every RGB value.
    ///
    /// `index_of` maps each tree color back to its palette index; every
    /// color reachable from the tree must be present in it.
    pub fn build(
        tree: &KdTree,
        index_of: &HashMap<Rgb, u32>,
        method: &ColorMethod,
    ) -> Result<Self, PaletteError> {
        if index_of.len() > 256 {
            return Err(PaletteError::TooManyColors(index_of.len()));
        }
        tracing::info!(
            method = method.name(),
            colors = index_of.len(),
            "building whole-cube lookup table"
        );

        let mut entries = vec![0u8; CUBE_LEN];
        for packed in 0..CUBE_LEN as u32 {
            let rgb = Rgb::from_packed(packed);
            // The tree is never empty for a validated palette.
            if let Some((nearest, _)) = tree.nearest(rgb, method) {
                if let Some(&idx) = index_of.get(&nearest) {
                    entries[packed as usize] = idx as u8;
                }
            }
        }

        tracing::info!(method = method.name(), "whole-cube table complete");
        Ok(Self { entries })
    }

    /// Wrap raw table bytes read from a palette container.
    pub fn from_entries(entries: Vec<u8>) -> Result<Self, FormatError> {
        if entries.len() != CUBE_LEN {
            return Err(FormatError::BadTableLength(entries.len() as u64));
        }
        Ok(Self { entries })
    }

    /// Nearest palette index for a color.
    #[inline]
    pub fn nearest_index(&self, rgb: Rgb) -> u8 {
        self.entries[rgb.packed() as usize]
    }

    /// The raw table bytes, for serialization.
    pub fn entries(&self) -> &[u8] {
        &self.entries
    }
}

impl std::fmt::Debug for CubeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CubeTable")
            .field("entries", &self.entries.len())
            .finish()
    }
}
