//! One palette color set: colors, codes, lookup table, and KD-tree.
//!
//! A loaded palette carries two sets, one per code class. When both classes
//! map the same RGB values the background set aliases the foreground set's
//! table and tree, which are the expensive artifacts; codes stay per-set
//! since "31" and "41" are different strings for the same color.

use std::collections::HashMap;
use std::sync::Arc;

use crate::color::{ColorMethod, Rgb};

use super::code::{CodeClass, CodeKey};
use super::error::PaletteError;
use super::kdtree::KdTree;
use super::lookup::CubeTable;
use super::source::SourceEntry;

/// A palette color with the terminal code that paints it in this set's
/// class. When several codes map to one RGB, the first code in sort order
/// wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteColor {
    pub rgb: Rgb,
    pub code: String,
}

/// One color set of a loaded palette.
#[derive(Debug, Clone)]
pub struct PaletteSet {
    class: CodeClass,
    /// Distinct colors in sort-key order of their winning codes.
    colors: Vec<PaletteColor>,
    /// Every (rgb, code) pair of this class, duplicates preserved.
    ansi_data: Vec<(Rgb, String)>,
    /// Color to palette-index map.
    index_of: HashMap<Rgb, u32>,
    tree: Arc<KdTree>,
    /// Whole-cube table; absent in KD-tree fallback mode.
    cube: Option<Arc<CubeTable>>,
}

impl PaletteSet {
    /// Build a set from the source entries of one class.
    ///
    /// `with_cube` selects between full table construction and the fast
    /// KD-tree-only mode used for direct JSON loads and custom methods.
    pub fn build(
        class: CodeClass,
        entries: &[&SourceEntry],
        method: &ColorMethod,
        with_cube: bool,
    ) -> Result<Self, PaletteError> {
        if entries.is_empty() {
            return Err(PaletteError::EmptyClass(class.as_str()));
        }

        // Winning code per RGB: entries arrive in sort-key order, so the
        // first sighting of an RGB wins.
        let mut colors: Vec<PaletteColor> = Vec::new();
        let mut index_of: HashMap<Rgb, u32> = HashMap::new();
        let mut ansi_data: Vec<(Rgb, String)> = Vec::new();
        for entry in entries {
            ansi_data.push((entry.rgb, entry.code.clone()));
            if !index_of.contains_key(&entry.rgb) {
                index_of.insert(entry.rgb, colors.len() as u32);
                colors.push(PaletteColor {
                    rgb: entry.rgb,
                    code: entry.code.clone(),
                });
            }
        }
        if colors.len() > 256 {
            return Err(PaletteError::TooManyColors(colors.len()));
        }

        let rgbs: Vec<Rgb> = colors.iter().map(|c| c.rgb).collect();
        let tree = Arc::new(KdTree::build(&rgbs));
        let cube = if with_cube {
            Some(Arc::new(CubeTable::build(&tree, &index_of, method)?))
        } else {
            None
        };

        Ok(Self {
            class,
            colors,
            ansi_data,
            index_of,
            tree,
            cube,
        })
    }

    /// Assemble a set from deserialized container parts.
    pub(crate) fn from_parts(
        class: CodeClass,
        colors: Vec<PaletteColor>,
        ansi_data: Vec<(Rgb, String)>,
        index_of: HashMap<Rgb, u32>,
        tree: Arc<KdTree>,
        cube: Option<Arc<CubeTable>>,
    ) -> Result<Self, PaletteError> {
        if colors.is_empty() {
            return Err(PaletteError::EmptyClass(class.as_str()));
        }
        if colors.len() > 256 {
            return Err(PaletteError::TooManyColors(colors.len()));
        }
        Ok(Self {
            class,
            colors,
            ansi_data,
            index_of,
            tree,
            cube,
        })
    }

    /// Alias this set under another class: the colors, table, and tree are
    /// shared, but each color takes the winning code of the new class.
    ///
    /// The color order is preserved so that indices produced by the shared
    /// table stay valid for the aliased set.
    pub fn alias(
        &self,
        class: CodeClass,
        class_entries: &[&SourceEntry],
    ) -> Result<Self, PaletteError> {
        let winning = winning_codes(class_entries);
        let mut colors = Vec::with_capacity(self.colors.len());
        for c in &self.colors {
            let code = winning
                .get(&c.rgb)
                .ok_or_else(|| PaletteError::EmptyClass(class.as_str()))?;
            colors.push(PaletteColor {
                rgb: c.rgb,
                code: (*code).to_string(),
            });
        }
        Ok(Self {
            class,
            colors,
            ansi_data: class_entries
                .iter()
                .map(|e| (e.rgb, e.code.clone()))
                .collect(),
            index_of: self.index_of.clone(),
            tree: Arc::clone(&self.tree),
            cube: self.cube.clone(),
        })
    }

    /// Nearest palette index for a color: table lookup when available,
    /// KD-tree query otherwise.
    #[inline]
    pub fn quantize(&self, rgb: Rgb, method: &ColorMethod) -> u32 {
        if let Some(cube) = &self.cube {
            return cube.nearest_index(rgb) as u32;
        }
        match self.tree.nearest(rgb, method) {
            Some((nearest, _)) => self.index_of.get(&nearest).copied().unwrap_or(0),
            None => 0,
        }
    }

    /// The color at a palette index.
    #[inline]
    pub fn color(&self, idx: u32) -> &PaletteColor {
        &self.colors[idx as usize]
    }

    /// Palette index of an exact color, if it is a member.
    pub fn index_for(&self, rgb: Rgb) -> Option<u32> {
        self.index_of.get(&rgb).copied()
    }

    /// Number of distinct colors in this set.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn class(&self) -> CodeClass {
        self.class
    }

    pub fn colors(&self) -> &[PaletteColor] {
        &self.colors
    }

    /// Every code of this class with its color, duplicates preserved.
    pub fn ansi_data(&self) -> &[(Rgb, String)] {
        &self.ansi_data
    }

    pub fn tree(&self) -> &KdTree {
        &self.tree
    }

    pub(crate) fn tree_arc(&self) -> Arc<KdTree> {
        Arc::clone(&self.tree)
    }

    pub fn cube(&self) -> Option<&CubeTable> {
        self.cube.as_deref()
    }

    pub(crate) fn cube_arc(&self) -> Option<Arc<CubeTable>> {
        self.cube.clone()
    }

    pub(crate) fn index_map(&self) -> &HashMap<Rgb, u32> {
        &self.index_of
    }

    /// True when this set and `other` contain the same RGB values.
    pub fn same_rgbs(&self, other_rgbs: &[Rgb]) -> bool {
        if self.colors.len() != other_rgbs.len() {
            return false;
        }
        other_rgbs.iter().all(|c| self.index_of.contains_key(c))
    }
}

/// Winning code per RGB among the given class entries (first in sort order).
fn winning_codes<'a>(entries: &[&'a SourceEntry]) -> HashMap<Rgb, &'a str> {
    let mut winners: HashMap<Rgb, (&str, CodeKey)> = HashMap::new();
    for e in entries {
        match winners.get(&e.rgb) {
            Some((_, key)) if *key <= e.key => {}
            _ => {
                winners.insert(e.rgb, (e.code.as_str(), e.key));
            }
        }
    }
    winners.into_iter().map(|(rgb, (c, _))| (rgb, c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::source::PaletteSource;

    fn bw_source() -> PaletteSource {
        PaletteSource::parse_json(
            br##"{
                "30": "#000000", "37": "#FFFFFF",
                "40": "#000000", "47": "#FFFFFF"
            }"##,
        )
        .unwrap()
    }

    #[test]
    fn test_build_fg_set() {
        let source = bw_source();
        let set = PaletteSet::build(
            CodeClass::Fg,
            &source.class_entries(CodeClass::Fg),
            &ColorMethod::Rgb,
            false,
        )
        .unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.color(0).rgb, Rgb::new(0, 0, 0));
        assert_eq!(set.color(0).code, "30");
        assert_eq!(set.color(1).code, "37");
    }

    #[test]
    fn test_duplicate_rgb_first_code_wins() {
        let source = PaletteSource::parse_json(
            br##"{
                "38;5;16": "#000000", "30": "#000000", "37": "#FFFFFF",
                "40": "#000000", "47": "#FFFFFF"
            }"##,
        )
        .unwrap();
        let set = PaletteSet::build(
            CodeClass::Fg,
            &source.class_entries(CodeClass::Fg),
            &ColorMethod::Rgb,
            false,
        )
        .unwrap();

        // Basic code 30 sorts before 38;5;16 and wins the emit slot...
        assert_eq!(set.len(), 2);
        assert_eq!(set.color(0).code, "30");
        // ...but the reverse data keeps every code for round-tripping.
        assert_eq!(set.ansi_data().len(), 3);
    }

    #[test]
    fn test_quantize_fast_mode_uses_tree() {
        let source = bw_source();
        let set = PaletteSet::build(
            CodeClass::Fg,
            &source.class_entries(CodeClass::Fg),
            &ColorMethod::Rgb,
            false,
        )
        .unwrap();
        assert!(set.cube().is_none());

        assert_eq!(set.quantize(Rgb::new(10, 10, 10), &ColorMethod::Rgb), 0);
        assert_eq!(set.quantize(Rgb::new(240, 240, 240), &ColorMethod::Rgb), 1);
    }

    #[test]
    fn test_alias_shares_tree_keeps_class_codes() {
        let source = bw_source();
        let fg = PaletteSet::build(
            CodeClass::Fg,
            &source.class_entries(CodeClass::Fg),
            &ColorMethod::Rgb,
            false,
        )
        .unwrap();
        let bg = fg
            .alias(CodeClass::Bg, &source.class_entries(CodeClass::Bg))
            .unwrap();

        assert_eq!(bg.class(), CodeClass::Bg);
        assert_eq!(bg.color(0).rgb, fg.color(0).rgb);
        assert_eq!(bg.color(0).code, "40");
        assert_eq!(bg.color(1).code, "47");
        // Shared artifacts, not copies.
        assert!(Arc::ptr_eq(&fg.tree_arc(), &bg.tree_arc()));
    }

    #[test]
    fn test_same_rgbs() {
        let source = bw_source();
        let fg = PaletteSet::build(
            CodeClass::Fg,
            &source.class_entries(CodeClass::Fg),
            &ColorMethod::Rgb,
            false,
        )
        .unwrap();
        assert!(fg.same_rgbs(&[Rgb::new(255, 255, 255), Rgb::new(0, 0, 0)]));
        assert!(!fg.same_rgbs(&[Rgb::new(0, 0, 0)]));
        assert!(!fg.same_rgbs(&[Rgb::new(0, 0, 0), Rgb::new(1, 1, 1)]));
    }

    #[test]
    fn test_empty_class_rejected() {
        let result = PaletteSet::build(CodeClass::Bg, &[], &ColorMethod::Rgb, false);
        assert!(matches!(result, Err(PaletteError::EmptyClass("background"))));
    }
}
