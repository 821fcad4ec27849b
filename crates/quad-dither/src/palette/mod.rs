//! Palette subsystem: source parsing, color sets, lookup tables, KD-trees,
//! and the binary container format.

pub mod binary;
pub mod code;
mod error;
mod kdtree;
mod lookup;
mod set;
mod source;

use std::collections::HashMap;

pub use binary::PaletteFile;
pub use code::CodeClass;
pub use error::{FormatError, PaletteError, ParseColorError};
pub use kdtree::KdTree;
pub use lookup::{CubeTable, CUBE_LEN};
pub use set::{PaletteColor, PaletteSet};
pub use source::{PaletteSource, SourceEntry};

use crate::color::{ColorMethod, Rgb};

/// A loaded palette, bound to one color distance method.
///
/// Holds the foreground and background color sets with whatever lookup
/// artifacts were built or loaded for them, plus the combined code-to-color
/// reverse map. A `Palette`, its tables, and its trees belong together:
/// artifacts built under one method must never serve another.
#[derive(Debug, Clone)]
pub struct Palette {
    method: ColorMethod,
    fg: PaletteSet,
    bg: PaletteSet,
    code_to_rgb: HashMap<String, Rgb>,
    aliased: bool,
}

impl Palette {
    /// Load a palette from a parsed source under the given method.
    ///
    /// With `with_cube` set, whole-cube tables are built for both sets
    /// (slow; meant for ahead-of-time container construction). Without it
    /// the palette runs in KD-tree fallback mode: loads are fast, per-pixel
    /// lookups one to two orders of magnitude slower.
    ///
    /// When both classes map exactly the same RGB values, the background
    /// set shares the foreground set's table and tree.
    pub fn from_source(
        source: &PaletteSource,
        method: ColorMethod,
        with_cube: bool,
    ) -> Result<Self, PaletteError> {
        let fg_entries = source.class_entries(CodeClass::Fg);
        let bg_entries = source.class_entries(CodeClass::Bg);

        let fg = PaletteSet::build(CodeClass::Fg, &fg_entries, &method, with_cube)?;

        let bg_rgbs: Vec<Rgb> = {
            let mut seen = Vec::new();
            for e in &bg_entries {
                if !seen.contains(&e.rgb) {
                    seen.push(e.rgb);
                }
            }
            seen
        };
        let aliased = fg.same_rgbs(&bg_rgbs);
        let bg = if aliased {
            fg.alias(CodeClass::Bg, &bg_entries)?
        } else {
            PaletteSet::build(CodeClass::Bg, &bg_entries, &method, with_cube)?
        };

        Ok(Self::assemble(method, fg, bg, aliased))
    }

    pub(crate) fn assemble(
        method: ColorMethod,
        fg: PaletteSet,
        bg: PaletteSet,
        aliased: bool,
    ) -> Self {
        let mut code_to_rgb = HashMap::new();
        for (rgb, code) in fg.ansi_data().iter().chain(bg.ansi_data()) {
            code_to_rgb.insert(code.clone(), *rgb);
        }
        Self {
            method,
            fg,
            bg,
            code_to_rgb,
            aliased,
        }
    }

    /// The distance method this palette's artifacts were built under.
    pub fn method(&self) -> &ColorMethod {
        &self.method
    }

    /// The foreground color set.
    pub fn fg(&self) -> &PaletteSet {
        &self.fg
    }

    /// The background color set.
    pub fn bg(&self) -> &PaletteSet {
        &self.bg
    }

    /// True when the background set aliases the foreground set's artifacts.
    pub fn sets_aliased(&self) -> bool {
        self.aliased
    }

    /// Reverse lookup from any loaded terminal code to its color.
    ///
    /// Every code from the source survives here, including codes that lost
    /// the emit slot to an earlier sort-order duplicate.
    pub fn rgb_for_code(&self, code: &str) -> Option<Rgb> {
        self.code_to_rgb.get(code).copied()
    }

    /// Distinct colors in the larger of the two sets, used for the small
    /// palette heuristic.
    pub fn distinct_colors(&self) -> usize {
        self.fg.len().max(self.bg.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_sets_json() -> &'static [u8] {
        br##"{
            "30": "#000000", "31": "#AA0000", "37": "#AAAAAA",
            "40": "#000000", "41": "#AA0000", "47": "#AAAAAA"
        }"##
    }

    #[test]
    fn test_shared_rgb_sets_alias() {
        let source = PaletteSource::parse_json(shared_sets_json()).unwrap();
        let palette = Palette::from_source(&source, ColorMethod::Rgb, false).unwrap();

        assert!(palette.sets_aliased());
        assert_eq!(palette.fg().len(), 3);
        assert_eq!(palette.bg().len(), 3);
        assert_eq!(palette.fg().color(1).code, "31");
        assert_eq!(palette.bg().color(1).code, "41");
    }

    #[test]
    fn test_distinct_rgb_sets_do_not_alias() {
        let source = PaletteSource::parse_json(
            br##"{
                "30": "#000000", "37": "#AAAAAA",
                "40": "#101010", "47": "#AAAAAA"
            }"##,
        )
        .unwrap();
        let palette = Palette::from_source(&source, ColorMethod::Rgb, false).unwrap();

        assert!(!palette.sets_aliased());
        assert_eq!(palette.bg().color(0).rgb, Rgb::new(0x10, 0x10, 0x10));
    }

    #[test]
    fn test_reverse_map_keeps_all_codes() {
        let source = PaletteSource::parse_json(
            br##"{
                "30": "#000000", "38;5;16": "#000000", "37": "#AAAAAA",
                "40": "#000000", "47": "#AAAAAA"
            }"##,
        )
        .unwrap();
        let palette = Palette::from_source(&source, ColorMethod::Rgb, false).unwrap();

        // The losing duplicate code still round-trips.
        assert_eq!(palette.rgb_for_code("38;5;16"), Some(Rgb::new(0, 0, 0)));
        assert_eq!(palette.rgb_for_code("30"), Some(Rgb::new(0, 0, 0)));
        assert_eq!(palette.rgb_for_code("99"), None);
    }

    #[test]
    fn test_method_is_recorded() {
        let source = PaletteSource::parse_json(shared_sets_json()).unwrap();
        let palette = Palette::from_source(&source, ColorMethod::Redmean, false).unwrap();
        assert_eq!(palette.method().name(), "Redmean");
    }
}
