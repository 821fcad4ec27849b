//! JSON palette source format.
//!
//! A source palette is a flat JSON object mapping terminal color codes to
//! hex colors: `{ "31": "#AA0000", "48;5;17": "#00005F", ... }`. Any entry
//! failing to classify or parse fails the whole load.

use std::collections::BTreeMap;

use crate::color::Rgb;

use super::code::{classify, CodeClass, CodeKey};
use super::error::PaletteError;

/// One classified palette source entry.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    /// The terminal code exactly as written in the source.
    pub code: String,
    /// The entry's class (foreground or background).
    pub class: CodeClass,
    /// Sort key within the class.
    pub key: CodeKey,
    /// The color the code maps to.
    pub rgb: Rgb,
}

/// A parsed palette source: all entries, classified, in class sort order.
#[derive(Debug, Clone)]
pub struct PaletteSource {
    entries: Vec<SourceEntry>,
}

impl PaletteSource {
    /// Parse a JSON source document.
    pub fn parse_json(bytes: &[u8]) -> Result<Self, PaletteError> {
        let map: BTreeMap<String, String> = serde_json::from_slice(bytes)?;
        Self::from_pairs(map.into_iter())
    }

    /// Build a source from (code, hex) pairs.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, PaletteError> {
        let mut entries = Vec::new();
        for (code, hex) in pairs {
            let (class, key) = classify(&code)?;
            let rgb: Rgb = hex.parse().map_err(|source| PaletteError::ParseColor {
                code: code.clone(),
                source,
            })?;
            entries.push(SourceEntry {
                code,
                class,
                key,
                rgb,
            });
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.code.cmp(&b.code)));
        Ok(Self { entries })
    }

    /// All entries of one class, in sort-key order.
    pub fn class_entries(&self, class: CodeClass) -> Vec<&SourceEntry> {
        self.entries.iter().filter(|e| e.class == class).collect()
    }

    /// All entries.
    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }
}
