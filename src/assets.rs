//! Embedded palette assets.
//!
//! The named palettes (`ansi16`, `ansi256`, `jetbrains32`) ship inside the
//! binary as JSON sources. They load in KD-tree mode; users who want
//! table-backed rendering precompute a `.palette` container with the
//! `palette` subcommand and pass its path instead of a name.

use std::borrow::Cow;

use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "palettes/"]
#[include = "*.json"]
struct EmbeddedPalettes;

/// JSON bytes for a named embedded palette.
pub fn palette_json(name: &str) -> Option<Cow<'static, [u8]>> {
    EmbeddedPalettes::get(&format!("{name}.json")).map(|f| f.data)
}

/// Names of all embedded palettes, sorted.
pub fn embedded_names() -> Vec<String> {
    let mut names: Vec<String> = EmbeddedPalettes::iter()
        .filter_map(|f| f.as_ref().strip_suffix(".json").map(str::to_string))
        .collect();
    names.sort();
    names
}
