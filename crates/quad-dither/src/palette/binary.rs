//! The `.palette` binary container.
//!
//! A single gzip stream holding, per distance method, the two color sets
//! with their precomputed artifacts: color arrays, code data, whole-cube
//! lookup tables, color-to-index tables, and serialized KD-trees. Building
//! the container is the expensive step; loading it restores table-backed
//! palettes without touching the cube again.
//!
//! An empty `color_table` on the background side signals that the set
//! duplicates the foreground set; the loader then aliases the background
//! onto the foreground's arrays, attaching the background codes.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::color::{ColorMethod, Rgb};

use super::code::{classify, CodeClass, CodeKey};
use super::error::{FormatError, PaletteError};
use super::kdtree::KdTree;
use super::lookup::{CubeTable, CUBE_LEN};
use super::set::{PaletteColor, PaletteSet};
use super::source::PaletteSource;
use super::Palette;

const MAGIC: &[u8; 4] = b"QDPF";
const VERSION: u16 = 1;

/// Serialized form of one color set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetData {
    /// Palette colors in sort-key order. Empty on an aliased side.
    pub color_arr: Vec<Rgb>,
    /// Every (rgb, code) pair of the set's class, duplicates preserved.
    pub ansi_data: Vec<(Rgb, String)>,
    /// Whole-cube table entries; empty in KD-only mode or on an aliased side.
    pub closest_idx: Vec<u8>,
    /// Color-to-index pairs. Empty on the background side signals aliasing.
    pub color_table: Vec<(Rgb, u32)>,
    /// Pre-order serialized KD-tree. Empty on an aliased side.
    pub kdtree_data: Vec<u8>,
}

/// One method's pair of sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBlock {
    pub fg: SetData,
    pub bg: SetData,
}

/// The decoded contents of a `.palette` container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaletteFile {
    methods: BTreeMap<String, MethodBlock>,
}

impl PaletteFile {
    /// Build a container from a palette source, covering every built-in
    /// method with full whole-cube tables.
    ///
    /// This is the slow path: three methods, two sets each, 16,777,216
    /// lookups per table (aliased background sets are free).
    pub fn build(source: &PaletteSource) -> Result<Self, PaletteError> {
        Self::build_inner(source, true)
    }

    /// Build a container without whole-cube tables.
    ///
    /// Palettes restored from such a container run in KD-tree fallback
    /// mode. Useful for tooling that only needs the color sets and trees.
    pub fn build_fast(source: &PaletteSource) -> Result<Self, PaletteError> {
        Self::build_inner(source, false)
    }

    fn build_inner(source: &PaletteSource, with_cube: bool) -> Result<Self, PaletteError> {
        let mut methods = BTreeMap::new();
        for method in ColorMethod::builtins() {
            let palette = Palette::from_source(source, method.clone(), with_cube)?;
            let fg = set_data_from(palette.fg(), false);
            let bg = set_data_from(palette.bg(), palette.sets_aliased());
            methods.insert(method.name().to_string(), MethodBlock { fg, bg });
        }
        Ok(Self { methods })
    }

    /// Method names carried by this container.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(|s| s.as_str())
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn method_block(&self, name: &str) -> Option<&MethodBlock> {
        self.methods.get(name)
    }

    /// Reconstruct the palette for one method.
    ///
    /// Returns [`FormatError::MethodMissing`] when the container does not
    /// carry the requested method (custom methods never appear here).
    pub fn palette_for(&self, method: &ColorMethod) -> Result<Palette, FormatError> {
        let block = self
            .methods
            .get(method.name())
            .ok_or_else(|| FormatError::MethodMissing(method.name().to_string()))?;

        let fg = load_set(CodeClass::Fg, &block.fg)?;
        let aliased = block.bg.color_table.is_empty();
        let bg = if aliased {
            alias_set(&fg, CodeClass::Bg, &block.bg.ansi_data)?
        } else {
            load_set(CodeClass::Bg, &block.bg)?
        };

        Ok(Palette::assemble(method.clone(), fg, bg, aliased))
    }

    /// Serialize into a gzip stream.
    pub fn write_to<W: Write>(&self, w: W) -> Result<(), FormatError> {
        let mut gz = GzEncoder::new(w, Compression::default());
        gz.write_all(MAGIC)?;
        gz.write_u16::<BigEndian>(VERSION)?;
        gz.write_u16::<BigEndian>(self.methods.len() as u16)?;
        for (name, block) in &self.methods {
            write_string(&mut gz, name)?;
            write_set(&mut gz, &block.fg)?;
            write_set(&mut gz, &block.bg)?;
        }
        gz.finish()?;
        Ok(())
    }

    /// Deserialize from a gzip stream.
    pub fn read_from<R: Read>(r: R) -> Result<Self, FormatError> {
        let mut gz = GzDecoder::new(r);

        let mut magic = [0u8; 4];
        gz.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(FormatError::BadMagic);
        }
        let version = gz.read_u16::<BigEndian>()?;
        if version != VERSION {
            return Err(FormatError::BadVersion(version));
        }

        let count = gz.read_u16::<BigEndian>()?;
        let mut methods = BTreeMap::new();
        for _ in 0..count {
            let name = read_string(&mut gz)?;
            let fg = read_set(&mut gz)?;
            let bg = read_set(&mut gz)?;
            methods.insert(name, MethodBlock { fg, bg });
        }
        Ok(Self { methods })
    }
}

/// Extract serialized set data from a built set.
fn set_data_from(set: &PaletteSet, aliased: bool) -> SetData {
    let ansi_data = set.ansi_data().to_vec();
    if aliased {
        // Only the class codes are carried; everything else comes from the
        // foreground side at load time.
        return SetData {
            ansi_data,
            ..SetData::default()
        };
    }

    let mut kdtree_data = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = set.tree().write_to(&mut kdtree_data);

    SetData {
        color_arr: set.colors().iter().map(|c| c.rgb).collect(),
        ansi_data,
        closest_idx: set.cube().map(|c| c.entries().to_vec()).unwrap_or_default(),
        color_table: set
            .colors()
            .iter()
            .enumerate()
            .map(|(i, c)| (c.rgb, i as u32))
            .collect(),
        kdtree_data,
    }
}

/// Reassemble a full (non-aliased) set from container data.
fn load_set(class: CodeClass, data: &SetData) -> Result<PaletteSet, FormatError> {
    let winning = winning_codes(&data.ansi_data)?;
    let mut colors = Vec::with_capacity(data.color_arr.len());
    for &rgb in &data.color_arr {
        let code = winning
            .get(&rgb)
            .ok_or_else(|| PaletteError::EmptyClass(class.as_str()))?;
        colors.push(PaletteColor {
            rgb,
            code: code.clone(),
        });
    }

    let index_of: HashMap<Rgb, u32> = data.color_table.iter().copied().collect();
    let tree = Arc::new(KdTree::read_from(&mut data.kdtree_data.as_slice())?);
    let cube = if data.closest_idx.is_empty() {
        None
    } else {
        if data.closest_idx.len() != CUBE_LEN {
            return Err(FormatError::BadTableLength(data.closest_idx.len() as u64));
        }
        Some(Arc::new(CubeTable::from_entries(data.closest_idx.clone())?))
    };

    Ok(PaletteSet::from_parts(
        class,
        colors,
        data.ansi_data.clone(),
        index_of,
        tree,
        cube,
    )?)
}

/// Build the aliased background set over the foreground set's arrays.
fn alias_set(
    fg: &PaletteSet,
    class: CodeClass,
    ansi_data: &[(Rgb, String)],
) -> Result<PaletteSet, FormatError> {
    let winning = winning_codes(ansi_data)?;
    let mut colors = Vec::with_capacity(fg.len());
    for c in fg.colors() {
        let code = winning
            .get(&c.rgb)
            .ok_or_else(|| PaletteError::EmptyClass(class.as_str()))?;
        colors.push(PaletteColor {
            rgb: c.rgb,
            code: code.clone(),
        });
    }
    Ok(PaletteSet::from_parts(
        class,
        colors,
        ansi_data.to_vec(),
        fg.index_map().clone(),
        fg.tree_arc(),
        fg.cube_arc(),
    )?)
}

/// Winning code per RGB: first in class sort order.
fn winning_codes(ansi_data: &[(Rgb, String)]) -> Result<HashMap<Rgb, String>, FormatError> {
    let mut winners: HashMap<Rgb, (String, CodeKey)> = HashMap::new();
    for (rgb, code) in ansi_data {
        let (_, key) = classify(code).map_err(FormatError::Palette)?;
        match winners.get(rgb) {
            Some((_, existing)) if *existing <= key => {}
            _ => {
                winners.insert(*rgb, (code.clone(), key));
            }
        }
    }
    Ok(winners
        .into_iter()
        .map(|(rgb, (code, _))| (rgb, code))
        .collect())
}

fn write_string<W: Write>(w: &mut W, s: &str) -> Result<(), FormatError> {
    w.write_u16::<BigEndian>(s.len() as u16)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(r: &mut R) -> Result<String, FormatError> {
    let len = r.read_u16::<BigEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

fn write_set<W: Write>(w: &mut W, set: &SetData) -> Result<(), FormatError> {
    w.write_u32::<BigEndian>(set.color_arr.len() as u32)?;
    for rgb in &set.color_arr {
        w.write_all(&rgb.to_bytes())?;
    }

    w.write_u32::<BigEndian>(set.ansi_data.len() as u32)?;
    for (rgb, code) in &set.ansi_data {
        w.write_all(&rgb.to_bytes())?;
        write_string(w, code)?;
    }

    w.write_u32::<BigEndian>(set.closest_idx.len() as u32)?;
    w.write_all(&set.closest_idx)?;

    w.write_u32::<BigEndian>(set.color_table.len() as u32)?;
    for (rgb, idx) in &set.color_table {
        w.write_all(&rgb.to_bytes())?;
        w.write_u32::<BigEndian>(*idx)?;
    }

    w.write_u32::<BigEndian>(set.kdtree_data.len() as u32)?;
    w.write_all(&set.kdtree_data)?;
    Ok(())
}

fn read_set<R: Read>(r: &mut R) -> Result<SetData, FormatError> {
    let n_colors = r.read_u32::<BigEndian>()? as usize;
    let mut color_arr = Vec::with_capacity(n_colors.min(4096));
    for _ in 0..n_colors {
        let mut rgb = [0u8; 3];
        r.read_exact(&mut rgb)?;
        color_arr.push(Rgb::from_bytes(rgb));
    }

    let n_ansi = r.read_u32::<BigEndian>()? as usize;
    let mut ansi_data = Vec::with_capacity(n_ansi.min(4096));
    for _ in 0..n_ansi {
        let mut rgb = [0u8; 3];
        r.read_exact(&mut rgb)?;
        let code = read_string(r)?;
        ansi_data.push((Rgb::from_bytes(rgb), code));
    }

    let cube_len = r.read_u32::<BigEndian>()? as usize;
    if cube_len != 0 && cube_len != CUBE_LEN {
        return Err(FormatError::BadTableLength(cube_len as u64));
    }
    let mut closest_idx = vec![0u8; cube_len];
    r.read_exact(&mut closest_idx)?;

    let n_table = r.read_u32::<BigEndian>()? as usize;
    let mut color_table = Vec::with_capacity(n_table.min(4096));
    for _ in 0..n_table {
        let mut rgb = [0u8; 3];
        r.read_exact(&mut rgb)?;
        let idx = r.read_u32::<BigEndian>()?;
        color_table.push((Rgb::from_bytes(rgb), idx));
    }

    let tree_len = r.read_u32::<BigEndian>()? as usize;
    let mut kdtree_data = vec![0u8; tree_len];
    r.read_exact(&mut kdtree_data)?;

    Ok(SetData {
        color_arr,
        ansi_data,
        closest_idx,
        color_table,
        kdtree_data,
    })
}
