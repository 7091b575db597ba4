//! Raster inputs: per-pixel category membership and boolean bitmaps.
//!
//! A [`RasterClassifier`] answers "is pixel (x, y) part of category C" for
//! the whole world. Generation samples it into [`Bitmap`] chunks, one per
//! category and [`chunk_rects`] entry, which the contour stages consume.

use bevy::math::UVec2;

use crate::error::ConfigError;
use crate::mesh::TextureId;
use crate::rect::IntRect;

/// A terrain/biome combination drawn with a single texture.
///
/// A pixel belongs to the category when its terrain id is listed in
/// `terrains` (or `terrains` is empty) and its biome id is listed in
/// `biomes` (or `biomes` is empty). At least one list must be non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerrainCategory {
  texture: TextureId,
  terrains: Vec<u8>,
  biomes: Vec<u8>,
}

impl TerrainCategory {
  /// Creates a category, rejecting criteria that would match everything.
  pub fn new(
    texture: impl Into<TextureId>,
    terrains: Vec<u8>,
    biomes: Vec<u8>,
  ) -> Result<Self, ConfigError> {
    let texture = texture.into();
    if terrains.is_empty() && biomes.is_empty() {
      return Err(ConfigError::EmptyCriteria { texture });
    }
    Ok(Self {
      texture,
      terrains,
      biomes,
    })
  }

  /// Texture the category's meshes are drawn with.
  pub fn texture(&self) -> &TextureId {
    &self.texture
  }

  pub fn terrains(&self) -> &[u8] {
    &self.terrains
  }

  pub fn biomes(&self) -> &[u8] {
    &self.biomes
  }

  /// Returns true if a cell with these ids belongs to the category.
  pub fn matches(&self, cell: TerrainCell) -> bool {
    (self.terrains.is_empty() || self.terrains.contains(&cell.terrain))
      && (self.biomes.is_empty() || self.biomes.contains(&cell.biome))
  }
}

/// Per-pixel category membership oracle.
///
/// Implementations are queried concurrently from worker threads and must
/// not mutate state.
pub trait RasterClassifier: Sync {
  /// Raster dimensions in pixels.
  fn size(&self) -> UVec2;

  /// Returns true if pixel `(x, y)` belongs to `category`.
  fn is_member(&self, category: &TerrainCategory, x: u32, y: u32) -> bool;
}

/// Terrain and biome ids of one pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TerrainCell {
  pub terrain: u8,
  pub biome: u8,
}

impl TerrainCell {
  pub const fn new(terrain: u8, biome: u8) -> Self {
    Self { terrain, biome }
  }
}

/// Dense row-major raster of [`TerrainCell`]s.
#[derive(Clone, Debug)]
pub struct TerrainRaster {
  width: u32,
  height: u32,
  cells: Vec<TerrainCell>,
}

impl TerrainRaster {
  /// Creates a raster filled with `fill`.
  pub fn new(width: u32, height: u32, fill: TerrainCell) -> Self {
    Self {
      width,
      height,
      cells: vec![fill; (width as usize) * (height as usize)],
    }
  }

  /// Creates a raster by evaluating `f` for every pixel.
  pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> TerrainCell) -> Self {
    let mut cells = Vec::with_capacity((width as usize) * (height as usize));
    for y in 0..height {
      for x in 0..width {
        cells.push(f(x, y));
      }
    }
    Self {
      width,
      height,
      cells,
    }
  }

  #[inline]
  fn index(&self, x: u32, y: u32) -> usize {
    (y as usize) * (self.width as usize) + (x as usize)
  }

  /// Returns the cell at `(x, y)`, or `None` outside the raster.
  pub fn get(&self, x: u32, y: u32) -> Option<TerrainCell> {
    (x < self.width && y < self.height).then(|| self.cells[self.index(x, y)])
  }

  /// Overwrites the cell at `(x, y)`. Out-of-bounds writes are ignored.
  pub fn set(&mut self, x: u32, y: u32, cell: TerrainCell) {
    if x < self.width && y < self.height {
      let i = self.index(x, y);
      self.cells[i] = cell;
    }
  }
}

impl RasterClassifier for TerrainRaster {
  fn size(&self) -> UVec2 {
    UVec2::new(self.width, self.height)
  }

  fn is_member(&self, category: &TerrainCategory, x: u32, y: u32) -> bool {
    self.get(x, y).is_some_and(|cell| category.matches(cell))
  }
}

/// A dense boolean raster for one category.
///
/// Reads outside the raster return `false`, which closes contours at the
/// border.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
  width: u32,
  height: u32,
  bits: Vec<bool>,
}

impl Bitmap {
  /// Creates an empty (all `false`) bitmap.
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      width,
      height,
      bits: vec![false; (width as usize) * (height as usize)],
    }
  }

  /// Creates a bitmap by evaluating `f` for every pixel.
  pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
    let mut bitmap = Self::new(width, height);
    for y in 0..height {
      for x in 0..width {
        if f(x, y) {
          bitmap.set(x, y, true);
        }
      }
    }
    bitmap
  }

  /// Parses rows of `#` (filled) and any other character (empty).
  ///
  /// The first row is `y = 0`. Rows shorter than the longest are padded
  /// with empty pixels.
  pub fn from_rows(rows: &[&str]) -> Self {
    let height = rows.len() as u32;
    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u32;
    let mut bitmap = Self::new(width, height);
    for (y, row) in rows.iter().enumerate() {
      for (x, c) in row.chars().enumerate() {
        if c == '#' {
          bitmap.set(x as u32, y as u32, true);
        }
      }
    }
    bitmap
  }

  /// Samples `category` from a classifier over `rect` (raster coordinates).
  ///
  /// The bitmap's `(0, 0)` corresponds to `(rect.x, rect.y)`.
  pub fn sample(
    classifier: &dyn RasterClassifier,
    category: &TerrainCategory,
    rect: IntRect,
  ) -> Self {
    let width = rect.width.max(0) as u32;
    let height = rect.height.max(0) as u32;
    Self::from_fn(width, height, |x, y| {
      classifier.is_member(category, rect.x as u32 + x, rect.y as u32 + y)
    })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  /// Reads a pixel; anything outside the bitmap is `false`.
  #[inline]
  pub fn get(&self, x: i32, y: i32) -> bool {
    if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
      return false;
    }
    self.bits[(y as usize) * (self.width as usize) + (x as usize)]
  }

  /// Writes a pixel. Out-of-bounds writes are ignored.
  pub fn set(&mut self, x: u32, y: u32, value: bool) {
    if x < self.width && y < self.height {
      self.bits[(y as usize) * (self.width as usize) + (x as usize)] = value;
    }
  }

  /// Number of filled pixels.
  pub fn count_filled(&self) -> usize {
    self.bits.iter().filter(|&&b| b).count()
  }

  /// Returns true if no pixel is filled.
  pub fn is_empty(&self) -> bool {
    !self.bits.iter().any(|&b| b)
  }
}

/// Splits a raster into chunks of at most `chunk_size` pixels per side,
/// each grown by `overlap` pixels on every side and clamped to the raster.
///
/// The overlap lets neighbouring chunk meshes cover the corner chamfers
/// marching squares cuts along chunk seams.
pub fn chunk_rects(size: UVec2, chunk_size: u32, overlap: u32) -> Vec<IntRect> {
  if size.x == 0 || size.y == 0 || chunk_size == 0 {
    return Vec::new();
  }

  // A chunk never needs to exceed the raster, which keeps both in i32 range.
  let longest = size.x.max(size.y).min(i32::MAX as u32 / 4);
  let chunk_size = chunk_size.min(longest);
  let chunks_x = size.x.div_ceil(chunk_size);
  let chunks_y = size.y.div_ceil(chunk_size);
  let step = chunk_size as i32;
  let margin = overlap.min(longest) as i32;

  let mut rects = Vec::with_capacity((chunks_x * chunks_y) as usize);
  for cy in 0..chunks_y as i32 {
    for cx in 0..chunks_x as i32 {
      let core = IntRect::new(cx * step, cy * step, step, step);
      let grown = IntRect::new(
        core.x - margin,
        core.y - margin,
        core.width + 2 * margin,
        core.height + 2 * margin,
      );
      rects.push(grown.clamped(size.x as i32, size.y as i32));
    }
  }
  rects
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rock() -> TerrainCategory {
    TerrainCategory::new("rock", vec![1], vec![]).unwrap()
  }

  #[test]
  fn category_without_predicates_is_rejected() {
    let err = TerrainCategory::new("rock", vec![], vec![]).unwrap_err();
    assert!(matches!(err, ConfigError::EmptyCriteria { .. }));
  }

  #[test]
  fn category_matches_terrain_and_biome() {
    let category = TerrainCategory::new("snow_rock", vec![1, 2], vec![7]).unwrap();
    assert!(category.matches(TerrainCell::new(2, 7)));
    assert!(!category.matches(TerrainCell::new(2, 6)));
    assert!(!category.matches(TerrainCell::new(3, 7)));
  }

  #[test]
  fn bitmap_reads_outside_are_empty() {
    let bitmap = Bitmap::from_rows(&["##", "##"]);
    assert!(bitmap.get(0, 0));
    assert!(!bitmap.get(-1, 0));
    assert!(!bitmap.get(2, 1));
    assert_eq!(bitmap.count_filled(), 4);
  }

  #[test]
  fn sample_offsets_into_classifier() {
    let mut raster = TerrainRaster::new(8, 8, TerrainCell::default());
    raster.set(5, 6, TerrainCell::new(1, 0));
    let bitmap = Bitmap::sample(&raster, &rock(), IntRect::new(4, 4, 4, 4));
    assert_eq!(bitmap.count_filled(), 1);
    assert!(bitmap.get(1, 2));
  }

  #[test]
  fn chunks_cover_raster_with_overlap() {
    let rects = chunk_rects(UVec2::new(10, 5), 4, 1);
    assert_eq!(rects.len(), 3 * 2);
    assert_eq!(rects[0], IntRect::new(0, 0, 5, 5));
    assert_eq!(rects[1], IntRect::new(3, 0, 6, 5));
    assert_eq!(rects[2], IntRect::new(7, 0, 3, 5));
    assert_eq!(rects[3], IntRect::new(0, 3, 5, 2));
  }

  #[test]
  fn oversized_chunk_covers_whole_raster() {
    for chunk_size in [64, i32::MAX as u32, u32::MAX] {
      assert_eq!(
        chunk_rects(UVec2::new(10, 6), chunk_size, 1),
        vec![IntRect::new(0, 0, 10, 6)]
      );
    }
    assert_eq!(
      chunk_rects(UVec2::new(10, 6), 4, u32::MAX),
      vec![IntRect::new(0, 0, 10, 6); 6]
    );
  }

  #[test]
  fn empty_raster_has_no_chunks() {
    assert!(chunk_rects(UVec2::new(0, 10), 4, 1).is_empty());
  }
}
