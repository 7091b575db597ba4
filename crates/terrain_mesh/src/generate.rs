//! Full raster-to-mesh pipeline.
//!
//! For every category and raster chunk, in parallel:
//!
//! 1. Sample the classifier into a [`Bitmap`]
//! 2. Extract boundary edges with marching squares
//! 3. Trace edges into shapes
//! 4. Group shapes into outers with holes
//! 5. Tessellate and pack into meshes
//!
//! Each task returns its own mesh list; the lists are joined and
//! deduplicated by [`MeshId`](crate::mesh::MeshId) once every task has
//! finished.

use std::collections::{HashMap, HashSet};

use bevy::math::{IVec2, UVec2, Vec2};
use rayon::prelude::*;
// WASM compat: std::time::Instant panics on wasm32
use web_time::Instant;

use crate::cache;
use crate::config::MeshGenConfig;
use crate::contour::{build_edge_set, group_shapes, trace_shapes};
use crate::error::{ConfigError, GenerateError, TessellateError};
use crate::grid::MeshGrid;
use crate::mesh::{EarcutTessellator, Mesh, MeshBuilder, MeshDefinitions, Tessellator, TextureId};
use crate::raster::{Bitmap, RasterClassifier, TerrainCategory, chunk_rects};
use crate::rect::IntRect;

/// Texture dimension lookup used for texture coordinates.
pub trait TextureSizes: Sync {
  /// Pixel size of `texture`, or `None` if it is unknown.
  fn texture_size(&self, texture: &TextureId) -> Option<UVec2>;
}

impl TextureSizes for HashMap<TextureId, UVec2> {
  fn texture_size(&self, texture: &TextureId) -> Option<UVec2> {
    self.get(texture).copied()
  }
}

/// Runs generation passes with fixed settings.
pub struct MeshGenerator<T = EarcutTessellator> {
  config: MeshGenConfig,
  categories: Vec<TerrainCategory>,
  definitions: MeshDefinitions,
  tessellator: T,
}

impl MeshGenerator {
  /// Validates `config` and prepares its categories and definitions.
  pub fn new(config: MeshGenConfig) -> Result<Self, ConfigError> {
    config.validate()?;
    let categories = config.terrain_categories()?;
    let definitions = config.mesh_definitions();
    Ok(Self {
      config,
      categories,
      definitions,
      tessellator: EarcutTessellator,
    })
  }
}

impl<T: Tessellator> MeshGenerator<T> {
  /// Replaces the triangulation backend.
  pub fn with_tessellator<U: Tessellator>(self, tessellator: U) -> MeshGenerator<U> {
    MeshGenerator {
      config: self.config,
      categories: self.categories,
      definitions: self.definitions,
      tessellator,
    }
  }

  /// Replaces the configured categories.
  pub fn with_categories(mut self, categories: Vec<TerrainCategory>) -> Self {
    self.categories = categories;
    self
  }

  /// Replaces the configured mesh definitions.
  pub fn with_definitions(mut self, definitions: MeshDefinitions) -> Self {
    self.definitions = definitions;
    self
  }

  pub fn config(&self) -> &MeshGenConfig {
    &self.config
  }

  pub fn categories(&self) -> &[TerrainCategory] {
    &self.categories
  }

  pub fn definitions(&self) -> &MeshDefinitions {
    &self.definitions
  }

  /// Generates meshes for every category over the whole raster.
  ///
  /// Any failing chunk fails the whole pass; no partial result is
  /// returned. Output order follows category then chunk order.
  pub fn generate_meshes(
    &self,
    classifier: &dyn RasterClassifier,
    textures: &dyn TextureSizes,
  ) -> Result<Vec<Mesh>, GenerateError> {
    let start = Instant::now();

    let jobs = self
      .categories
      .iter()
      .map(|category| -> Result<_, GenerateError> {
        let texture = category.texture();
        let size = textures
          .texture_size(texture)
          .ok_or_else(|| GenerateError::UnknownTexture(texture.clone()))?;
        // UVs divide by the texture size.
        if size.x == 0 || size.y == 0 {
          return Err(GenerateError::InvalidTextureSize(texture.clone(), size));
        }
        Ok((category, size.as_vec2()))
      })
      .collect::<Result<Vec<_>, _>>()?;

    let chunks = chunk_rects(
      classifier.size(),
      self.config.chunk_size,
      self.config.chunk_overlap,
    );
    log::debug!(
      "Meshing {} categories over {} chunks of {} px",
      jobs.len(),
      chunks.len(),
      self.config.chunk_size
    );

    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(self.config.max_threads)
      .build()
      .map_err(|e| GenerateError::ThreadPool(e.to_string()))?;

    let per_category: Vec<Vec<Vec<Mesh>>> = pool.install(|| {
      jobs
        .par_iter()
        .map(|&(category, texture_size)| -> Result<Vec<Vec<Mesh>>, GenerateError> {
          let meshes = chunks
            .par_iter()
            .map(|&rect| self.mesh_chunk(classifier, category, rect, texture_size))
            .collect::<Result<Vec<_>, _>>()?;
          log::debug!(
            "Category '{}': {} meshes",
            category.texture(),
            meshes.iter().map(Vec::len).sum::<usize>()
          );
          Ok(meshes)
        })
        .collect::<Result<Vec<_>, _>>()
    })?;

    let meshes = dedup_meshes(per_category.into_iter().flatten().flatten());
    log::info!(
      "Generated {} meshes for {} categories in {} ms",
      meshes.len(),
      jobs.len(),
      start.elapsed().as_millis()
    );
    Ok(meshes)
  }

  /// Samples and meshes one category over one raster chunk.
  fn mesh_chunk(
    &self,
    classifier: &dyn RasterClassifier,
    category: &TerrainCategory,
    rect: IntRect,
    texture_size: Vec2,
  ) -> Result<Vec<Mesh>, GenerateError> {
    let bitmap = Bitmap::sample(classifier, category, rect);
    if bitmap.is_empty() {
      return Ok(Vec::new());
    }
    self
      .mesh_bitmap(&bitmap, rect.min(), category.texture(), texture_size)
      .map_err(|source| GenerateError::Tessellation {
        texture: category.texture().clone(),
        source,
      })
  }

  /// Runs the contour and mesh stages on one bitmap.
  ///
  /// `origin` is the raster position of the bitmap's `(0, 0)` pixel.
  pub fn mesh_bitmap(
    &self,
    bitmap: &Bitmap,
    origin: IVec2,
    texture: &TextureId,
    texture_size: Vec2,
  ) -> Result<Vec<Mesh>, TessellateError> {
    let shapes = trace_shapes(build_edge_set(bitmap));
    let groups = group_shapes(&shapes);
    if groups.is_empty() {
      return Ok(Vec::new());
    }

    let scale = self.config.pixel_scale();
    let mut builder = MeshBuilder::new(texture.clone(), texture_size, &self.tessellator)
      .with_offset(self.config.world_offset() + origin.as_vec2() * scale)
      .with_scale(scale)
      .with_definition(self.definitions.get(texture));
    builder.add_groups(&groups)?;
    Ok(builder.finish(self.config.triangle_budget()))
  }

  /// Loads meshes from the configured cache, or generates and caches them.
  ///
  /// A failed save is logged and does not fail the call. Without a
  /// configured cache path this is [`MeshGenerator::generate_meshes`].
  pub fn load_or_generate(
    &self,
    classifier: &dyn RasterClassifier,
    textures: &dyn TextureSizes,
  ) -> Result<Vec<Mesh>, GenerateError> {
    let Some(path) = self.config.cache_path.as_deref() else {
      return self.generate_meshes(classifier, textures);
    };

    if let Some(meshes) = cache::load_meshes(path, &self.definitions) {
      log::info!("Loaded {} cached meshes", meshes.len());
      return Ok(meshes);
    }

    let meshes = self.generate_meshes(classifier, textures)?;
    if let Err(e) = cache::save_meshes(path, &meshes) {
      log::warn!("Failed to save mesh cache {}: {}", path.display(), e);
    }
    Ok(meshes)
  }

  /// Builds a spatial index covering the world area of a raster of
  /// `raster_size` pixels.
  pub fn build_grid(&self, meshes: Vec<Mesh>, raster_size: UVec2) -> Result<MeshGrid, ConfigError> {
    let offset = self.config.world_offset();
    let far = offset + raster_size.as_vec2() * self.config.pixel_scale();
    let min = offset.min(far).floor().as_ivec2();
    let max = offset.max(far).ceil().as_ivec2();
    MeshGrid::with_origin(meshes, min, max - min, self.config.block_size())
  }
}

/// Keeps the first mesh for every [`MeshId`](crate::mesh::MeshId).
pub fn dedup_meshes(meshes: impl IntoIterator<Item = Mesh>) -> Vec<Mesh> {
  let mut seen = HashSet::new();
  meshes
    .into_iter()
    .filter(|mesh| seen.insert(mesh.id().clone()))
    .collect()
}

/// Generates meshes for `categories` with default settings.
pub fn generate_meshes(
  classifier: &dyn RasterClassifier,
  categories: &[TerrainCategory],
  textures: &dyn TextureSizes,
) -> Result<Vec<Mesh>, GenerateError> {
  MeshGenerator::new(MeshGenConfig::default())?
    .with_categories(categories.to_vec())
    .generate_meshes(classifier, textures)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mesh::{CdtTessellator, MeshDefinition};
  use crate::raster::{TerrainCell, TerrainRaster};

  const ROCK: TerrainCell = TerrainCell::new(1, 0);
  const AIR: TerrainCell = TerrainCell::new(0, 0);

  fn textures() -> HashMap<TextureId, UVec2> {
    HashMap::from([(TextureId::new("rock"), UVec2::new(64, 64))])
  }

  fn rock() -> TerrainCategory {
    TerrainCategory::new("rock", vec![1], vec![]).unwrap()
  }

  fn generator(config: MeshGenConfig) -> MeshGenerator {
    MeshGenerator::new(config).unwrap().with_categories(vec![rock()])
  }

  fn total_area(meshes: &[Mesh]) -> f32 {
    meshes.iter().map(Mesh::area).sum()
  }

  #[test]
  fn unknown_texture_fails_before_meshing() {
    let raster = TerrainRaster::new(8, 8, ROCK);
    let err = generator(MeshGenConfig::default())
      .generate_meshes(&raster, &HashMap::<TextureId, UVec2>::new())
      .unwrap_err();
    assert!(matches!(err, GenerateError::UnknownTexture(t) if t.as_str() == "rock"));
  }

  #[test]
  fn zero_texture_size_fails_before_meshing() {
    let raster = TerrainRaster::new(4, 4, ROCK);
    for size in [UVec2::ZERO, UVec2::new(64, 0), UVec2::new(0, 64)] {
      let textures = HashMap::from([(TextureId::new("rock"), size)]);
      let err = generator(MeshGenConfig::default())
        .generate_meshes(&raster, &textures)
        .unwrap_err();
      assert!(
        matches!(&err, GenerateError::InvalidTextureSize(t, s) if t.as_str() == "rock" && *s == size),
        "{err}"
      );
    }
  }

  #[test]
  fn chunk_larger_than_i32_still_meshes() {
    let raster = TerrainRaster::new(8, 8, ROCK);
    let whole = generator(MeshGenConfig::default())
      .generate_meshes(&raster, &textures())
      .unwrap();
    let huge = generator(MeshGenConfig {
      chunk_size: u32::MAX,
      ..Default::default()
    })
    .generate_meshes(&raster, &textures())
    .unwrap();
    assert!(!huge.is_empty());
    assert_eq!(total_area(&huge), total_area(&whole));
  }

  #[test]
  fn empty_raster_yields_no_meshes() {
    let raster = TerrainRaster::new(16, 16, AIR);
    let meshes = generator(MeshGenConfig::default())
      .generate_meshes(&raster, &textures())
      .unwrap();
    assert!(meshes.is_empty());
  }

  #[test]
  fn mesh_bitmap_applies_offset_and_scale() {
    let config = MeshGenConfig {
      pixel_scale: [2.0, 3.0],
      world_offset: [10.0, 20.0],
      ..Default::default()
    };
    let generator = generator(config);
    let bitmap = Bitmap::from_rows(&["#"]);
    let meshes = generator
      .mesh_bitmap(&bitmap, IVec2::new(4, 5), &"rock".into(), Vec2::splat(64.0))
      .unwrap();
    assert_eq!(meshes.len(), 1);
    // Pixel (4, 5) is centred at world (10 + 4 * 2, 20 + 5 * 3).
    let centre = Vec2::new(18.0, 35.0);
    for v in meshes[0].vertices() {
      let d = (v.position - centre).abs();
      assert!(d.x <= 1.0 + 1e-5 && d.y <= 1.5 + 1e-5);
    }
    // Diamond of half-diagonals 1.0 and 1.5.
    assert!((total_area(&meshes) - 3.0).abs() < 1e-4);
  }

  #[test]
  fn definitions_are_attached_by_texture() {
    let mut definitions = MeshDefinitions::new();
    definitions.insert(
      "rock",
      MeshDefinition {
        z_order: 7,
        ..Default::default()
      },
    );
    let raster = TerrainRaster::from_fn(8, 8, |x, y| if x < 4 && y < 4 { ROCK } else { AIR });
    let meshes = generator(MeshGenConfig::default())
      .with_definitions(definitions)
      .generate_meshes(&raster, &textures())
      .unwrap();
    assert!(!meshes.is_empty());
    assert!(meshes.iter().all(|m| m.definition().is_some_and(|d| d.z_order == 7)));
  }

  #[test]
  fn chunked_generation_matches_single_chunk_area() {
    let raster = TerrainRaster::from_fn(40, 40, |x, y| {
      let dx = x as f32 - 20.0;
      let dy = y as f32 - 20.0;
      if dx * dx + dy * dy < 150.0 { ROCK } else { AIR }
    });

    let whole = generator(MeshGenConfig::default())
      .generate_meshes(&raster, &textures())
      .unwrap();
    let chunked = generator(MeshGenConfig {
      chunk_size: 16,
      max_threads: 2,
      ..Default::default()
    })
    .generate_meshes(&raster, &textures())
    .unwrap();

    assert_eq!(whole.len(), 1);
    assert!(chunked.len() > 1);
    // Overlapping chunks cover at least the single-chunk surface.
    assert!(total_area(&chunked) >= total_area(&whole) - 1e-3);
  }

  #[test]
  fn tessellators_agree_on_area() {
    let raster = TerrainRaster::from_fn(12, 12, |x, y| {
      let ring = (2..10).contains(&x) && (2..10).contains(&y);
      let hole = (5..7).contains(&x) && (5..7).contains(&y);
      if ring && !hole { ROCK } else { AIR }
    });
    let earcut = generator(MeshGenConfig::default())
      .generate_meshes(&raster, &textures())
      .unwrap();
    let cdt = generator(MeshGenConfig::default())
      .with_tessellator(CdtTessellator)
      .generate_meshes(&raster, &textures())
      .unwrap();
    assert!((total_area(&earcut) - total_area(&cdt)).abs() < 1e-3);
  }

  #[test]
  fn dedup_keeps_first_of_each_id() {
    let raster = TerrainRaster::from_fn(4, 4, |x, y| if x == 1 && y == 1 { ROCK } else { AIR });
    let meshes = generator(MeshGenConfig::default())
      .generate_meshes(&raster, &textures())
      .unwrap();
    assert_eq!(meshes.len(), 1);
    let doubled = dedup_meshes(meshes.iter().cloned().chain(meshes.iter().cloned()));
    assert_eq!(doubled.len(), 1);
  }

  #[test]
  fn grid_covers_scaled_world() {
    let config = MeshGenConfig {
      pixel_scale: [2.0, 2.0],
      world_offset: [-10.0, 0.0],
      block_size: [16, 16],
      ..Default::default()
    };
    let generator = generator(config);
    let grid = generator.build_grid(Vec::new(), UVec2::new(32, 8)).unwrap();
    assert_eq!(grid.extent(), IntRect::new(-10, 0, 64, 16));
    assert_eq!(grid.block_count(), IVec2::new(4, 1));
  }
}
