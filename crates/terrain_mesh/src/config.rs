//! Generation settings loaded from TOML.
//!
//! ```toml
//! max_threads = 4
//! chunk_size = 256
//! pixel_scale = [2.0, 2.0]
//! cache_path = "cache/terrain.tmsh"
//!
//! [[categories]]
//! texture = "grass"
//! terrains = [1]
//! biomes = [0, 3]
//!
//! [definitions.water]
//! z_order = -1
//! wave_amplitude = 0.5
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bevy::math::{IVec2, Vec2};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::mesh::{MAX_TRIANGLES_PER_MESH, MeshDefinition, MeshDefinitions};
use crate::raster::TerrainCategory;

/// One texture category: which terrain and biome ids it covers.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CategoryConfig {
  pub texture: String,
  #[serde(default)]
  pub terrains: Vec<u8>,
  #[serde(default)]
  pub biomes: Vec<u8>,
}

impl CategoryConfig {
  pub fn to_category(&self) -> Result<TerrainCategory, ConfigError> {
    TerrainCategory::new(self.texture.as_str(), self.terrains.clone(), self.biomes.clone())
  }
}

/// Settings for a mesh generation pass.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MeshGenConfig {
  /// Worker threads; 0 uses rayon's default (one per core).
  pub max_threads: usize,
  /// Chunk edge length in raster pixels.
  pub chunk_size: u32,
  /// Extra pixels sampled on every side of a chunk.
  pub chunk_overlap: u32,
  /// Triangle budget per emitted mesh, capped at
  /// [`MAX_TRIANGLES_PER_MESH`].
  pub max_triangles_per_mesh: usize,
  /// World units per raster pixel.
  pub pixel_scale: [f32; 2],
  /// World position of raster pixel `(0, 0)`.
  pub world_offset: [f32; 2],
  /// Spatial index block size in world units.
  pub block_size: [i32; 2],
  /// Mesh cache file. No caching when unset.
  pub cache_path: Option<PathBuf>,
  pub categories: Vec<CategoryConfig>,
  /// Per-texture mesh definitions, keyed by texture name.
  pub definitions: HashMap<String, MeshDefinition>,
}

impl Default for MeshGenConfig {
  fn default() -> Self {
    Self {
      max_threads: 0,
      chunk_size: 256,
      chunk_overlap: 1,
      max_triangles_per_mesh: MAX_TRIANGLES_PER_MESH,
      pixel_scale: [1.0, 1.0],
      world_offset: [0.0, 0.0],
      block_size: [512, 512],
      cache_path: None,
      categories: Vec::new(),
      definitions: HashMap::new(),
    }
  }
}

impl MeshGenConfig {
  /// Parses and validates a TOML document.
  pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
    let config: Self = toml::from_str(source)?;
    config.validate()?;
    Ok(config)
  }

  /// Reads, parses and validates a TOML file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let source = std::fs::read_to_string(path)?;
    Self::from_toml_str(&source)
  }

  /// Checks every value a generation pass depends on.
  pub fn validate(&self) -> Result<(), ConfigError> {
    positive("chunk_size", self.chunk_size as i64)?;
    positive("max_triangles_per_mesh", self.max_triangles_per_mesh as i64)?;
    positive("block_size.x", self.block_size[0] as i64)?;
    positive("block_size.y", self.block_size[1] as i64)?;

    let [x, y] = self.pixel_scale;
    if !(x.is_finite() && y.is_finite()) || x == 0.0 || y == 0.0 {
      return Err(ConfigError::InvalidScale { x, y });
    }

    for category in &self.categories {
      category.to_category()?;
    }
    Ok(())
  }

  /// Builds the configured categories in declaration order.
  pub fn terrain_categories(&self) -> Result<Vec<TerrainCategory>, ConfigError> {
    self.categories.iter().map(CategoryConfig::to_category).collect()
  }

  pub fn mesh_definitions(&self) -> MeshDefinitions {
    self
      .definitions
      .iter()
      .map(|(texture, definition)| (texture.as_str(), definition.clone()))
      .collect()
  }

  pub fn pixel_scale(&self) -> Vec2 {
    Vec2::from(self.pixel_scale)
  }

  pub fn world_offset(&self) -> Vec2 {
    Vec2::from(self.world_offset)
  }

  pub fn block_size(&self) -> IVec2 {
    IVec2::from(self.block_size)
  }

  /// Effective per-mesh triangle budget.
  pub fn triangle_budget(&self) -> usize {
    self.max_triangles_per_mesh.clamp(1, MAX_TRIANGLES_PER_MESH)
  }
}

fn positive(what: &'static str, value: i64) -> Result<(), ConfigError> {
  if value <= 0 {
    return Err(ConfigError::NonPositiveSize { what, value });
  }
  Ok(())
}
